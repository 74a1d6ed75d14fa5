use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::cli::{CommonArgs, CommonCommands, utils};
use promql_template::{LabelMatcher, VariableApplier};

/// Validate and rewrite PromQL templates used by dashboards and alerts
#[derive(Parser, Debug)]
#[command(name = "monitoring-gen", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Bind a template variable to a sentinel value, as NAME=VALUE
    #[arg(long = "var", global = true, value_parser = parse_var)]
    vars: Vec<(String, String)>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that a template is valid PromQL once variables are bound
    Validate { expression: String },
    /// Add label matchers to every vector selector
    InjectMatchers {
        expression: String,
        /// Matcher to add, e.g. job="frontend" or instance=~"web-.*"
        #[arg(short, long = "matcher")]
        matchers: Vec<LabelMatcher>,
    },
    /// Add labels to the grouping of every aggregation
    InjectGroupings {
        expression: String,
        /// Label to group by
        #[arg(short, long = "group")]
        groupings: Vec<String>,
    },
    /// List metrics referenced by a template
    ListMetrics {
        expression: String,
        #[arg(long, help = "Print the metric list as a JSON array")]
        json: bool,
    },
    /// Derive an alert query with variable-dependent matchers removed
    InjectAlert {
        expression: String,
        /// Matcher to add, e.g. job="frontend"
        #[arg(short, long = "matcher")]
        matchers: Vec<LabelMatcher>,
    },
    #[command(flatten)]
    Common(CommonCommands),
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))?;
    let name = name.trim().trim_start_matches('$');
    if name.is_empty() {
        return Err(format!("missing variable name in {s:?}"));
    }
    if value.is_empty() {
        return Err(format!("missing sentinel value in {s:?}"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(&cli.common);

    let config = utils::load_config(cli.common.config.as_ref())?;

    let mut vars: VariableApplier = config
        .variable_applier()
        .context("Invalid variable configuration")?;
    for (name, value) in &cli.vars {
        vars.insert(name.as_str(), value.as_str());
    }
    log::debug!("Using {} template variables", vars.len());

    let with_defaults = |matchers: &[LabelMatcher]| -> Result<Vec<LabelMatcher>> {
        let mut all = config
            .default_matchers()
            .context("Invalid default matchers")?;
        all.extend_from_slice(matchers);
        Ok(all)
    };

    match &cli.command {
        Command::Validate { expression } => {
            promql_template::validate(expression, Some(&vars))?;
            println!("ok");
        }
        Command::InjectMatchers {
            expression,
            matchers,
        } => {
            let matchers = with_defaults(matchers)?;
            let result = promql_template::inject_matchers(expression, &matchers, Some(&vars))?;
            println!("{result}");
        }
        Command::InjectGroupings {
            expression,
            groupings,
        } => {
            let result = promql_template::inject_groupings(expression, groupings, Some(&vars))?;
            println!("{result}");
        }
        Command::ListMetrics { expression, json } => {
            let metrics = promql_template::list_metrics(expression, Some(&vars))?;
            if *json {
                println!("{}", serde_json::to_string(&metrics)?);
            } else {
                for metric in metrics {
                    println!("{metric}");
                }
            }
        }
        Command::InjectAlert {
            expression,
            matchers,
        } => {
            let matchers = with_defaults(matchers)?;
            let result = promql_template::inject_as_alert(expression, &matchers, Some(&vars))?;
            println!("{result}");
        }
        Command::Common(command) => utils::handle_common_command(command, &config)?,
    }

    tracing::debug!("command finished");
    Ok(())
}
