//! Template-aware rewriting of PromQL expressions
//!
//! Every operation follows the same pipeline:
//!
//! ```text
//! template → apply sentinels → parse → walk/rewrite AST → render → revert sentinels
//! ```
//!
//! The AST is owned by a single call and dropped before it returns.

use std::collections::HashSet;

use promql_parser::label::{Labels, METRIC_NAME, MatchOp, Matcher};
use promql_parser::parser::{self, AggregateExpr, Expr, LabelModifier, VectorSelector};
use regex::Regex;
use tracing::{debug, trace};

use crate::applier::VariableApplier;
use crate::error::TemplateError;
use crate::histogram::histogram_companions;
use crate::types::LabelMatcher;
use crate::varkey::var_key_regex;
use crate::visit::{ExprVisitorMut, walk_expr_mut};

/// Check that `expression` is valid PromQL once its variables are bound
#[tracing::instrument(skip(vars))]
pub fn validate(expression: &str, vars: Option<&VariableApplier>) -> Result<(), TemplateError> {
    prepare_ast(expression, vars).map(|_| ())
}

/// Append `matchers` to every vector selector in `expression`
///
/// Existing matchers keep their position and the new ones follow. Nothing is
/// de-duplicated. The result is always re-rendered, so an empty `matchers`
/// still normalizes formatting.
#[tracing::instrument(skip(matchers, vars), fields(matchers = matchers.len()))]
pub fn inject_matchers(
    expression: &str,
    matchers: &[LabelMatcher],
    vars: Option<&VariableApplier>,
) -> Result<String, TemplateError> {
    let mut expr = prepare_ast(expression, vars)?;
    let mut injector = MatcherInjector {
        matchers: to_matchers(matchers)?,
    };
    walk_expr_mut(&mut injector, &mut expr)?;
    Ok(render(expression, &expr, vars))
}

/// Append `groupings` to the grouping clause of every aggregation in `expression`
///
/// Aggregations without a clause gain a `by (...)` clause. An existing
/// `without (...)` list is extended as is.
#[tracing::instrument(skip(groupings, vars), fields(groupings = groupings.len()))]
pub fn inject_groupings<S: AsRef<str>>(
    expression: &str,
    groupings: &[S],
    vars: Option<&VariableApplier>,
) -> Result<String, TemplateError> {
    let mut expr = prepare_ast(expression, vars)?;
    let mut injector = GroupingInjector {
        groupings: groupings.iter().map(|g| g.as_ref().to_string()).collect(),
    };
    walk_expr_mut(&mut injector, &mut expr)?;
    Ok(render(expression, &expr, vars))
}

/// List every metric name referenced by `expression`, in order of first appearance
///
/// Histogram series pull in their companions: `req_count` also lists
/// `req_sum` and `req_bucket`. A selector without a name contributes the raw
/// value of its `__name__` matcher, regex or not.
#[tracing::instrument(skip(vars))]
pub fn list_metrics(
    expression: &str,
    vars: Option<&VariableApplier>,
) -> Result<Vec<String>, TemplateError> {
    let mut expr = prepare_ast(expression, vars)?;
    let mut collector = MetricCollector::default();
    walk_expr_mut(&mut collector, &mut expr)?;
    debug!(count = collector.metrics.len(), "collected metric names");
    Ok(collector.metrics)
}

/// Derive an alert query from a dashboard template
///
/// Matchers whose value refers to a variable are dropped, `matchers` are
/// appended to what remains, and any other variable use is reverted. A
/// variable used inside a regex matcher without the `${name:regex}` spelling
/// is an error, as is a result that no longer parses.
#[tracing::instrument(skip(matchers, vars), fields(matchers = matchers.len()))]
pub fn inject_as_alert(
    expression: &str,
    matchers: &[LabelMatcher],
    vars: Option<&VariableApplier>,
) -> Result<String, TemplateError> {
    let mut expr = prepare_ast(expression, vars)?;

    let variables = match vars {
        Some(vars) => vars
            .iter()
            .map(|(name, sentinel)| {
                Ok(AlertVariable {
                    name: name.to_string(),
                    sentinel: sentinel.to_string(),
                    key: var_key_regex(name)?,
                })
            })
            .collect::<Result<Vec<_>, TemplateError>>()?,
        None => Vec::new(),
    };
    let mut sanitizer = AlertSanitizer {
        variables,
        matchers: to_matchers(matchers)?,
        expression,
    };
    walk_expr_mut(&mut sanitizer, &mut expr)?;

    let rendered = render(expression, &expr, vars);
    if let Err(message) = parser::parse(&rendered) {
        return Err(TemplateError::InvalidAlertQuery {
            rendered,
            message: message.to_string(),
        });
    }
    Ok(rendered)
}

fn prepare_ast(expression: &str, vars: Option<&VariableApplier>) -> Result<Expr, TemplateError> {
    let applied = match vars {
        Some(vars) => {
            vars.check_sentinels()?;
            vars.apply_sentinel_values(expression)
        }
        None => expression.to_string(),
    };
    trace!(%applied, "parsing expression");
    parser::parse(&applied).map_err(move |message| TemplateError::Parse {
        expression: applied,
        message: message.to_string(),
    })
}

fn render(original: &str, expr: &Expr, vars: Option<&VariableApplier>) -> String {
    let rendered = expr.to_string();
    match vars {
        Some(vars) => vars.revert_defaults(original, &rendered),
        None => rendered,
    }
}

fn to_matchers(matchers: &[LabelMatcher]) -> Result<Vec<Matcher>, TemplateError> {
    matchers.iter().map(LabelMatcher::to_matcher).collect()
}

/// Matcher lists of a selector that new matchers must be added to
///
/// A selector written with `or` carries one list per alternative.
fn matcher_groups(vs: &mut VectorSelector) -> impl Iterator<Item = &mut Vec<Matcher>> {
    let matchers = &mut vs.matchers;
    let plain = (matchers.or_matchers.is_empty() || !matchers.matchers.is_empty())
        .then_some(&mut matchers.matchers);
    plain.into_iter().chain(matchers.or_matchers.iter_mut())
}

struct MatcherInjector {
    matchers: Vec<Matcher>,
}

impl ExprVisitorMut for MatcherInjector {
    type Error = TemplateError;

    fn visit_vector_selector(&mut self, vs: &mut VectorSelector) -> Result<(), TemplateError> {
        for group in matcher_groups(vs) {
            group.extend(self.matchers.iter().cloned());
        }
        Ok(())
    }
}

struct GroupingInjector {
    groupings: Vec<String>,
}

impl ExprVisitorMut for GroupingInjector {
    type Error = TemplateError;

    fn visit_aggregate(&mut self, agg: &mut AggregateExpr) -> Result<(), TemplateError> {
        match agg.modifier.as_mut() {
            Some(LabelModifier::Include(labels) | LabelModifier::Exclude(labels)) => {
                labels.labels.extend(self.groupings.iter().cloned());
            }
            None => {
                agg.modifier = Some(LabelModifier::Include(Labels {
                    labels: self.groupings.clone(),
                }));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct MetricCollector {
    seen: HashSet<String>,
    metrics: Vec<String>,
}

impl MetricCollector {
    fn add(&mut self, metric: &str) {
        if self.seen.insert(metric.to_string()) {
            self.metrics.push(metric.to_string());
        }
    }
}

impl ExprVisitorMut for MetricCollector {
    type Error = TemplateError;

    fn visit_vector_selector(&mut self, vs: &mut VectorSelector) -> Result<(), TemplateError> {
        if let Some(name) = vs.name.as_deref().filter(|name| !name.is_empty()) {
            self.add(name);
            if let Some(companions) = histogram_companions(name) {
                for companion in &companions {
                    self.add(companion);
                }
            }
            return Ok(());
        }

        let all_matchers = vs
            .matchers
            .matchers
            .iter()
            .chain(vs.matchers.or_matchers.iter().flatten());
        for matcher in all_matchers {
            if matcher.name == METRIC_NAME {
                self.add(&matcher.value);
            }
        }
        Ok(())
    }
}

struct AlertVariable {
    name: String,
    sentinel: String,
    key: Regex,
}

struct AlertSanitizer<'a> {
    variables: Vec<AlertVariable>,
    matchers: Vec<Matcher>,
    expression: &'a str,
}

impl AlertSanitizer<'_> {
    /// Whether `matcher` can be kept in an alert query
    fn is_safe(&self, matcher: &Matcher) -> Result<bool, TemplateError> {
        // For a parsed regex matcher the value is the pattern source.
        let is_regex = matches!(matcher.op, MatchOp::Re(_) | MatchOp::NotRe(_));

        for var in &self.variables {
            if var.key.is_match(&matcher.value) {
                return Ok(false);
            }
            if is_regex && !var.sentinel.is_empty() && matcher.value.contains(&var.sentinel) {
                return Err(TemplateError::UnsafeRegexVariable {
                    variable: var.name.clone(),
                    matcher: matcher.to_string(),
                    expression: self.expression.to_string(),
                });
            }
        }
        Ok(true)
    }
}

impl ExprVisitorMut for AlertSanitizer<'_> {
    type Error = TemplateError;

    fn visit_vector_selector(&mut self, vs: &mut VectorSelector) -> Result<(), TemplateError> {
        for group in matcher_groups(vs) {
            let mut kept = Vec::with_capacity(group.len() + self.matchers.len());
            for matcher in group.drain(..) {
                if self.is_safe(&matcher)? {
                    kept.push(matcher);
                } else {
                    debug!(matcher = %matcher, "dropping variable matcher from alert query");
                }
            }
            kept.extend(self.matchers.iter().cloned());
            *group = kept;
        }
        Ok(())
    }
}
