use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use promql_template::{LabelMatcher, TemplateError, VariableApplier, VariableDefinition};

/// Default configuration file, looked up in the working directory
pub const CONFIG_FILE: &str = "monitoring-gen.toml";

/// Prefix of environment variables overriding configuration values
pub const ENV_PREFIX: &str = "MONITORING_GEN__";

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Configuration {
    /// Dashboard variables templates may reference
    #[serde(default)]
    pub variables: Vec<VariableDefinition>,
    /// Sentinel overrides by variable name, applied after `variables`
    #[serde(default)]
    pub sentinels: BTreeMap<String, String>,
    /// Matchers added to every injection in addition to those given on the command line
    #[serde(default)]
    pub default_matchers: Vec<String>,
}

impl Configuration {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file(CONFIG_FILE))
            .extract()
            .map_err(Box::new)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file_exact(path))
            .extract()
            .map_err(Box::new)
    }

    fn figment(file: figment::providers::Data<Toml>) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Build the variable applier from declarations and sentinel overrides
    pub fn variable_applier(&self) -> Result<VariableApplier, TemplateError> {
        let mut applier = VariableApplier::from_definitions(&self.variables)?;
        for (name, sentinel) in &self.sentinels {
            applier.insert(name.as_str(), sentinel.as_str());
        }
        applier.check_sentinels()?;
        Ok(applier)
    }

    /// Parse the configured default matchers
    pub fn default_matchers(&self) -> Result<Vec<LabelMatcher>, TemplateError> {
        self.default_matchers.iter().map(|m| m.parse()).collect()
    }
}
