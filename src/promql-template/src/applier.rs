//! Sentinel substitution for dashboard template variables
//!
//! PromQL has no notion of template variables, so an expression such as
//! `rate(foo[$time])` is rejected by the parser. A [`VariableApplier`]
//! swaps every bare `$name` for a syntactically valid stand-in (the
//! sentinel) before parsing, and swaps the sentinels back afterwards.
//!
//! A variable written inside double quotes (`"$name"`) is already a legal
//! PromQL string and is left alone in both directions.
//!
//! Substitution is plain text replacement. Callers must pick sentinels that
//! do not occur elsewhere in their templates and that the parser renders
//! back verbatim (`5m` rather than `300s`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::variables::VariableDefinition;

/// Mapping from variable name (without the leading `$`) to its sentinel value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableApplier {
    sentinels: BTreeMap<String, String>,
}

impl VariableApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an applier from dashboard variable declarations
    pub fn from_definitions(definitions: &[VariableDefinition]) -> Result<Self, TemplateError> {
        let mut applier = Self::new();
        for definition in definitions {
            let sentinel = definition.validate()?;
            if applier.sentinels.contains_key(&definition.name) {
                return Err(TemplateError::InvalidVariable {
                    name: definition.name.clone(),
                    reason: "declared more than once".to_string(),
                });
            }
            applier.insert(&definition.name, sentinel);
        }
        Ok(applier)
    }

    pub fn with_variable(mut self, name: impl Into<String>, sentinel: impl Into<String>) -> Self {
        self.insert(name, sentinel);
        self
    }

    /// Add or replace a variable, returning the previous sentinel
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        sentinel: impl Into<String>,
    ) -> Option<String> {
        self.sentinels.insert(name.into(), sentinel.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.sentinels.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sentinels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentinels.is_empty()
    }

    /// Iterate over `(name, sentinel)` pairs ordered by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sentinels
            .iter()
            .map(|(name, sentinel)| (name.as_str(), sentinel.as_str()))
    }

    /// Reject variables whose sentinel is empty
    ///
    /// An empty sentinel erases the variable from the parsed expression and
    /// cannot be reverted afterwards.
    pub fn check_sentinels(&self) -> Result<(), TemplateError> {
        match self.iter().find(|(_, sentinel)| sentinel.is_empty()) {
            Some((name, _)) => Err(TemplateError::InvalidVariable {
                name: name.to_string(),
                reason: "sentinel must not be empty".to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Replace every bare `$name` in `expression` with its sentinel
    pub fn apply_sentinel_values(&self, expression: &str) -> String {
        let mut applied = expression.to_string();
        for (name, sentinel) in self.iter() {
            let key = var_key(name);
            if is_quoted(expression, &key) {
                continue;
            }
            applied = applied.replace(&key, sentinel);
        }
        applied
    }

    /// Undo [`apply_sentinel_values`](Self::apply_sentinel_values) on `applied`
    ///
    /// Whether a variable was substituted is decided against `original`, the
    /// text before substitution, never against `applied`.
    pub fn revert_defaults(&self, original: &str, applied: &str) -> String {
        let mut reverted = applied.to_string();
        for (name, sentinel) in self.iter() {
            if sentinel.is_empty() {
                continue;
            }
            let key = var_key(name);
            if is_quoted(original, &key) {
                continue;
            }
            reverted = reverted.replace(sentinel, &key);
        }
        reverted
    }
}

impl<K, V> FromIterator<(K, V)> for VariableApplier
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            sentinels: iter
                .into_iter()
                .map(|(name, sentinel)| (name.into(), sentinel.into()))
                .collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for VariableApplier {
    fn from(sentinels: BTreeMap<String, String>) -> Self {
        Self { sentinels }
    }
}

fn var_key(name: &str) -> String {
    format!("${name}")
}

fn is_quoted(expression: &str, key: &str) -> bool {
    expression.contains(&format!("\"{key}\""))
}
