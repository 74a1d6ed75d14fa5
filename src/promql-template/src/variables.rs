//! Dashboard variable declarations
//!
//! Variables are declared once per dashboard, either with a fixed list of
//! options or with options read from the values of a label. Templates only
//! need a single representative value per variable to be validated, which
//! is the sentinel handed to [`VariableApplier`](crate::VariableApplier).

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// Kind of a fixed option list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    /// Time intervals such as `5m`, usable in range selectors
    #[default]
    Interval,
    /// Arbitrary values
    Custom,
}

/// Variable whose values come from a fixed list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariableOptions {
    #[serde(rename = "type", default)]
    pub option_type: OptionType,
    #[serde(default)]
    pub options: Vec<String>,
    /// Option selected when the dashboard loads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_option: Option<String>,
}

/// Variable whose values are the values of a label on some series
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelValuesOptions {
    /// Query returning the series to read label values from
    pub query: String,
    pub label_name: String,
    /// A value the label is known to take, used when validating templates
    pub example_option: String,
}

/// A dashboard template variable
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariableDefinition {
    /// Name referenced from templates as `$name`
    pub name: String,
    /// Human readable label shown next to the variable selector
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<VariableOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_label_values: Option<LabelValuesOptions>,
}

impl VariableDefinition {
    pub fn with_options(name: &str, options: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            options: Some(VariableOptions {
                options: options.iter().map(|o| o.to_string()).collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn with_label_values(name: &str, query: &str, label_name: &str, example: &str) -> Self {
        Self {
            name: name.to_string(),
            options_label_values: Some(LabelValuesOptions {
                query: query.to_string(),
                label_name: label_name.to_string(),
                example_option: example.to_string(),
            }),
            ..Default::default()
        }
    }

    /// Representative value substituted for this variable during validation
    ///
    /// Label-value variables use their example option, option lists their
    /// default option or else the first option.
    pub fn sentinel(&self) -> Option<&str> {
        if let Some(label_values) = &self.options_label_values {
            return Some(label_values.example_option.as_str()).filter(|s| !s.is_empty());
        }
        let options = self.options.as_ref()?;
        options
            .default_option
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| options.options.first().map(String::as_str))
    }

    /// Check the declaration is usable and return its sentinel
    pub fn validate(&self) -> Result<&str, TemplateError> {
        let invalid = |reason: &str| TemplateError::InvalidVariable {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(invalid(
                "name may only contain ASCII letters, digits and underscores",
            ));
        }
        if self.options.is_some() && self.options_label_values.is_some() {
            return Err(invalid(
                "options and options_label_values are mutually exclusive",
            ));
        }
        self.sentinel()
            .ok_or_else(|| invalid("no option or example option to validate templates with"))
    }
}
