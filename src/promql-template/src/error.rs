//! Error types for template operations

/// Errors that can occur while validating or transforming a PromQL template
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The expression, with variables bound to their sentinels, is not valid PromQL
    #[error("{expression:?}: {message}")]
    Parse {
        /// Expression text after sentinel substitution
        expression: String,
        /// Message reported by the PromQL parser
        message: String,
    },

    /// A variable was used inside a regex matcher without the regex-safe spelling
    #[error(
        "{expression:?}: variable {variable:?} used in regex matcher '{matcher}' without ${{{variable}:regex}} syntax, use ${{{variable}:regex}} instead"
    )]
    UnsafeRegexVariable {
        variable: String,
        matcher: String,
        expression: String,
    },

    /// The alert query left after stripping variables is not valid PromQL
    #[error("alert query {rendered:?} is not valid PromQL: {message}")]
    InvalidAlertQuery { rendered: String, message: String },

    #[error("invalid label matcher '{matcher}': {reason}")]
    InvalidMatcher { matcher: String, reason: String },

    #[error("invalid variable {name:?}: {reason}")]
    InvalidVariable { name: String, reason: String },

    #[error("failed to build variable pattern: {0}")]
    VarKeyPattern(#[from] regex::Error),
}

impl TemplateError {
    /// Rendered text attached to the error, if the operation got far enough to produce one
    pub fn rendered(&self) -> Option<&str> {
        match self {
            Self::InvalidAlertQuery { rendered, .. } => Some(rendered),
            _ => None,
        }
    }
}
