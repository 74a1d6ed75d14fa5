//! PromQL template transformation
//!
//! Dashboard and alert definitions are written as PromQL templates that
//! reference dashboard variables (`$time`, `${queue:regex}`). Those
//! references are not PromQL, so every operation here binds them to
//! sentinel values before handing the text to the parser and restores them
//! after rendering.
//!
//! # Operations
//!
//! - [`validate`] - check a template parses once its variables are bound
//! - [`inject_matchers`] - add label matchers to every selector
//! - [`inject_groupings`] - add labels to every aggregation's grouping
//! - [`list_metrics`] - enumerate referenced metrics, histogram companions included
//! - [`inject_as_alert`] - strip variable-dependent matchers to get an alert query
//!
//! # Example
//!
//! ```ignore
//! use promql_template::{inject_matchers, LabelMatcher, VariableApplier};
//!
//! let vars = VariableApplier::new().with_variable("time", "5m");
//! let query = inject_matchers(
//!     "rate(src_http_requests_total[$time])",
//!     &[LabelMatcher::equal("job", "frontend")],
//!     Some(&vars),
//! )?;
//! assert_eq!(query, r#"rate(src_http_requests_total{job="frontend"}[$time])"#);
//! ```

pub mod applier;
pub mod error;
pub mod expression;
pub mod histogram;
pub mod types;
pub mod variables;
pub mod varkey;
pub mod visit;

pub use applier::VariableApplier;
pub use error::TemplateError;
pub use expression::{inject_as_alert, inject_groupings, inject_matchers, list_metrics, validate};
pub use histogram::{HISTOGRAM_SUFFIXES, histogram_companions};
pub use types::{LabelMatcher, MatcherOp};
pub use variables::{LabelValuesOptions, OptionType, VariableDefinition, VariableOptions};
pub use varkey::var_key_regex;
