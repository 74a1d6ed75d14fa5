//! Label matcher types injected into PromQL templates
//!
//! These are the caller-facing counterparts of the parser's own matcher
//! type. They stay plain data until an operation needs them, at which point
//! [`LabelMatcher::to_matcher`] compiles any regex the same way the parser
//! does for matchers it reads from query text.

use std::fmt;
use std::str::FromStr;

use promql_parser::label::{MatchOp, Matcher};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// Label matcher types matching Prometheus semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherOp {
    /// Exact string match (=)
    Equal,
    /// Not equal (!=)
    NotEqual,
    /// Regex match (=~)
    RegexMatch,
    /// Regex not match (!~)
    RegexNotMatch,
}

impl MatcherOp {
    pub fn is_regex(self) -> bool {
        matches!(self, Self::RegexMatch | Self::RegexNotMatch)
    }
}

impl fmt::Display for MatcherOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::RegexMatch => write!(f, "=~"),
            Self::RegexNotMatch => write!(f, "!~"),
        }
    }
}

/// A single label matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMatcher {
    /// Label name
    pub name: String,
    /// Match operation
    pub op: MatcherOp,
    /// Value to match against
    pub value: String,
}

impl LabelMatcher {
    /// Create a new equality matcher
    pub fn equal(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            op: MatcherOp::Equal,
            value: value.to_string(),
        }
    }

    /// Create a new not-equal matcher
    pub fn not_equal(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            op: MatcherOp::NotEqual,
            value: value.to_string(),
        }
    }

    /// Create a new regex matcher
    pub fn regex_match(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            op: MatcherOp::RegexMatch,
            value: pattern.to_string(),
        }
    }

    /// Create a new regex not-match matcher
    pub fn regex_not_match(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            op: MatcherOp::RegexNotMatch,
            value: pattern.to_string(),
        }
    }

    pub fn is_regex(&self) -> bool {
        self.op.is_regex()
    }

    /// The regex pattern text, for `=~` and `!~` matchers
    pub fn regex_source(&self) -> Option<&str> {
        self.is_regex().then_some(self.value.as_str())
    }

    /// Convert into the parser's matcher type so it can be attached to a selector
    pub fn to_matcher(&self) -> Result<Matcher, TemplateError> {
        let op = match self.op {
            MatcherOp::Equal => MatchOp::Equal,
            MatcherOp::NotEqual => MatchOp::NotEqual,
            MatcherOp::RegexMatch => MatchOp::Re(self.compile()?),
            MatcherOp::RegexNotMatch => MatchOp::NotRe(self.compile()?),
        };
        Ok(Matcher::new(op, &self.name, &self.value))
    }

    fn compile(&self) -> Result<Regex, TemplateError> {
        Regex::new(&format!("^(?:{})$", self.value)).map_err(|e| TemplateError::InvalidMatcher {
            matcher: self.to_string(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{:?}", self.name, self.op, self.value)
    }
}

impl FromStr for LabelMatcher {
    type Err = TemplateError;

    /// Parse `name<op>value`, where the value may be wrapped in double quotes
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TemplateError::InvalidMatcher {
            matcher: s.to_string(),
            reason: reason.to_string(),
        };

        let pos = s
            .find(['=', '!'])
            .ok_or_else(|| invalid("missing match operator"))?;
        let (name, rest) = s.split_at(pos);
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("missing label name"));
        }

        let (op, value) = if let Some(v) = rest.strip_prefix("=~") {
            (MatcherOp::RegexMatch, v)
        } else if let Some(v) = rest.strip_prefix("!~") {
            (MatcherOp::RegexNotMatch, v)
        } else if let Some(v) = rest.strip_prefix("!=") {
            (MatcherOp::NotEqual, v)
        } else if let Some(v) = rest.strip_prefix('=') {
            (MatcherOp::Equal, v)
        } else {
            return Err(invalid("missing match operator"));
        };

        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);

        Ok(Self {
            name: name.to_string(),
            op,
            value: value.to_string(),
        })
    }
}
