//! Detection of dashboard variable references in arbitrary text

use regex::Regex;

/// Build a pattern matching any spelling of the variable `name`
///
/// Matches `$name`, `${name}` and `${name:<modifier>}`. The bare form is not
/// anchored on the right, so `$name` also matches the start of `$name_total`.
pub fn var_key_regex(name: &str) -> Result<Regex, regex::Error> {
    let name = regex::escape(name);
    Regex::new(&format!(r"\$(?:{name}|\{{{name}\}}|\{{{name}:.*\}})"))
}
