//! Renders a caller-supplied flag map into the sorted `--key`/`--key=value` argument list the
//! browser is launched with.

use std::collections::BTreeMap;

/// A single flag's value. Keys are free-form; values are one of these three shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    Bool(bool),
    String(String),
    Integer(i64),
}

impl From<bool> for FlagValue {
    fn from(v: bool) -> Self {
        FlagValue::Bool(v)
    }
}

impl From<&str> for FlagValue {
    fn from(v: &str) -> Self {
        FlagValue::String(v.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(v: String) -> Self {
        FlagValue::String(v)
    }
}

impl From<i64> for FlagValue {
    fn from(v: i64) -> Self {
        FlagValue::Integer(v)
    }
}

/// `{name -> value}`, kept sorted by key so rendering is deterministic.
pub type FlagMap = BTreeMap<String, FlagValue>;

/// Renders the flag map to a CLI argument vector.
///
/// Keys are already sorted ascending by virtue of `BTreeMap`'s iteration order. `bool(true)`
/// renders as a valueless `--key`; `bool(false)` is omitted entirely; anything else renders as
/// `--key=<value>`.
pub fn render(flags: &FlagMap) -> Vec<String> {
    flags
        .iter()
        .filter_map(|(key, value)| match value {
            FlagValue::Bool(true) => Some(format!("--{key}")),
            FlagValue::Bool(false) => None,
            FlagValue::String(v) => Some(format!("--{key}={v}")),
            FlagValue::Integer(v) => Some(format!("--{key}={v}")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s6_flag_rendering_matches_expected_argument_list() {
        let mut flags = FlagMap::new();
        flags.insert("headless".into(), true.into());
        flags.insert("disable-gpu".into(), false.into());
        flags.insert("window-size".into(), "1920,1080".into());
        flags.insert("user-data-dir".into(), "/tmp/x".into());

        assert_eq!(
            render(&flags),
            vec!["--headless", "--user-data-dir=/tmp/x", "--window-size=1920,1080"],
        );
    }

    #[test]
    fn integer_values_are_rendered_unquoted() {
        let mut flags = FlagMap::new();
        flags.insert("remote-debugging-port".into(), 0i64.into());
        assert_eq!(render(&flags), vec!["--remote-debugging-port=0"]);
    }
}
