//! Session parameters exchanged with the session manager
//!
//! A session parameter is a typed key/value pair. The helper program reports
//! discovered parameters as `key = value` lines; only the keys listed in
//! [`DISCOVERED_KEYS`] are recognized, and each has a fixed value type.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between key and value in helper output
pub const ASSIGNMENT_SEPARATOR: &str = " = ";

/// Value type of a recognized parameter key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Taken verbatim
    String,
    /// `true` only on an exact `"true"`
    Boolean,
    /// Leading decimal digits, 0 when there are none
    Int32,
}

/// Keys the helper program may report, with their value types
pub const DISCOVERED_KEYS: &[(&str, ParameterKind)] = &[
    ("login-session-id", ParameterKind::String),
    ("display-device", ParameterKind::String),
    ("x11-display-device", ParameterKind::String),
    ("x11-display", ParameterKind::String),
    ("remote-host-name", ParameterKind::String),
    ("session-type", ParameterKind::String),
    ("is-local", ParameterKind::Boolean),
    ("unix-user", ParameterKind::Int32),
];

impl ParameterKind {
    /// Look up the value type of a recognized key
    pub fn for_key(key: &str) -> Option<Self> {
        DISCOVERED_KEYS
            .iter()
            .find(|(known, _)| *known == key)
            .map(|(_, kind)| *kind)
    }

    /// Convert raw helper text into a typed value
    pub fn parse(self, raw: &str) -> ParameterValue {
        match self {
            Self::String => ParameterValue::String(raw.to_string()),
            Self::Boolean => ParameterValue::Boolean(raw == "true"),
            Self::Int32 => ParameterValue::Int32(parse_int32(raw)),
        }
    }
}

/// Parse an integer the way `atoi` does
///
/// Leading whitespace and an optional sign are accepted, parsing stops at the
/// first non-digit, and out-of-range values saturate.
fn parse_int32(raw: &str) -> i32 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }

    #[allow(clippy::cast_possible_truncation)]
    let clamped = value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    clamped
}

/// Typed parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Boolean(bool),
    Int32(i32),
    String(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Int32(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// A single session parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: ParameterValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, ParameterValue::String(value.into()))
    }

    pub fn boolean(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, ParameterValue::Boolean(value))
    }

    pub fn int32(key: impl Into<String>, value: i32) -> Self {
        Self::new(key, ParameterValue::Int32(value))
    }

    /// Build a parameter from a recognized helper key
    ///
    /// Returns `None` for keys outside [`DISCOVERED_KEYS`].
    pub fn discovered(key: &str, raw: &str) -> Option<Self> {
        ParameterKind::for_key(key).map(|kind| Self::new(key, kind.parse(raw)))
    }

    /// Parse a `key=value` assignment, as given on the command line
    ///
    /// Recognized keys get their table type; anything else is a string.
    pub fn parse_assignment(assignment: &str) -> Option<Self> {
        let (key, raw) = assignment.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let raw = raw.trim();
        Some(Self::discovered(key, raw).unwrap_or_else(|| Self::string(key, raw)))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.key, ASSIGNMENT_SEPARATOR, self.value)
    }
}

/// Ordered list of parameters
///
/// Duplicate keys are allowed; readers resolve them with last-occurrence-wins,
/// which is what [`ParameterSet::get`] and [`ParameterSet::to_map`] do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(Vec<Parameter>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, parameter: Parameter) {
        self.0.push(parameter);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Parameter] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Parameter> {
        self.0
    }

    /// Value of the last parameter named `key`
    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.0.iter().rev().find(|p| p.key == key).map(|p| &p.value)
    }

    /// Collapse into a map, later entries overwriting earlier ones
    pub fn to_map(&self) -> BTreeMap<String, ParameterValue> {
        self.0
            .iter()
            .map(|p| (p.key.clone(), p.value.clone()))
            .collect()
    }
}

impl From<Vec<Parameter>> for ParameterSet {
    fn from(parameters: Vec<Parameter>) -> Self {
        Self(parameters)
    }
}

impl FromIterator<Parameter> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Parameter> for ParameterSet {
    fn extend<I: IntoIterator<Item = Parameter>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for ParameterSet {
    type Item = Parameter;
    type IntoIter = std::vec::IntoIter<Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Parse helper output into typed parameters
///
/// Each line is split on the first `" = "`. Lines without a separator and
/// unrecognized keys are dropped. Keys for which `skip` returns true are
/// dropped as well (they are about to be replaced by an override). Duplicate
/// keys are kept in wire order.
pub fn parse_helper_output(stdout: &str, mut skip: impl FnMut(&str) -> bool) -> ParameterSet {
    let mut parameters = ParameterSet::new();

    for line in stdout.split('\n') {
        let Some((key, raw)) = line.split_once(ASSIGNMENT_SEPARATOR) else {
            continue;
        };

        if skip(key) {
            tracing::trace!(key, "Discovered parameter superseded by override");
            continue;
        }

        match Parameter::discovered(key, raw) {
            Some(parameter) => parameters.push(parameter),
            None => tracing::trace!(key, "Ignoring unrecognized helper key"),
        }
    }

    parameters
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str =
        "login-session-id = 42\ndisplay-device = /dev/tty1\nis-local = true\nunix-user = 1000\n";

    #[test]
    fn test_parse_sample_output() {
        let params = parse_helper_output(SAMPLE, |_| false);
        assert_eq!(
            params.into_vec(),
            vec![
                Parameter::string("login-session-id", "42"),
                Parameter::string("display-device", "/dev/tty1"),
                Parameter::boolean("is-local", true),
                Parameter::int32("unix-user", 1000),
            ]
        );
    }

    #[test]
    fn test_skip_drops_overridden_keys() {
        let params = parse_helper_output(SAMPLE, |key| key == "is-local");
        assert_eq!(params.len(), 3);
        assert!(params.get("is-local").is_none());
    }

    #[test]
    fn test_unrecognized_and_malformed_lines_are_dropped() {
        let output = "foo = bar\nsession-type=x11\n\nx11-display = :0\n = orphan\n";
        let params = parse_helper_output(output, |_| false);
        assert_eq!(params.into_vec(), vec![Parameter::string("x11-display", ":0")]);
    }

    #[test]
    fn test_value_split_on_first_separator_only() {
        let params = parse_helper_output("remote-host-name = a = b\n", |_| false);
        assert_eq!(
            params.get("remote-host-name"),
            Some(&ParameterValue::String("a = b".to_string()))
        );
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let output = "session-type = x11\nsession-type = wayland\n";
        let params = parse_helper_output(output, |_| false);
        assert_eq!(params.len(), 2);
        assert_eq!(
            params.get("session-type"),
            Some(&ParameterValue::String("wayland".to_string()))
        );
        assert_eq!(
            params.to_map().get("session-type"),
            Some(&ParameterValue::String("wayland".to_string()))
        );
    }

    #[test]
    fn test_boolean_requires_exact_true() {
        assert_eq!(ParameterKind::Boolean.parse("true"), ParameterValue::Boolean(true));
        assert_eq!(ParameterKind::Boolean.parse("TRUE"), ParameterValue::Boolean(false));
        assert_eq!(ParameterKind::Boolean.parse("1"), ParameterValue::Boolean(false));
        assert_eq!(ParameterKind::Boolean.parse("true "), ParameterValue::Boolean(false));
    }

    #[test]
    fn test_int32_parsing() {
        assert_eq!(parse_int32("1000"), 1000);
        assert_eq!(parse_int32("  -7"), -7);
        assert_eq!(parse_int32("12abc"), 12);
        assert_eq!(parse_int32("abc"), 0);
        assert_eq!(parse_int32(""), 0);
        assert_eq!(parse_int32("99999999999"), i32::MAX);
        assert_eq!(parse_int32("-99999999999"), i32::MIN);
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            Parameter::parse_assignment("is-local=false"),
            Some(Parameter::boolean("is-local", false))
        );
        assert_eq!(
            Parameter::parse_assignment("seat = seat1"),
            Some(Parameter::string("seat", "seat1"))
        );
        assert_eq!(Parameter::parse_assignment("no-separator"), None);
        assert_eq!(Parameter::parse_assignment("=value"), None);
    }

    #[test]
    fn test_display_matches_wire_format() {
        assert_eq!(Parameter::int32("unix-user", 1000).to_string(), "unix-user = 1000");
        assert_eq!(Parameter::boolean("is-local", false).to_string(), "is-local = false");
    }

    #[test]
    fn test_json_shape() {
        let params: ParameterSet = vec![
            Parameter::boolean("is-local", true),
            Parameter::int32("unix-user", 1000),
        ]
        .into();
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"key": "is-local", "value": true},
                {"key": "unix-user", "value": 1000}
            ])
        );
    }
}
