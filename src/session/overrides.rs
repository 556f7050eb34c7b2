//! Caller-supplied parameters that win over discovered ones

use serde::Serialize;

use crate::types::{Parameter, ParameterValue};

/// Keys that identify the session and can never be overridden
pub const PROTECTED_KEYS: &[&str] = &["id", "cookie"];

/// Override parameters keyed by name, in insertion order
///
/// Built in one piece from the caller's list; a later entry for a key already
/// present replaces its value but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OverrideParameters {
    entries: Vec<Parameter>,
}

impl OverrideParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the override map from a parameter list
    ///
    /// Entries for protected keys are dropped.
    pub fn from_parameters<I>(parameters: I) -> Self
    where
        I: IntoIterator<Item = Parameter>,
    {
        let mut overrides = Self::new();
        for parameter in parameters {
            if PROTECTED_KEYS.contains(&parameter.key.as_str()) {
                tracing::warn!(key = %parameter.key, "Ignoring override of protected session key");
                continue;
            }
            match overrides.entries.iter_mut().find(|p| p.key == parameter.key) {
                Some(existing) => existing.value = parameter.value,
                None => overrides.entries.push(parameter),
            }
        }
        overrides
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|p| p.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.entries.iter().find(|p| p.key == key).map(|p| &p.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_keys_dropped() {
        let overrides = OverrideParameters::from_parameters([
            Parameter::string("id", "/org/freedesktop/ConsoleKit/Session99"),
            Parameter::string("cookie", "stolen"),
            Parameter::boolean("is-local", false),
        ]);
        assert_eq!(overrides.len(), 1);
        assert!(!overrides.contains("id"));
        assert!(!overrides.contains("cookie"));
        assert_eq!(overrides.get("is-local"), Some(&ParameterValue::Boolean(false)));
    }

    #[test]
    fn test_duplicate_key_keeps_position_takes_last_value() {
        let overrides = OverrideParameters::from_parameters([
            Parameter::string("session-type", "x11"),
            Parameter::string("seat", "seat0"),
            Parameter::string("session-type", "wayland"),
        ]);
        let keys: Vec<_> = overrides.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["session-type", "seat"]);
        assert_eq!(
            overrides.get("session-type"),
            Some(&ParameterValue::String("wayland".to_string()))
        );
    }

    #[test]
    fn test_empty() {
        let overrides = OverrideParameters::new();
        assert!(overrides.is_empty());
        assert!(overrides.get("anything").is_none());
    }
}
