// Configuration Knob Port
// Named overrides supplied by the operator (`-O name=value`)

use crate::domain::parse_unsigned;
use std::collections::HashMap;
use thiserror::Error;

/// Explicit image id to load instead of advancing the batch pointer
pub const TEST_FILE_KNOB: &str = "test_file";

/// Run even though the previous run failed (value 1)
pub const ENFORCE_RUN_KNOB: &str = "enforce_run";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KnobError {
    #[error("Knob {name} is not an unsigned integer: {value:?}")]
    NotUnsigned { name: String, value: String },

    #[error("Knob {name} out of range: {value:?}")]
    OutOfRange { name: String, value: String },

    #[error("Malformed knob {0:?}, expected name=value")]
    Malformed(String),
}

/// Knob lookup
pub trait KnobProvider: Send + Sync {
    /// Raw knob value, `None` when unset
    fn knob(&self, name: &str) -> Option<String>;

    /// Knob parsed as decimal or `0x` hex
    fn knob_uint(&self, name: &str) -> Result<Option<u64>, KnobError> {
        match self.knob(name) {
            None => Ok(None),
            Some(value) => parse_unsigned(&value)
                .map(Some)
                .ok_or_else(|| KnobError::NotUnsigned {
                    name: name.to_string(),
                    value,
                }),
        }
    }
}

/// Knobs held in memory, built from `name=value` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnobSet {
    values: HashMap<String, String>,
}

impl KnobSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `name=value` entries; later entries override earlier ones
    pub fn parse<I, S>(entries: I) -> Result<Self, KnobError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            let (name, value) = entry
                .split_once('=')
                .filter(|(name, _)| !name.trim().is_empty())
                .ok_or_else(|| KnobError::Malformed(entry.to_string()))?;
            set.set(name.trim(), value.trim());
        }
        Ok(set)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }
}

impl KnobProvider for KnobSet {
    fn knob(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entries() {
        let knobs = KnobSet::parse(["test_file=0x3", "enforce_run = 1", ""]).unwrap();
        assert_eq!(knobs.knob_uint(TEST_FILE_KNOB).unwrap(), Some(3));
        assert_eq!(knobs.knob_uint(ENFORCE_RUN_KNOB).unwrap(), Some(1));
        assert_eq!(knobs.knob_uint("missing").unwrap(), None);
    }

    #[test]
    fn test_later_entry_wins() {
        let knobs = KnobSet::parse(["test_file=1", "test_file=2"]).unwrap();
        assert_eq!(knobs.knob(TEST_FILE_KNOB).as_deref(), Some("2"));
    }

    #[test]
    fn test_malformed_entries() {
        assert_eq!(
            KnobSet::parse(["enforce_run"]),
            Err(KnobError::Malformed("enforce_run".to_string()))
        );
        assert!(KnobSet::parse(["=1"]).is_err());
    }

    #[test]
    fn test_not_unsigned() {
        let knobs = KnobSet::new().with(TEST_FILE_KNOB, "next");
        assert!(matches!(
            knobs.knob_uint(TEST_FILE_KNOB),
            Err(KnobError::NotUnsigned { .. })
        ));
    }
}
