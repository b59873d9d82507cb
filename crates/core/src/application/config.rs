//! Scan configuration

use super::constants::*;
use std::path::PathBuf;

/// Where the control tree lives and how to load its driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub control_root: PathBuf,
    pub instance_prefix: String,
    pub primary_instance: String,
    pub loader_program: PathBuf,
    pub loader_args: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            control_root: PathBuf::from(DEFAULT_CONTROL_ROOT),
            instance_prefix: INSTANCE_PREFIX.to_string(),
            primary_instance: PRIMARY_INSTANCE.to_string(),
            loader_program: PathBuf::from(LOADER_PROGRAM),
            loader_args: LOADER_ARGS.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl ScanConfig {
    /// Same layout under a different root (tests, alternate mounts)
    pub fn with_control_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.control_root = root.into();
        self
    }
}
