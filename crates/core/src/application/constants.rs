//! Scan driver constants (ADR: No magic values)

/// Parent directory of the scan instance directories
pub const DEFAULT_CONTROL_ROOT: &str = "/sys/devices/virtual/misc";

/// Every scan instance directory starts with this
pub const INSTANCE_PREFIX: &str = "intel_ifs_";

/// Instance holding the batch state consulted at init
pub const PRIMARY_INSTANCE: &str = "intel_ifs_0";

/// Helper used to load the scan driver when it is missing
pub const LOADER_PROGRAM: &str = "/sbin/modprobe";

/// Quiet-mode arguments passed to the loader
pub const LOADER_ARGS: &[&str] = &["-q", "intel_ifs"];
