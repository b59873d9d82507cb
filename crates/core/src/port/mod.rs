// Port Layer - Interfaces for the control tree and the scan's collaborators

pub mod control_fs;
pub mod id_provider; // For deterministic testing
pub mod knobs;
pub mod module_loader;
pub mod time_provider;
pub mod topology;

// Re-exports
pub use control_fs::{Access, ControlError, ControlFs, DeviceHandle, Endpoint};
pub use id_provider::IdProvider;
pub use knobs::{KnobError, KnobProvider, KnobSet};
pub use module_loader::{LoaderError, ModuleLoader};
pub use time_provider::TimeProvider;
pub use topology::{TopologyError, TopologyProvider};
