//! Application Layer - Use cases: init (discovery + batch selection) and per-core runs

pub mod batch;
pub mod config;
pub mod constants;
pub mod discovery;
pub mod executor;
pub mod inspect;
pub mod report;
pub mod scan;

// Re-exports
pub use batch::{read_state, select_next_image, BatchOverrides, Selection};
pub use config::ScanConfig;
pub use discovery::DeviceDiscovery;
pub use executor::ScanDriver;
pub use inspect::{inspect_instances, InstanceState};
pub use report::{CpuResult, ScanReport};
pub use scan::{InitOutcome, ScanService};
