// CPU Topology Port

use crate::domain::LogicalCpu;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse {path}: {value:?}")]
    Parse { path: String, value: String },
}

/// Enumerates the logical CPUs the scan may run on
pub trait TopologyProvider: Send + Sync {
    /// Online logical CPUs, ascending by CPU number
    fn logical_cpus(&self) -> Result<Vec<LogicalCpu>, TopologyError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Fixed topology
    pub struct StaticTopology {
        cpus: Vec<LogicalCpu>,
    }

    impl StaticTopology {
        /// `cores` cores with `threads` hardware threads each, numbered like Linux does
        /// (all thread-0 siblings first)
        pub fn uniform(cores: u32, threads: u32) -> Self {
            let mut cpus = Vec::new();
            for thread in 0..threads {
                for core in 0..cores {
                    cpus.push(LogicalCpu::new(thread * cores + core, 0, core, thread));
                }
            }
            Self { cpus }
        }
    }

    impl TopologyProvider for StaticTopology {
        fn logical_cpus(&self) -> Result<Vec<LogicalCpu>, TopologyError> {
            Ok(self.cpus.clone())
        }
    }
}
