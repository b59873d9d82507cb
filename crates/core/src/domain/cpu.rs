// Logical CPU identity as seen by the run phase

use serde::Serialize;
use std::fmt;

/// One logical CPU and its place in the physical topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogicalCpu {
    /// Kernel CPU number, the value written to `run_test`
    pub cpu_number: u32,
    pub package_id: u32,
    pub core_id: u32,
    /// Position of this CPU among the hardware threads of its core
    pub thread_index: u32,
}

impl LogicalCpu {
    pub fn new(cpu_number: u32, package_id: u32, core_id: u32, thread_index: u32) -> Self {
        Self {
            cpu_number,
            package_id,
            core_id,
            thread_index,
        }
    }

    /// Only the first hardware thread of a core may trigger the scan
    pub fn is_primary_thread(&self) -> bool {
        self.thread_index == 0
    }
}

impl fmt::Display for LogicalCpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cpu{} (package {} core {} thread {})",
            self.cpu_number, self.package_id, self.core_id, self.thread_index
        )
    }
}
