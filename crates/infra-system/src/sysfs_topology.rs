// CPU topology from /sys/devices/system/cpu
use std::fs;
use std::path::{Path, PathBuf};

use fieldscan_core::domain::LogicalCpu;
use fieldscan_core::port::{TopologyError, TopologyProvider};

pub const DEFAULT_CPU_ROOT: &str = "/sys/devices/system/cpu";

/// Reads `online` and each CPU's `topology/` directory
pub struct SysfsTopology {
    root: PathBuf,
}

impl SysfsTopology {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, path: &Path) -> Result<String, TopologyError> {
        fs::read_to_string(path)
            .map(|s| s.trim().to_string())
            .map_err(|source| TopologyError::Read {
                path: path.display().to_string(),
                source,
            })
    }

    fn read_u32(&self, path: &Path) -> Result<u32, TopologyError> {
        let value = self.read(path)?;
        value.parse().map_err(|_| TopologyError::Parse {
            path: path.display().to_string(),
            value,
        })
    }

    fn read_list(&self, path: &Path) -> Result<Vec<u32>, TopologyError> {
        let value = self.read(path)?;
        parse_cpu_list(&value).ok_or_else(|| TopologyError::Parse {
            path: path.display().to_string(),
            value,
        })
    }

    fn cpu(&self, cpu_number: u32) -> Result<LogicalCpu, TopologyError> {
        let topology = self.root.join(format!("cpu{cpu_number}")).join("topology");
        let core_id = self.read_u32(&topology.join("core_id"))?;
        let package_id = self.read_u32(&topology.join("physical_package_id"))?;
        let mut siblings = self.read_list(&topology.join("thread_siblings_list"))?;
        siblings.sort_unstable();
        let thread_index = siblings
            .iter()
            .position(|&s| s == cpu_number)
            .unwrap_or(0) as u32;
        Ok(LogicalCpu::new(cpu_number, package_id, core_id, thread_index))
    }
}

impl Default for SysfsTopology {
    fn default() -> Self {
        Self::new(DEFAULT_CPU_ROOT)
    }
}

impl TopologyProvider for SysfsTopology {
    fn logical_cpus(&self) -> Result<Vec<LogicalCpu>, TopologyError> {
        let online = self.read_list(&self.root.join("online"))?;
        online.into_iter().map(|cpu| self.cpu(cpu)).collect()
    }
}

/// Parse a kernel CPU list such as `0-3,8,10-11`
///
/// Returns the CPUs in ascending order, `None` for malformed input.
pub fn parse_cpu_list(list: &str) -> Option<Vec<u32>> {
    let mut cpus = Vec::new();
    for part in list.trim().split(',').filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.trim().parse().ok()?;
                let end: u32 = end.trim().parse().ok()?;
                if end < start {
                    return None;
                }
                cpus.extend(start..=end);
            }
            None => cpus.push(part.trim().parse().ok()?),
        }
    }
    cpus.sort_unstable();
    cpus.dedup();
    Some(cpus)
}
