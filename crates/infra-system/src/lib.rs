// fieldscan Infrastructure - System Adapters
// Implements: ControlFs, ModuleLoader, TopologyProvider

pub mod affinity;
pub mod modprobe_loader;
pub mod sysfs_control_fs;
pub mod sysfs_topology;

pub use affinity::pin_current_thread;
pub use modprobe_loader::ModprobeLoader;
pub use sysfs_control_fs::SysfsControlFs;
pub use sysfs_topology::SysfsTopology;
