// Thread pinning for per-core runs
use std::io;

/// Pin the calling thread to one logical CPU
#[cfg(target_os = "linux")]
pub fn pin_current_thread(cpu: u32) -> io::Result<()> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    let mut set = CpuSet::new();
    set.set(cpu as usize).map_err(io::Error::from)?;
    sched_setaffinity(Pid::from_raw(0), &set).map_err(io::Error::from)
}

#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(_cpu: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "thread affinity is only supported on Linux",
    ))
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn test_pin_out_of_range() {
        assert!(pin_current_thread(u32::MAX).is_err());
    }
}
