//! Per-core fan-out
//!
//! Every selected logical CPU gets its own blocking task, pinned to that CPU,
//! all running concurrently. Each task blocks in the kernel for as long as the
//! scan takes.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;

use fieldscan_core::application::{CpuResult, ScanDriver, ScanReport};
use fieldscan_core::domain::LogicalCpu;
use fieldscan_core::port::TimeProvider;
use fieldscan_infra_system::pin_current_thread;

fn run_pinned(driver: &ScanDriver, cpu: LogicalCpu, time_provider: &dyn TimeProvider) -> CpuResult {
    if let Err(e) = pin_current_thread(cpu.cpu_number) {
        warn!(cpu = cpu.cpu_number, error = %e, "Could not pin thread, running unpinned");
    }
    let start = time_provider.now_millis();
    let outcome = driver.run_on_core(&cpu);
    CpuResult {
        cpu,
        outcome,
        duration_ms: time_provider.now_millis() - start,
    }
}

/// Run `driver` on every CPU in `cpus` and collect the report
pub async fn run_all(
    driver: Arc<ScanDriver>,
    cpus: Vec<LogicalCpu>,
    time_provider: Arc<dyn TimeProvider>,
) -> Result<ScanReport> {
    let handles: Vec<_> = cpus
        .into_iter()
        .map(|cpu| {
            let driver = Arc::clone(&driver);
            let time_provider = Arc::clone(&time_provider);
            tokio::task::spawn_blocking(move || run_pinned(&driver, cpu, time_provider.as_ref()))
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.context("Per-core scan task panicked")?);
    }

    Ok(ScanReport::new(
        driver.session().clone(),
        results,
        time_provider.now_millis(),
    ))
}

/// Keep only the CPUs named in `selection` (kernel list syntax); all when `None`
pub fn select_cpus(cpus: Vec<LogicalCpu>, selection: Option<&str>) -> Result<Vec<LogicalCpu>> {
    let Some(selection) = selection else {
        return Ok(cpus);
    };
    let wanted = fieldscan_infra_system::sysfs_topology::parse_cpu_list(selection)
        .with_context(|| format!("Invalid CPU list {selection:?}"))?;
    Ok(cpus
        .into_iter()
        .filter(|cpu| wanted.contains(&cpu.cpu_number))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldscan_core::domain::{ImageId, Outcome, SelfTestSession, SkipReason};
    use fieldscan_core::port::control_fs::mocks::{InMemoryControlFs, MockInstance};
    use fieldscan_core::port::time_provider::SystemTimeProvider;
    use fieldscan_core::port::topology::mocks::StaticTopology;
    use fieldscan_core::port::TopologyProvider;

    fn driver(fs: &InMemoryControlFs) -> Arc<ScanDriver> {
        let session = SelfTestSession::new("runner", ImageId::DEFAULT, None, 0);
        Arc::new(ScanDriver::new(Arc::new(fs.clone()), session, "intel_ifs_"))
    }

    #[tokio::test]
    async fn test_run_all_primary_threads_only() {
        let fs = InMemoryControlFs::new([
            MockInstance::new("intel_ifs_0").on_trigger("pass", None),
            MockInstance::new("intel_ifs_1").on_trigger("pass", None),
        ]);
        let cpus = StaticTopology::uniform(2, 2).logical_cpus().unwrap();

        let report = run_all(driver(&fs), cpus, Arc::new(SystemTimeProvider))
            .await
            .unwrap();

        assert_eq!(report.overall, Outcome::Success);
        assert_eq!(report.cpus.len(), 4);
        assert_eq!(report.count(Outcome::is_success), 2);
        assert_eq!(
            report.cpus[2].outcome,
            Outcome::Skip(SkipReason::NotPrimaryThread)
        );

        let mut triggers = fs.triggers("intel_ifs_0");
        triggers.sort();
        assert_eq!(triggers, vec!["0\n", "1\n"]);
    }

    #[tokio::test]
    async fn test_run_all_failure_wins() {
        let fs = InMemoryControlFs::new([
            MockInstance::new("intel_ifs_0").on_trigger("fail", Some("0x1"))
        ]);
        let cpus = StaticTopology::uniform(2, 1).logical_cpus().unwrap();

        let report = run_all(driver(&fs), cpus, Arc::new(SystemTimeProvider))
            .await
            .unwrap();

        assert!(report.overall.is_fail());
    }

    #[test]
    fn test_select_cpus() {
        let cpus = StaticTopology::uniform(4, 1).logical_cpus().unwrap();

        let all = select_cpus(cpus.clone(), None).unwrap();
        assert_eq!(all.len(), 4);

        let some = select_cpus(cpus.clone(), Some("1-2,7")).unwrap();
        let numbers: Vec<u32> = some.iter().map(|c| c.cpu_number).collect();
        assert_eq!(numbers, vec![1, 2]);

        assert!(select_cpus(cpus, Some("2-1")).is_err());
    }
}
