//! End-to-end init + run against a control tree on disk
//!
//! A plain directory stands in for the kernel: endpoint files are pre-written
//! with the values the driver would report after a scan.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use fieldscan_core::application::{CpuResult, InitOutcome, ScanConfig, ScanReport, ScanService};
use fieldscan_core::domain::{ImageId, LogicalCpu, Outcome, SelfTestSession, SkipReason};
use fieldscan_core::port::id_provider::FixedIdProvider;
use fieldscan_core::port::knobs::{ENFORCE_RUN_KNOB, TEST_FILE_KNOB};
use fieldscan_core::port::module_loader::mocks::MockModuleLoader;
use fieldscan_core::port::time_provider::FixedTimeProvider;
use fieldscan_core::port::{KnobSet, ModuleLoader};
use fieldscan_core::ScanError;
use fieldscan_infra_system::{ModprobeLoader, SysfsControlFs};
use tempfile::TempDir;

const NOW: i64 = 1_700_000_000_000;

fn write_instance(root: &Path, name: &str, values: &[(&str, &str)]) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("run_test"), "").unwrap();
    for (file, value) in values {
        fs::write(dir.join(file), format!("{value}\n")).unwrap();
    }
}

fn read_endpoint(root: &Path, name: &str, file: &str) -> String {
    fs::read_to_string(root.join(name).join(file)).unwrap()
}

fn service(root: &Path, loader: Arc<dyn ModuleLoader>, knobs: KnobSet) -> ScanService {
    let config = ScanConfig::default().with_control_root(root);
    ScanService::new(
        config,
        Arc::new(SysfsControlFs::new(root)),
        loader,
        Arc::new(knobs),
        Arc::new(FixedTimeProvider(NOW)),
        Arc::new(FixedIdProvider("it-session")),
    )
}

fn ready(outcome: InitOutcome) -> SelfTestSession {
    match outcome {
        InitOutcome::Ready(session) => session,
        InitOutcome::Skip(reason) => panic!("expected a session, init skipped: {reason}"),
    }
}

#[test]
fn test_first_run_loads_driver_and_starts_at_default_image() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();

    // The driver is not loaded until the loader runs
    let hook_root = root.clone();
    let loader = Arc::new(MockModuleLoader::new_success().with_hook(move || {
        write_instance(
            &hook_root,
            "intel_ifs_0",
            &[("status", "untested"), ("current_batch", "none"), ("image_version", "0x0500")],
        );
    }));

    let service = service(&root, loader.clone(), KnobSet::new());
    let session = ready(service.init().unwrap());

    assert_eq!(loader.call_count(), 1);
    assert_eq!(session.session_id, "it-session");
    assert_eq!(session.image_id, ImageId::DEFAULT);
    assert_eq!(session.image_version, "0x0500");
    assert_eq!(session.started_at, NOW);
    assert_eq!(read_endpoint(&root, "intel_ifs_0", "current_batch"), "0x1");
}

#[test]
fn test_pass_advances_batch_and_runs_every_instance() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_instance(root, "intel_ifs_0", &[("status", "pass"), ("current_batch", "0x1")]);
    write_instance(root, "intel_ifs_1", &[("status", "pass")]);

    let service = service(root, Arc::new(MockModuleLoader::new_success()), KnobSet::new());
    let session = ready(service.init().unwrap());
    assert_eq!(session.image_id, ImageId::new(2));
    assert_eq!(session.image_version, "unknown");
    assert_eq!(read_endpoint(root, "intel_ifs_0", "current_batch"), "0x2");

    let driver = service.driver(session);
    let outcome = driver.run_on_core(&LogicalCpu::new(3, 0, 3, 0));

    assert_eq!(outcome, Outcome::Success);
    assert_eq!(read_endpoint(root, "intel_ifs_0", "run_test"), "3\n");
    assert_eq!(read_endpoint(root, "intel_ifs_1", "run_test"), "3\n");
}

#[test]
fn test_untested_image_is_retried() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_instance(root, "intel_ifs_0", &[("status", "untested"), ("current_batch", "0x4")]);

    let service = service(root, Arc::new(MockModuleLoader::new_success()), KnobSet::new());
    let session = ready(service.init().unwrap());

    assert_eq!(session.image_id, ImageId::new(4));
    assert_eq!(read_endpoint(root, "intel_ifs_0", "current_batch"), "0x4");
}

#[test]
fn test_previous_failure_refuses_unless_enforced() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_instance(root, "intel_ifs_0", &[("status", "fail"), ("current_batch", "0x2")]);

    let refused = service(root, Arc::new(MockModuleLoader::new_success()), KnobSet::new());
    assert_eq!(
        refused.init().unwrap(),
        InitOutcome::Skip(SkipReason::PreviousFailure)
    );
    // Nothing persisted on refusal
    assert_eq!(read_endpoint(root, "intel_ifs_0", "current_batch"), "0x2\n");

    let enforced = service(
        root,
        Arc::new(MockModuleLoader::new_success()),
        KnobSet::new().with(ENFORCE_RUN_KNOB, "1"),
    );
    let session = ready(enforced.init().unwrap());
    assert_eq!(session.image_id, ImageId::new(3));
}

#[test]
fn test_test_file_override_is_used_verbatim() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_instance(root, "intel_ifs_0", &[("status", "pass"), ("current_batch", "0x7")]);

    let service = service(
        root,
        Arc::new(MockModuleLoader::new_success()),
        KnobSet::new().with(TEST_FILE_KNOB, "0x10"),
    );
    let session = ready(service.init().unwrap());

    assert_eq!(session.image_id, ImageId::new(0x10));
    assert_eq!(read_endpoint(root, "intel_ifs_0", "current_batch"), "0x10");
}

#[test]
fn test_garbage_batch_pointer_refuses() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_instance(root, "intel_ifs_0", &[("status", "pass"), ("current_batch", "bogus")]);

    let service = service(root, Arc::new(MockModuleLoader::new_success()), KnobSet::new());
    assert!(matches!(
        service.init().unwrap(),
        InitOutcome::Skip(SkipReason::InvalidBatchPointer(_))
    ));
}

#[test]
fn test_missing_driver_is_fatal_when_loader_cannot_help() {
    let dir = TempDir::new().unwrap();
    let loader = Arc::new(ModprobeLoader::new("true", Vec::<String>::new()));

    let service = service(dir.path(), loader, KnobSet::new());
    assert!(matches!(
        service.init(),
        Err(ScanError::DeviceUnavailable { .. })
    ));
}

#[test]
fn test_missing_trigger_endpoint_is_fatal() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_instance(root, "intel_ifs_0", &[("status", "pass"), ("current_batch", "0x1")]);
    fs::remove_file(root.join("intel_ifs_0/run_test")).unwrap();

    let service = service(root, Arc::new(MockModuleLoader::new_success()), KnobSet::new());
    assert!(matches!(
        service.init(),
        Err(ScanError::EndpointInaccessible { .. })
    ));
}

#[test]
fn test_hard_failure_fails_the_core() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_instance(root, "intel_ifs_0", &[("status", "pass"), ("current_batch", "0x1")]);
    write_instance(
        root,
        "intel_ifs_1",
        &[("status", "fail"), ("details", "0x8100008000")],
    );

    let service = service(root, Arc::new(MockModuleLoader::new_success()), KnobSet::new());
    let driver = service.driver(ready(service.init().unwrap()));

    match driver.run_on_core(&LogicalCpu::new(0, 0, 0, 0)) {
        Outcome::Fail(detail) => {
            assert_eq!(detail.instance, "intel_ifs_1");
            assert_eq!(detail.details.as_deref(), Some("0x8100008000"));
            assert_eq!(detail.image_id, "0x2");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn test_soft_failures_give_no_verdict() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_instance(
        root,
        "intel_ifs_0",
        &[("status", "fail"), ("current_batch", "0x1"), ("details", "0xfd")],
    );
    write_instance(root, "intel_ifs_1", &[("status", "fail"), ("details", "0xfe")]);

    let service = service(
        root,
        Arc::new(MockModuleLoader::new_success()),
        KnobSet::new().with(ENFORCE_RUN_KNOB, "1"),
    );
    let driver = service.driver(ready(service.init().unwrap()));

    assert_eq!(
        driver.run_on_core(&LogicalCpu::new(0, 0, 0, 0)),
        Outcome::Skip(SkipReason::NoInstancePassed)
    );
}

#[test]
fn test_report_over_siblings_and_primaries() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_instance(root, "intel_ifs_0", &[("status", "pass"), ("current_batch", "0x1")]);

    let service = service(root, Arc::new(MockModuleLoader::new_success()), KnobSet::new());
    let session = ready(service.init().unwrap());
    let driver = service.driver(session.clone());

    let run = |cpu: LogicalCpu| CpuResult {
        cpu,
        outcome: driver.run_on_core(&cpu),
        duration_ms: 0,
    };

    // The sibling thread never writes the trigger
    let mut results = vec![run(LogicalCpu::new(2, 0, 0, 1))];
    assert_eq!(read_endpoint(root, "intel_ifs_0", "run_test"), "");

    results.push(run(LogicalCpu::new(1, 0, 1, 0)));
    assert_eq!(read_endpoint(root, "intel_ifs_0", "run_test"), "1\n");
    results.push(run(LogicalCpu::new(0, 0, 0, 0)));
    assert_eq!(read_endpoint(root, "intel_ifs_0", "run_test"), "0\n");

    let report = ScanReport::new(session, results, NOW + 5);
    assert_eq!(report.overall, Outcome::Success);
    assert_eq!(report.duration_ms, 5);
    assert_eq!(report.cpus[0].cpu.cpu_number, 0);
    assert_eq!(
        report.cpus[2].outcome,
        Outcome::Skip(SkipReason::NotPrimaryThread)
    );
    assert_eq!(report.count(Outcome::is_success), 2);
}
