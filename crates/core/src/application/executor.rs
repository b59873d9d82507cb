//! Instance Execution Driver
//!
//! Runs the scan on one logical CPU across every instance directory and folds
//! the per-instance results. A hard failure stops the iteration: no later
//! instance is triggered in the same call.

use crate::domain::{
    BatchStatus, DetailCode, FailureDetail, LogicalCpu, Outcome, OutcomeFold, SelfTestSession,
    Severity, SkipReason,
};
use crate::port::{ControlFs, DeviceHandle, Endpoint};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};

/// What one instance contributed to the run
#[derive(Debug)]
enum InstanceVerdict {
    Passed,
    Failed(FailureDetail),
    /// Unreachable, soft failure, or a status that is neither pass nor fail
    NoVerdict,
}

/// Per-core run entry point, built from a session established at init
///
/// Holds no mutable state, so one driver may serve every CPU concurrently.
pub struct ScanDriver {
    fs: Arc<dyn ControlFs>,
    session: SelfTestSession,
    instance_prefix: String,
}

impl ScanDriver {
    pub fn new(
        fs: Arc<dyn ControlFs>,
        session: SelfTestSession,
        instance_prefix: impl Into<String>,
    ) -> Self {
        Self {
            fs,
            session,
            instance_prefix: instance_prefix.into(),
        }
    }

    pub fn session(&self) -> &SelfTestSession {
        &self.session
    }

    /// Run the scan for `cpu` on every instance
    ///
    /// Instances are re-enumerated on each call. Blocks for as long as the
    /// scans take.
    pub fn run_on_core(&self, cpu: &LogicalCpu) -> Outcome {
        let _span = info_span!(
            "scan_run",
            session_id = %self.session.session_id,
            cpu = cpu.cpu_number
        )
        .entered();

        if !cpu.is_primary_thread() {
            let reason = SkipReason::NotPrimaryThread;
            info!(skip_reason = %reason, thread = cpu.thread_index, "Skipping sibling thread");
            return Outcome::Skip(reason);
        }

        let instances = match self.fs.list_instances(&self.instance_prefix) {
            Ok(instances) => instances,
            Err(e) => {
                error!(error = %e, "Cannot enumerate scan instances");
                return Outcome::Skip(SkipReason::DeviceUnavailable(e.to_string()));
            }
        };

        let trigger = format!("{}\n", cpu.cpu_number);
        let mut fold = OutcomeFold::new();

        for name in &instances {
            match self.run_instance(name, &trigger) {
                InstanceVerdict::Passed => fold.record_pass(),
                InstanceVerdict::Failed(detail) => fold.record_failure(detail),
                InstanceVerdict::NoVerdict => {}
            }
            if fold.is_closed() {
                break;
            }
        }

        let passed = fold.passed();
        let outcome = fold.finish();
        match &outcome {
            Outcome::Skip(reason) => info!(skip_reason = %reason, "Scan produced no verdict"),
            Outcome::Success => debug!(passed, instances = instances.len(), "Scan passed"),
            Outcome::Fail(_) => {}
        }
        outcome
    }

    fn run_instance(&self, name: &str, trigger: &str) -> InstanceVerdict {
        let handle = match self.fs.open_instance(name) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(instance = %name, error = %e, "Could not start test");
                return InstanceVerdict::NoVerdict;
            }
        };

        // Blocks until the scan on this CPU has finished
        if let Err(e) = handle.write(Endpoint::RunTest, trigger) {
            warn!(instance = %name, error = %e, "Could not start test");
            return InstanceVerdict::NoVerdict;
        }

        let status = match handle.read(Endpoint::Status) {
            Ok(status) => status,
            Err(e) => {
                warn!(instance = %name, error = %e, "Could not obtain result");
                return InstanceVerdict::NoVerdict;
            }
        };

        match BatchStatus::parse(&status) {
            BatchStatus::Fail => self.classify_failure(handle.as_ref()),
            BatchStatus::Pass => {
                debug!(instance = %name, "Test passed");
                InstanceVerdict::Passed
            }
            BatchStatus::Untested | BatchStatus::Other(_) => InstanceVerdict::NoVerdict,
        }
    }

    fn classify_failure(&self, handle: &dyn DeviceHandle) -> InstanceVerdict {
        let name = handle.name();
        let details = match handle.read(Endpoint::Details) {
            Ok(details) => details,
            Err(e) => {
                error!(
                    instance = %name,
                    error = %e,
                    image_id = %self.session.image_id,
                    image_version = %self.session.image_version,
                    "Test failed but could not retrieve error condition"
                );
                return InstanceVerdict::Failed(self.failure(name, None));
            }
        };

        if let Some(Severity::Soft) = DetailCode::parse(&details).map(|c| c.severity()) {
            warn!(
                instance = %name,
                code = %details,
                image_id = %self.session.image_id,
                image_version = %self.session.image_version,
                "Test did not run to completion"
            );
            return InstanceVerdict::NoVerdict;
        }

        error!(
            instance = %name,
            condition = %details,
            image_id = %self.session.image_id,
            image_version = %self.session.image_version,
            "Test failed"
        );
        InstanceVerdict::Failed(self.failure(name, Some(details)))
    }

    fn failure(&self, instance: &str, details: Option<String>) -> FailureDetail {
        FailureDetail {
            instance: instance.to_string(),
            details,
            image_id: self.session.image_id.to_string(),
            image_version: self.session.image_version.clone(),
        }
    }
}
