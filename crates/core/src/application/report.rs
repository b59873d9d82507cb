//! Scan report: per-CPU outcomes of one session

use crate::domain::{LogicalCpu, Outcome, SelfTestSession};
use serde::Serialize;

/// Outcome of one logical CPU
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuResult {
    pub cpu: LogicalCpu,
    pub outcome: Outcome,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub session: SelfTestSession,
    pub cpus: Vec<CpuResult>,
    /// Failure beats success beats skip
    pub overall: Outcome,
    pub duration_ms: i64,
}

impl ScanReport {
    pub fn new(session: SelfTestSession, mut cpus: Vec<CpuResult>, finished_at: i64) -> Self {
        cpus.sort_by_key(|r| r.cpu.cpu_number);
        let overall = Outcome::combine(cpus.iter().map(|r| &r.outcome));
        let duration_ms = finished_at - session.started_at;
        Self {
            session,
            cpus,
            overall,
            duration_ms,
        }
    }

    pub fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.cpus.iter().filter(|r| pred(&r.outcome)).count()
    }
}
