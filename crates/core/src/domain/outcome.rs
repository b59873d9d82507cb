// Scan outcomes and how they fold together

use serde::Serialize;
use std::fmt;

/// Why a run (or init) produced no verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `status` reported a failure and `enforce_run` was not set
    PreviousFailure,
    /// `current_batch` held something that is neither `none` nor a number
    InvalidBatchPointer(String),
    /// Writing `current_batch` failed for a reason other than a missing image
    BatchNotLoaded(String),
    /// Sibling hardware thread; only thread 0 of each core runs the scan
    NotPrimaryThread,
    /// The instance tree could not be enumerated during the run
    DeviceUnavailable(String),
    /// Every instance was absent, unreadable, soft-failed or in another state
    NoInstancePassed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PreviousFailure => write!(f, "previous run failure found"),
            SkipReason::InvalidBatchPointer(raw) => {
                write!(f, "cannot parse current_batch value {raw:?}")
            }
            SkipReason::BatchNotLoaded(err) => write!(f, "cannot load test file: {err}"),
            SkipReason::NotPrimaryThread => {
                write!(f, "test should run only on thread 0 of every core")
            }
            SkipReason::DeviceUnavailable(err) => write!(f, "device unavailable: {err}"),
            SkipReason::NoInstancePassed => write!(f, "no scan instance reported a result"),
        }
    }
}

/// Diagnostics for a hard failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    pub instance: String,
    /// Raw `details` text, `None` when it could not be read
    pub details: Option<String>,
    pub image_id: String,
    pub image_version: String,
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(
                f,
                "{} failed with condition {} (image {} version {})",
                self.instance, details, self.image_id, self.image_version
            ),
            None => write!(
                f,
                "{} failed, condition unavailable (image {} version {})",
                self.instance, self.image_id, self.image_version
            ),
        }
    }
}

/// Verdict of one run, per instance or aggregated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Skip(SkipReason),
    Fail(FailureDetail),
}

impl Outcome {
    pub fn is_fail(&self) -> bool {
        matches!(self, Outcome::Fail(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Outcome::Skip(_))
    }

    /// Combine independent outcomes (e.g. one per CPU)
    ///
    /// The first failure wins; otherwise any success; otherwise the first skip.
    pub fn combine<'a, I>(outcomes: I) -> Outcome
    where
        I: IntoIterator<Item = &'a Outcome>,
    {
        let mut first_skip = None;
        let mut any_success = false;
        for outcome in outcomes {
            match outcome {
                Outcome::Fail(_) => return outcome.clone(),
                Outcome::Success => any_success = true,
                Outcome::Skip(reason) => {
                    first_skip.get_or_insert_with(|| reason.clone());
                }
            }
        }
        if any_success {
            Outcome::Success
        } else {
            Outcome::Skip(first_skip.unwrap_or(SkipReason::NoInstancePassed))
        }
    }
}

/// Running aggregate of instance results within one invocation
///
/// Once a failure is recorded the fold is closed; callers stop iterating.
#[derive(Debug, Default)]
pub struct OutcomeFold {
    passed: usize,
    failure: Option<FailureDetail>,
}

impl OutcomeFold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass(&mut self) {
        self.passed += 1;
    }

    pub fn record_failure(&mut self, detail: FailureDetail) {
        self.failure.get_or_insert(detail);
    }

    pub fn is_closed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn finish(self) -> Outcome {
        match self.failure {
            Some(detail) => Outcome::Fail(detail),
            None if self.passed > 0 => Outcome::Success,
            None => Outcome::Skip(SkipReason::NoInstancePassed),
        }
    }
}
