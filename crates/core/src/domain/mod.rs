// Domain Layer - Batch state, results and their classification

pub mod cpu;
pub mod detail_code;
pub mod error;
pub mod image;
pub mod outcome;
pub mod session;

// Re-exports
pub use cpu::LogicalCpu;
pub use detail_code::{classify_detail_code, DetailCode, Severity};
pub use error::DomainError;
pub use image::{parse_unsigned, BatchPointer, BatchStatus, ImageId, TestImageState};
pub use outcome::{FailureDetail, Outcome, OutcomeFold, SkipReason};
pub use session::SelfTestSession;
