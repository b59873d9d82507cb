// Test image (batch) identity and the persisted batch state

use super::error::{DomainError, Result};
use serde::Serialize;
use std::fmt;

/// Numeric id of a firmware scan image
///
/// Rendered the way `current_batch` expects it: `0x`-prefixed lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct ImageId(u32);

impl ImageId {
    /// Image the sequence starts from, and wraps back to
    pub const DEFAULT: ImageId = ImageId(1);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Next image in the sequence
    pub fn next(self) -> Result<ImageId> {
        self.0
            .checked_add(1)
            .map(ImageId)
            .ok_or(DomainError::ImageIdOverflow(self.0))
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<ImageId> for String {
    fn from(id: ImageId) -> Self {
        id.to_string()
    }
}

/// Parse an unsigned integer written either in decimal or with a `0x` prefix
pub fn parse_unsigned(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).ok();
    }
    value.parse::<u64>().ok()
}

/// Content of `current_batch`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPointer {
    /// No image has been loaded since the driver came up
    None,
    Image(ImageId),
}

impl BatchPointer {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.starts_with("none") {
            return Ok(BatchPointer::None);
        }
        parse_unsigned(raw)
            .and_then(|v| u32::try_from(v).ok())
            .map(|v| BatchPointer::Image(ImageId::new(v)))
            .ok_or_else(|| DomainError::InvalidBatchPointer(raw.to_string()))
    }
}

/// Last run status reported by the `status` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pass,
    Fail,
    Untested,
    Other(String),
}

impl BatchStatus {
    /// Classify by prefix, the way the driver prints these values
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("fail") {
            BatchStatus::Fail
        } else if raw.starts_with("untested") {
            BatchStatus::Untested
        } else if raw.starts_with("pass") {
            BatchStatus::Pass
        } else {
            BatchStatus::Other(raw.to_string())
        }
    }
}

/// Persisted selection state, read once at init
///
/// `current_batch` is kept raw so a refusal can report what the driver showed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestImageState {
    pub status: BatchStatus,
    pub current_batch: String,
}

impl TestImageState {
    pub fn new(status: &str, current_batch: impl Into<String>) -> Self {
        Self {
            status: BatchStatus::parse(status),
            current_batch: current_batch.into(),
        }
    }

    pub fn pointer(&self) -> Result<BatchPointer> {
        BatchPointer::parse(&self.current_batch)
    }

    /// The previous run failed and must be looked at before scanning again
    pub fn previous_failed(&self) -> bool {
        self.status == BatchStatus::Fail
    }
}
