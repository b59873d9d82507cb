// Result classification for failed scans
//
// Codes populated by the driver itself (not by the scan hardware):
// 0xFD: test timed out before completing all chunks
// 0xFE: not all chunks were executed, forward progress retries exhausted

use serde::Serialize;

/// Software timeout
pub const IFS_SW_TIMEOUT: u64 = 0xFD;

/// Partial completion (retries exhausted)
pub const IFS_SW_PARTIAL_COMPLETION: u64 = 0xFE;

/// How a failure detail code should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The run did not reach a verdict; not a defect
    Soft,
    /// A real failure
    Hard,
}

/// Allow-list membership test. Unknown codes are real failures.
pub fn classify_detail_code(code: u64) -> Severity {
    match code {
        IFS_SW_TIMEOUT | IFS_SW_PARTIAL_COMPLETION => Severity::Soft,
        _ => Severity::Hard,
    }
}

/// Parsed content of the `details` endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailCode(u64);

impl DetailCode {
    /// Parse leading hex digits with an optional `0x` prefix
    ///
    /// Returns `None` when no hex digit is present or the value overflows u64.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim_start();
        let digits = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        let end = digits
            .find(|c: char| !c.is_ascii_hexdigit())
            .unwrap_or(digits.len());
        if end == 0 {
            return None;
        }
        u64::from_str_radix(&digits[..end], 16).ok().map(DetailCode)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn severity(&self) -> Severity {
        classify_detail_code(self.0)
    }
}
