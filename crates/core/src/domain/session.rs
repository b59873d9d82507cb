// Self-test session: what init selected, kept for diagnostics during the run phase

use super::image::ImageId;
use serde::Serialize;

/// Version string used when `image_version` cannot be read
pub const UNKNOWN_IMAGE_VERSION: &str = "unknown";

/// State established at init and shared read-only by every per-core run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelfTestSession {
    pub session_id: String,
    pub image_id: ImageId,
    pub image_version: String,
    /// Milliseconds since epoch
    pub started_at: i64,
}

impl SelfTestSession {
    pub fn new(
        session_id: impl Into<String>,
        image_id: ImageId,
        image_version: Option<String>,
        started_at: i64,
    ) -> Self {
        let image_version = image_version
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN_IMAGE_VERSION.to_string());
        Self {
            session_id: session_id.into(),
            image_id,
            image_version,
            started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_version_fallback() {
        let s = SelfTestSession::new("s1", ImageId::DEFAULT, None, 0);
        assert_eq!(s.image_version, "unknown");

        let s = SelfTestSession::new("s1", ImageId::DEFAULT, Some(String::new()), 0);
        assert_eq!(s.image_version, "unknown");

        let s = SelfTestSession::new("s1", ImageId::new(3), Some("0x0500".to_string()), 0);
        assert_eq!(s.image_version, "0x0500");
        assert_eq!(s.image_id.to_string(), "0x3");
    }
}
