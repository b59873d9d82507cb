// Central Error Type for the scan driver

use crate::port::{ControlError, Endpoint, KnobError};
use thiserror::Error;

/// Fatal initialization errors
///
/// Anything that is not fatal is expressed through `InitOutcome::Skip` or
/// `Outcome`, never through this type.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Device {device} unavailable after module load attempt: {source}")]
    DeviceUnavailable {
        device: String,
        #[source]
        source: ControlError,
    },

    #[error("Could not open {device}/{endpoint} (not running as root?): {source}")]
    EndpointInaccessible {
        device: String,
        endpoint: Endpoint,
        #[source]
        source: ControlError,
    },

    #[error("Could not read {device}/{endpoint}: {source}")]
    StateUnreadable {
        device: String,
        endpoint: Endpoint,
        #[source]
        source: ControlError,
    },

    #[error("Permission denied persisting batch {image_id} on {device}")]
    BatchPermissionDenied { device: String, image_id: String },

    #[error("Invalid knob: {0}")]
    Knob(#[from] KnobError),
}

/// Result type alias using ScanError
pub type Result<T> = std::result::Result<T, ScanError>;
