//! Read-only view of every scan instance (nothing is triggered or written)

use crate::port::{ControlError, ControlFs, DeviceHandle, Endpoint};
use serde::Serialize;
use tracing::warn;

/// Endpoint values of one instance; `None` where the endpoint could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceState {
    pub instance: String,
    pub status: Option<String>,
    pub current_batch: Option<String>,
    pub details: Option<String>,
    pub image_version: Option<String>,
}

fn read_optional(handle: &dyn DeviceHandle, endpoint: Endpoint) -> Option<String> {
    match handle.read(endpoint) {
        Ok(value) => Some(value),
        Err(ControlError::NotFound) => None,
        Err(e) => {
            warn!(instance = %handle.name(), endpoint = %endpoint, error = %e, "Cannot read endpoint");
            None
        }
    }
}

/// Snapshot all instances whose name starts with `prefix`
pub fn inspect_instances(
    fs: &dyn ControlFs,
    prefix: &str,
) -> Result<Vec<InstanceState>, ControlError> {
    let mut states = Vec::new();
    for name in fs.list_instances(prefix)? {
        let handle = match fs.open_instance(&name) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(instance = %name, error = %e, "Cannot open instance");
                continue;
            }
        };
        let handle = handle.as_ref();
        states.push(InstanceState {
            instance: name,
            status: read_optional(handle, Endpoint::Status),
            current_batch: read_optional(handle, Endpoint::CurrentBatch),
            details: read_optional(handle, Endpoint::Details),
            image_version: read_optional(handle, Endpoint::ImageVersion),
        });
    }
    Ok(states)
}
