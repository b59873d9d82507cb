//! Device discovery: find the primary scan instance, loading the driver if needed

use crate::error::{Result, ScanError};
use crate::port::{Access, ControlFs, DeviceHandle, Endpoint, ModuleLoader};
use std::sync::Arc;
use tracing::{debug, info};

pub struct DeviceDiscovery {
    fs: Arc<dyn ControlFs>,
    loader: Arc<dyn ModuleLoader>,
}

impl DeviceDiscovery {
    pub fn new(fs: Arc<dyn ControlFs>, loader: Arc<dyn ModuleLoader>) -> Self {
        Self { fs, loader }
    }

    /// Open the primary instance, attempting one driver load if it is missing
    ///
    /// Loader failures are only logged; the second open decides.
    pub fn acquire_base_handle(&self, primary: &str) -> Result<Box<dyn DeviceHandle>> {
        match self.fs.open_instance(primary) {
            Ok(handle) => return Ok(handle),
            Err(e) => debug!(
                device = %primary,
                error = %e,
                "Scan device not present, attempting driver load"
            ),
        }

        if let Err(e) = self.loader.ensure_loaded() {
            debug!(error = %e, "Driver load attempt failed");
        }

        self.fs
            .open_instance(primary)
            .map_err(|source| ScanError::DeviceUnavailable {
                device: primary.to_string(),
                source,
            })
    }

    /// Init needs to trigger runs and rewrite the batch pointer
    pub fn verify_access(&self, base: &dyn DeviceHandle) -> Result<()> {
        for (endpoint, access) in [
            (Endpoint::RunTest, Access::Write),
            (Endpoint::CurrentBatch, Access::ReadWrite),
        ] {
            if let Err(source) = base.probe(endpoint, access) {
                info!(
                    device = %base.name(),
                    endpoint = %endpoint,
                    error = %source,
                    "Could not open endpoint for writing (not running as root?)"
                );
                return Err(ScanError::EndpointInaccessible {
                    device: base.name().to_string(),
                    endpoint,
                    source,
                });
            }
        }
        Ok(())
    }
}
