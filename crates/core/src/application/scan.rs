//! Scan service: the init entry point
//! Wires discovery and batch selection, then hands out per-core drivers

use super::batch::{select_next_image, BatchOverrides, Selection};
use super::config::ScanConfig;
use super::discovery::DeviceDiscovery;
use super::executor::ScanDriver;
use crate::domain::{SelfTestSession, SkipReason};
use crate::error::Result;
use crate::port::{ControlFs, Endpoint, IdProvider, KnobProvider, ModuleLoader, TimeProvider};
use std::sync::Arc;
use tracing::{info, info_span};

/// Non-fatal result of init
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Ready(SelfTestSession),
    Skip(SkipReason),
}

pub struct ScanService {
    config: ScanConfig,
    fs: Arc<dyn ControlFs>,
    loader: Arc<dyn ModuleLoader>,
    knobs: Arc<dyn KnobProvider>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
}

impl ScanService {
    pub fn new(
        config: ScanConfig,
        fs: Arc<dyn ControlFs>,
        loader: Arc<dyn ModuleLoader>,
        knobs: Arc<dyn KnobProvider>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            config,
            fs,
            loader,
            knobs,
            time_provider,
            id_provider,
        }
    }

    /// Make sure the device exists, select and persist the next image
    ///
    /// # Errors
    /// Fatal environment problems only (device missing after load attempt,
    /// endpoints not writable, primary state unreadable, bad knobs).
    pub fn init(&self) -> Result<InitOutcome> {
        let session_id = self.id_provider.generate_id();
        let _span = info_span!("scan_init", session_id = %session_id).entered();

        let overrides = BatchOverrides::from_knobs(self.knobs.as_ref())?;

        let discovery = DeviceDiscovery::new(Arc::clone(&self.fs), Arc::clone(&self.loader));
        let base = discovery.acquire_base_handle(&self.config.primary_instance)?;
        discovery.verify_access(base.as_ref())?;

        let image_id = match select_next_image(base.as_ref(), &overrides)? {
            Selection::Proceed(image_id) => image_id,
            Selection::Refuse(reason) => {
                info!(skip_reason = %reason, "Cannot load test file");
                return Ok(InitOutcome::Skip(reason));
            }
        };

        let image_version = base.read(Endpoint::ImageVersion).ok();
        let session = SelfTestSession::new(
            session_id,
            image_id,
            image_version,
            self.time_provider.now_millis(),
        );

        info!(
            image_id = %session.image_id,
            image_version = %session.image_version,
            "Test image selected"
        );
        Ok(InitOutcome::Ready(session))
    }

    /// Driver for the run phase of `session`
    pub fn driver(&self, session: SelfTestSession) -> ScanDriver {
        ScanDriver::new(
            Arc::clone(&self.fs),
            session,
            self.config.instance_prefix.clone(),
        )
    }
}
