//! Batch State Controller
//!
//! Decides which scan image runs next and persists it through `current_batch`.
//! The pointer advances by one per scan, retries an image whose previous run
//! never completed (`untested`), and wraps back to the first image once the
//! next one does not exist.

use crate::domain::{BatchPointer, BatchStatus, ImageId, SkipReason, TestImageState};
use crate::error::{Result, ScanError};
use crate::port::knobs::{ENFORCE_RUN_KNOB, TEST_FILE_KNOB};
use crate::port::{ControlError, DeviceHandle, Endpoint, KnobError, KnobProvider};
use tracing::{info, warn};

/// Operator overrides for batch selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOverrides {
    /// Load exactly this image
    pub image: Option<ImageId>,
    /// Run even though the previous run failed
    pub enforce_run: bool,
}

impl BatchOverrides {
    pub fn from_knobs(knobs: &dyn KnobProvider) -> std::result::Result<Self, KnobError> {
        let image = match knobs.knob_uint(TEST_FILE_KNOB)? {
            Some(raw) => Some(ImageId::new(u32::try_from(raw).map_err(|_| {
                KnobError::OutOfRange {
                    name: TEST_FILE_KNOB.to_string(),
                    value: format!("{raw:#x}"),
                }
            })?)),
            None => None,
        };
        let enforce_run = knobs.knob_uint(ENFORCE_RUN_KNOB)? == Some(1);
        Ok(Self { image, enforce_run })
    }
}

/// Result of batch selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// `current_batch` now holds this image
    Proceed(ImageId),
    Refuse(SkipReason),
}

fn read_primary(base: &dyn DeviceHandle, endpoint: Endpoint) -> Result<String> {
    base.read(endpoint)
        .map_err(|source| ScanError::StateUnreadable {
            device: base.name().to_string(),
            endpoint,
            source,
        })
}

/// Read `status` and `current_batch` of the primary instance
pub fn read_state(base: &dyn DeviceHandle) -> Result<TestImageState> {
    let status = read_primary(base, Endpoint::Status)?;
    let current_batch = read_primary(base, Endpoint::CurrentBatch)?;
    Ok(TestImageState::new(&status, current_batch))
}

/// Pick the next image and persist it
///
/// Errors are fatal init conditions; a refusal means the scan is skipped.
pub fn select_next_image(base: &dyn DeviceHandle, overrides: &BatchOverrides) -> Result<Selection> {
    let state = read_state(base)?;

    if state.previous_failed() && !overrides.enforce_run {
        warn!(device = %base.name(), "Previous run failure found! Refusing to run");
        return Ok(Selection::Refuse(SkipReason::PreviousFailure));
    }

    let requested = match overrides.image {
        Some(image) => image,
        None => match state.pointer() {
            Ok(BatchPointer::None) => ImageId::DEFAULT,
            Ok(BatchPointer::Image(current)) if state.status == BatchStatus::Untested => {
                info!(image_id = %current, "Test file remains untested, so try again");
                current
            }
            Ok(BatchPointer::Image(current)) => match current.next() {
                Ok(next) => next,
                Err(e) => {
                    info!(error = %e, "Cannot advance current_batch");
                    return Ok(Selection::Refuse(SkipReason::InvalidBatchPointer(state.current_batch)));
                }
            },
            Err(e) => {
                info!(error = %e, "Cannot parse current_batch value");
                return Ok(Selection::Refuse(SkipReason::InvalidBatchPointer(state.current_batch)));
            }
        },
    };

    persist(base, requested)
}

fn persist(base: &dyn DeviceHandle, image: ImageId) -> Result<Selection> {
    match write_batch(base, image)? {
        None => Ok(Selection::Proceed(image)),
        Some(ControlError::NotFound) if image != ImageId::DEFAULT => {
            info!(
                image_id = %image,
                default_id = %ImageId::DEFAULT,
                "Test file does not exist, starting over"
            );
            match write_batch(base, ImageId::DEFAULT)? {
                None => Ok(Selection::Proceed(ImageId::DEFAULT)),
                Some(err) => Ok(refuse_write(ImageId::DEFAULT, err)),
            }
        }
        Some(err) => Ok(refuse_write(image, err)),
    }
}

/// Write `current_batch`; permission problems are fatal, other errors are returned for the caller
fn write_batch(base: &dyn DeviceHandle, image: ImageId) -> Result<Option<ControlError>> {
    match base.write(Endpoint::CurrentBatch, &image.to_string()) {
        Ok(()) => Ok(None),
        Err(ControlError::PermissionDenied) => Err(ScanError::BatchPermissionDenied {
            device: base.name().to_string(),
            image_id: image.to_string(),
        }),
        Err(err) => Ok(Some(err)),
    }
}

fn refuse_write(image: ImageId, err: ControlError) -> Selection {
    warn!(image_id = %image, error = %err, "Cannot load test file");
    Selection::Refuse(SkipReason::BatchNotLoaded(format!("{image}: {err}")))
}
