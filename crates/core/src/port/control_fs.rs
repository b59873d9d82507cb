// Control-file tree port
// One directory per scan instance, each holding small text endpoints

use std::fmt;
use std::io;
use thiserror::Error;

/// Largest value accepted from an endpoint; the driver prints at most a 64-bit value
pub const MAX_CONTROL_VALUE_LEN: usize = 256;

/// Named endpoints inside an instance directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Status,
    CurrentBatch,
    Details,
    RunTest,
    ImageVersion,
}

impl Endpoint {
    pub fn file_name(&self) -> &'static str {
        match self {
            Endpoint::Status => "status",
            Endpoint::CurrentBatch => "current_batch",
            Endpoint::Details => "details",
            Endpoint::RunTest => "run_test",
            Endpoint::ImageVersion => "image_version",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Access mode checked by `DeviceHandle::probe`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

/// Control-file errors, kept coarse so callers can decide fatal/skip/continue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("not found")]
    NotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("value longer than {limit} bytes")]
    Oversized { limit: usize },

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<io::Error> for ControlError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ControlError::NotFound,
            io::ErrorKind::PermissionDenied => ControlError::PermissionDenied,
            _ => ControlError::Io(err.to_string()),
        }
    }
}

/// Turn raw endpoint bytes into a value: bounded, trailing newlines removed
pub fn decode_value(raw: &[u8]) -> Result<String, ControlError> {
    if raw.len() > MAX_CONTROL_VALUE_LEN {
        return Err(ControlError::Oversized {
            limit: MAX_CONTROL_VALUE_LEN,
        });
    }
    let mut value = String::from_utf8_lossy(raw).into_owned();
    while value.ends_with('\n') {
        value.pop();
    }
    Ok(value)
}

/// Handle on one instance directory
///
/// Endpoint files are opened per call and closed before returning.
pub trait DeviceHandle: Send + Sync {
    /// Directory name, e.g. `intel_ifs_0`
    fn name(&self) -> &str;

    /// Read an endpoint, see `decode_value`
    fn read(&self, endpoint: Endpoint) -> Result<String, ControlError>;

    /// Write a value in one call
    ///
    /// Writing `run_test` blocks until the scan on the requested CPU finished.
    fn write(&self, endpoint: Endpoint, value: &str) -> Result<(), ControlError>;

    /// Check that an endpoint can be opened with `access` without transferring data
    fn probe(&self, endpoint: Endpoint, access: Access) -> Result<(), ControlError>;
}

/// The tree of instance directories
pub trait ControlFs: Send + Sync {
    /// Open one instance directory
    fn open_instance(&self, name: &str) -> Result<Box<dyn DeviceHandle>, ControlError>;

    /// Directory names starting with `prefix`, in enumeration order
    fn list_instances(&self, prefix: &str) -> Result<Vec<String>, ControlError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::parse_unsigned;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::{Arc, Mutex};

    /// Scripted instance directory
    #[derive(Debug, Clone)]
    pub struct MockInstance {
        name: String,
        values: HashMap<Endpoint, String>,
        open_error: Option<ControlError>,
        read_errors: HashMap<Endpoint, ControlError>,
        write_errors: HashMap<Endpoint, ControlError>,
        probe_errors: HashMap<Endpoint, ControlError>,
        /// Images accepted by `current_batch`; `None` accepts any id
        images: Option<BTreeSet<u64>>,
        /// `status` and `details` published when `run_test` is written
        on_trigger: Option<(String, Option<String>)>,
        triggers: Vec<String>,
    }

    impl MockInstance {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                values: HashMap::new(),
                open_error: None,
                read_errors: HashMap::new(),
                write_errors: HashMap::new(),
                probe_errors: HashMap::new(),
                images: None,
                on_trigger: None,
                triggers: Vec::new(),
            }
        }

        pub fn with_value(mut self, endpoint: Endpoint, value: impl Into<String>) -> Self {
            self.values.insert(endpoint, value.into());
            self
        }

        pub fn with_images(mut self, images: impl IntoIterator<Item = u64>) -> Self {
            self.images = Some(images.into_iter().collect());
            self
        }

        /// Result the instance reports after each trigger
        pub fn on_trigger(mut self, status: &str, details: Option<&str>) -> Self {
            self.on_trigger = Some((status.to_string(), details.map(str::to_string)));
            self
        }

        pub fn fail_open(mut self, err: ControlError) -> Self {
            self.open_error = Some(err);
            self
        }

        pub fn fail_read(mut self, endpoint: Endpoint, err: ControlError) -> Self {
            self.read_errors.insert(endpoint, err);
            self
        }

        pub fn fail_write(mut self, endpoint: Endpoint, err: ControlError) -> Self {
            self.write_errors.insert(endpoint, err);
            self
        }

        pub fn fail_probe(mut self, endpoint: Endpoint, err: ControlError) -> Self {
            self.probe_errors.insert(endpoint, err);
            self
        }

        fn write(&mut self, endpoint: Endpoint, value: &str) -> Result<(), ControlError> {
            if let Some(err) = self.write_errors.get(&endpoint) {
                return Err(err.clone());
            }
            match endpoint {
                Endpoint::RunTest => {
                    self.triggers.push(value.to_string());
                    if let Some((status, details)) = self.on_trigger.clone() {
                        self.values.insert(Endpoint::Status, status);
                        match details {
                            Some(d) => self.values.insert(Endpoint::Details, d),
                            None => self.values.remove(&Endpoint::Details),
                        };
                    }
                }
                Endpoint::CurrentBatch => {
                    let id = parse_unsigned(value).ok_or_else(|| {
                        ControlError::Io(format!("invalid argument: {value:?}"))
                    })?;
                    if let Some(images) = &self.images {
                        if !images.contains(&id) {
                            return Err(ControlError::NotFound);
                        }
                    }
                    self.values.insert(endpoint, value.to_string());
                    self.values
                        .insert(Endpoint::Status, "untested".to_string());
                }
                _ => {
                    self.values.insert(endpoint, value.to_string());
                }
            }
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct State {
        instances: Vec<MockInstance>,
        list_error: Option<ControlError>,
        opened: Vec<String>,
    }

    impl State {
        fn instance(&mut self, name: &str) -> Result<&mut MockInstance, ControlError> {
            self.instances
                .iter_mut()
                .find(|i| i.name == name)
                .ok_or(ControlError::NotFound)
        }
    }

    /// In-memory control tree; clones share state
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryControlFs {
        state: Arc<Mutex<State>>,
    }

    impl InMemoryControlFs {
        pub fn new(instances: impl IntoIterator<Item = MockInstance>) -> Self {
            Self {
                state: Arc::new(Mutex::new(State {
                    instances: instances.into_iter().collect(),
                    ..Default::default()
                })),
            }
        }

        /// Add (or replace) an instance, e.g. to simulate a late module load
        pub fn insert(&self, instance: MockInstance) {
            let mut state = self.state.lock().unwrap();
            state.instances.retain(|i| i.name != instance.name);
            state.instances.push(instance);
        }

        pub fn fail_listing(&self, err: ControlError) {
            self.state.lock().unwrap().list_error = Some(err);
        }

        /// Names of instances opened so far, in order
        pub fn opened(&self) -> Vec<String> {
            self.state.lock().unwrap().opened.clone()
        }

        /// Values written to `run_test` of an instance
        pub fn triggers(&self, name: &str) -> Vec<String> {
            let mut state = self.state.lock().unwrap();
            state
                .instance(name)
                .map(|i| i.triggers.clone())
                .unwrap_or_default()
        }

        pub fn value(&self, name: &str, endpoint: Endpoint) -> Option<String> {
            let mut state = self.state.lock().unwrap();
            state
                .instance(name)
                .ok()
                .and_then(|i| i.values.get(&endpoint).cloned())
        }
    }

    impl ControlFs for InMemoryControlFs {
        fn open_instance(&self, name: &str) -> Result<Box<dyn DeviceHandle>, ControlError> {
            let mut state = self.state.lock().unwrap();
            state.opened.push(name.to_string());
            let instance = state.instance(name)?;
            if let Some(err) = &instance.open_error {
                return Err(err.clone());
            }
            Ok(Box::new(MockHandle {
                name: name.to_string(),
                state: Arc::clone(&self.state),
            }))
        }

        fn list_instances(&self, prefix: &str) -> Result<Vec<String>, ControlError> {
            let state = self.state.lock().unwrap();
            if let Some(err) = &state.list_error {
                return Err(err.clone());
            }
            Ok(state
                .instances
                .iter()
                .filter(|i| i.name.starts_with(prefix))
                .map(|i| i.name.clone())
                .collect())
        }
    }

    struct MockHandle {
        name: String,
        state: Arc<Mutex<State>>,
    }

    impl DeviceHandle for MockHandle {
        fn name(&self) -> &str {
            &self.name
        }

        fn read(&self, endpoint: Endpoint) -> Result<String, ControlError> {
            let mut state = self.state.lock().unwrap();
            let instance = state.instance(&self.name)?;
            if let Some(err) = instance.read_errors.get(&endpoint) {
                return Err(err.clone());
            }
            let raw = instance
                .values
                .get(&endpoint)
                .ok_or(ControlError::NotFound)?;
            decode_value(raw.as_bytes())
        }

        fn write(&self, endpoint: Endpoint, value: &str) -> Result<(), ControlError> {
            let mut state = self.state.lock().unwrap();
            state.instance(&self.name)?.write(endpoint, value)
        }

        fn probe(&self, endpoint: Endpoint, _access: Access) -> Result<(), ControlError> {
            let mut state = self.state.lock().unwrap();
            let instance = state.instance(&self.name)?;
            match instance.probe_errors.get(&endpoint) {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }
}
