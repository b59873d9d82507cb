// Module Loader Port
// "Ensure dependency": make the kernel driver behind the control tree available

use thiserror::Error;

/// Loader failures; logged by callers, never fatal on their own
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("Failed to run {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("{program} exited with status {code}")]
    Exited { program: String, code: i32 },

    #[error("{program} killed by signal {signal}")]
    Signaled { program: String, signal: String },

    #[error("Waiting for {program} failed: {reason}")]
    WaitFailed { program: String, reason: String },
}

/// Loads the scan driver on demand
///
/// Implementations block until the load attempt finished. Child output is
/// suppressed.
pub trait ModuleLoader: Send + Sync {
    fn ensure_loaded(&self) -> Result<(), LoaderError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    type LoadHook = Box<dyn Fn() + Send + Sync>;

    /// Mock loader counting invocations, optionally running a hook on load
    pub struct MockModuleLoader {
        result: Result<(), LoaderError>,
        on_load: Option<LoadHook>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockModuleLoader {
        pub fn new_success() -> Self {
            Self {
                result: Ok(()),
                on_load: None,
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn new_fail(err: LoaderError) -> Self {
            Self {
                result: Err(err),
                ..Self::new_success()
            }
        }

        /// Run `hook` on every load, e.g. to make the device appear
        pub fn with_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
            self.on_load = Some(Box::new(hook));
            self
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    impl ModuleLoader for MockModuleLoader {
        fn ensure_loaded(&self) -> Result<(), LoaderError> {
            *self.call_count.lock().unwrap() += 1;
            if let Some(hook) = &self.on_load {
                hook();
            }
            self.result.clone()
        }
    }
}
