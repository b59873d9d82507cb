// Module loader backed by a helper process (modprobe)
// reason: nix waitpid so an interrupted wait is retried explicitly
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use tracing::debug;

use fieldscan_core::application::ScanConfig;
use fieldscan_core::port::{LoaderError, ModuleLoader};

/// Runs `<program> <args>` with all output suppressed and waits for it
pub struct ModprobeLoader {
    program: PathBuf,
    args: Vec<String>,
}

impl ModprobeLoader {
    /// Create a loader
    ///
    /// # Example
    /// ```ignore
    /// let loader = ModprobeLoader::new("/sbin/modprobe", ["-q", "intel_ifs"]);
    /// ```
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.loader_program.clone(), config.loader_args.clone())
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn spawn(&self) -> Result<Child, LoaderError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LoaderError::SpawnFailed {
                program: self.program_name(),
                reason: e.to_string(),
            })
    }

    /// Block until the child exits, retrying only when the wait is interrupted
    #[cfg(unix)]
    fn wait(&self, child: Child) -> Result<(), LoaderError> {
        use nix::errno::Errno;
        use nix::sys::wait::{waitpid, WaitStatus};
        use nix::unistd::Pid;

        let pid = Pid::from_raw(child.id() as i32);
        let status = loop {
            match waitpid(pid, None) {
                Err(Errno::EINTR) => continue,
                other => break other,
            }
        };

        match status {
            Ok(WaitStatus::Exited(_, 0)) => Ok(()),
            Ok(WaitStatus::Exited(_, code)) => Err(LoaderError::Exited {
                program: self.program_name(),
                code,
            }),
            Ok(WaitStatus::Signaled(_, signal, _)) => Err(LoaderError::Signaled {
                program: self.program_name(),
                signal: signal.as_str().to_string(),
            }),
            Ok(other) => Err(LoaderError::WaitFailed {
                program: self.program_name(),
                reason: format!("unexpected wait status {other:?}"),
            }),
            Err(e) => Err(LoaderError::WaitFailed {
                program: self.program_name(),
                reason: e.to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    fn wait(&self, mut child: Child) -> Result<(), LoaderError> {
        let status = child.wait().map_err(|e| LoaderError::WaitFailed {
            program: self.program_name(),
            reason: e.to_string(),
        })?;
        match status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(LoaderError::Exited {
                program: self.program_name(),
                code,
            }),
            None => Err(LoaderError::Signaled {
                program: self.program_name(),
                signal: "unknown".to_string(),
            }),
        }
    }
}

impl ModuleLoader for ModprobeLoader {
    fn ensure_loaded(&self) -> Result<(), LoaderError> {
        debug!(
            program = %self.program.display(),
            args = ?self.args,
            "Loading scan driver"
        );
        let child = self.spawn()?;
        self.wait(child)
    }
}
