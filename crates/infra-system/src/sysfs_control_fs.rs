// sysfs implementation of the control tree
// Every endpoint access opens the file, does a single read or write, and closes it
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

use fieldscan_core::port::control_fs::{decode_value, MAX_CONTROL_VALUE_LEN};
use fieldscan_core::port::{Access, ControlError, ControlFs, DeviceHandle, Endpoint};

/// Control tree rooted at a directory such as `/sys/devices/virtual/misc`
pub struct SysfsControlFs {
    root: PathBuf,
}

impl SysfsControlFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Keep directory entries named `prefix*`; an unreadable entry is skipped
fn matching_instances<I>(entries: I, prefix: &str) -> Vec<String>
where
    I: IntoIterator<Item = io::Result<(OsString, bool)>>,
{
    let mut names = Vec::new();
    for entry in entries {
        let (name, is_dir) = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        if !is_dir {
            continue;
        }
        match name.into_string() {
            Ok(name) if name.starts_with(prefix) => names.push(name),
            Ok(_) => {}
            Err(raw) => debug!(entry = ?raw, "Ignoring non UTF-8 directory name"),
        }
    }
    names
}

impl ControlFs for SysfsControlFs {
    fn open_instance(&self, name: &str) -> Result<Box<dyn DeviceHandle>, ControlError> {
        let path = self.root.join(name);
        let metadata = fs::metadata(&path)?;
        if !metadata.is_dir() {
            return Err(ControlError::Io(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        Ok(Box::new(SysfsDevice {
            name: name.to_string(),
            path,
        }))
    }

    fn list_instances(&self, prefix: &str) -> Result<Vec<String>, ControlError> {
        let entries = fs::read_dir(&self.root)?.map(|entry| -> io::Result<(OsString, bool)> {
            let entry = entry?;
            Ok((entry.file_name(), entry.file_type()?.is_dir()))
        });
        Ok(matching_instances(entries, prefix))
    }
}

/// One instance directory
struct SysfsDevice {
    name: String,
    path: PathBuf,
}

impl SysfsDevice {
    fn endpoint_path(&self, endpoint: Endpoint) -> PathBuf {
        self.path.join(endpoint.file_name())
    }
}

impl DeviceHandle for SysfsDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, endpoint: Endpoint) -> Result<String, ControlError> {
        let file = File::open(self.endpoint_path(endpoint))?;
        let mut raw = Vec::with_capacity(64);
        file.take(MAX_CONTROL_VALUE_LEN as u64 + 1)
            .read_to_end(&mut raw)?;
        decode_value(&raw)
    }

    fn write(&self, endpoint: Endpoint, value: &str) -> Result<(), ControlError> {
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.endpoint_path(endpoint))?;
        // sysfs stores take the whole value in one write(2)
        let written = file.write(value.as_bytes())?;
        if written != value.len() {
            return Err(ControlError::Io(format!(
                "short write to {}/{}: {} of {} bytes",
                self.name,
                endpoint,
                written,
                value.len()
            )));
        }
        Ok(())
    }

    fn probe(&self, endpoint: Endpoint, access: Access) -> Result<(), ControlError> {
        let mut options = OpenOptions::new();
        match access {
            Access::Read => options.read(true),
            Access::Write => options.write(true),
            Access::ReadWrite => options.read(true).write(true),
        };
        options.open(self.endpoint_path(endpoint))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["intel_ifs_0", "intel_ifs_1", "other_dev"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        // A file that matches the prefix is not an instance
        fs::write(dir.path().join("intel_ifs_file"), "").unwrap();
        fs::write(dir.path().join("intel_ifs_0/status"), "pass\n").unwrap();
        fs::write(dir.path().join("intel_ifs_0/current_batch"), "none\n").unwrap();
        dir
    }

    #[test]
    fn test_list_instances_filters_prefix_and_dirs() {
        let dir = tree();
        let fs = SysfsControlFs::new(dir.path());

        let mut names = fs.list_instances("intel_ifs_").unwrap();
        names.sort();
        assert_eq!(names, vec!["intel_ifs_0", "intel_ifs_1"]);
    }

    #[test]
    fn test_unreadable_entry_does_not_hide_the_others() {
        let entries = vec![
            Ok((OsString::from("intel_ifs_0"), true)),
            Err(io::Error::from_raw_os_error(5)),
            Ok((OsString::from("intel_ifs_1"), true)),
            Ok((OsString::from("intel_ifs_2"), false)),
        ];
        assert_eq!(
            matching_instances(entries, "intel_ifs_"),
            vec!["intel_ifs_0", "intel_ifs_1"]
        );
    }

    #[test]
    fn test_list_missing_root() {
        let fs = SysfsControlFs::new("/nonexistent/fieldscan/root");
        assert_eq!(fs.list_instances("intel_ifs_"), Err(ControlError::NotFound));
    }

    #[test]
    fn test_open_missing_instance() {
        let dir = tree();
        let fs = SysfsControlFs::new(dir.path());
        assert!(matches!(
            fs.open_instance("intel_ifs_9"),
            Err(ControlError::NotFound)
        ));
        assert!(matches!(
            fs.open_instance("intel_ifs_file"),
            Err(ControlError::Io(_))
        ));
    }

    #[test]
    fn test_read_write_roundtrip() {
        let dir = tree();
        let fs = SysfsControlFs::new(dir.path());
        let device = fs.open_instance("intel_ifs_0").unwrap();

        assert_eq!(device.read(Endpoint::Status).unwrap(), "pass");
        device.write(Endpoint::CurrentBatch, "0x2").unwrap();
        assert_eq!(device.read(Endpoint::CurrentBatch).unwrap(), "0x2");
    }

    #[test]
    fn test_read_missing_endpoint() {
        let dir = tree();
        let fs = SysfsControlFs::new(dir.path());
        let device = fs.open_instance("intel_ifs_0").unwrap();
        assert_eq!(device.read(Endpoint::Details), Err(ControlError::NotFound));
        // Writing never creates endpoints
        assert_eq!(
            device.write(Endpoint::RunTest, "0\n"),
            Err(ControlError::NotFound)
        );
    }

    #[test]
    fn test_oversized_value_rejected() {
        let dir = tree();
        fs::write(
            dir.path().join("intel_ifs_0/image_version"),
            "x".repeat(MAX_CONTROL_VALUE_LEN + 10),
        )
        .unwrap();
        let fs = SysfsControlFs::new(dir.path());
        let device = fs.open_instance("intel_ifs_0").unwrap();
        assert!(matches!(
            device.read(Endpoint::ImageVersion),
            Err(ControlError::Oversized { .. })
        ));
    }

    #[test]
    fn test_probe() {
        let dir = tree();
        let fs = SysfsControlFs::new(dir.path());
        let device = fs.open_instance("intel_ifs_0").unwrap();
        assert!(device.probe(Endpoint::CurrentBatch, Access::ReadWrite).is_ok());
        assert_eq!(
            device.probe(Endpoint::RunTest, Access::Write),
            Err(ControlError::NotFound)
        );
    }
}
