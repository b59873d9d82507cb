// fieldscan Core - Domain Logic & Ports
// NO infrastructure dependencies: sysfs, subprocesses and topology live behind ports

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{Result, ScanError};
