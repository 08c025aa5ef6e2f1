//! shellmind core error types
//!
//! Re-exports shellmind-error and provides store/executor conveniences.

pub use shellmind_error::{Error, ErrorKind, ErrorStatus, Result};

use std::path::Path;

/// Create an IoFailed error for a path
pub fn io_error(path: &Path, err: std::io::Error) -> Error {
    Error::new(ErrorKind::IoFailed, err.to_string())
        .with_context("path", path.display().to_string())
        .set_source(err)
}

/// Create a SerializationFailed error
pub fn serialization_error(err: serde_json::Error) -> Error {
    Error::serialization_failed(err.to_string()).set_source(err)
}

/// Create a StorageFailed error for a path
pub fn storage_failed(path: &Path, reason: impl Into<String>) -> Error {
    Error::storage_failed(reason).with_context("path", path.display().to_string())
}

/// Create a ConfigInvalid error naming the offending setting
pub fn config_invalid(setting: &'static str, reason: impl Into<String>) -> Error {
    Error::config_invalid(reason).with_context("setting", setting)
}
