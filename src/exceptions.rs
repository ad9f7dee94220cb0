//! Error types for jarpack

use crate::exit_codes::{
    EXIT_BUILD_ERROR, EXIT_CONFIG_ERROR, EXIT_ERROR, EXIT_EXECUTION_ERROR, EXIT_EXTRACTION_ERROR,
    EXIT_FORMAT_ERROR, EXIT_IO_ERROR,
};
use std::fmt;

/// Main error type for jarpack operations
#[derive(Debug)]
pub enum JarpackError {
    /// File missing or unreadable
    NotFound(String),

    /// File is smaller than the footer it should carry
    TooSmall { size: u64, required: u64 },

    /// Footer absent or magic mismatch ("not our format")
    NotAComposite(String),

    /// Footer bytes could not be decoded
    InvalidFormat(String),

    /// Magic present but declared sizes disagree with the file size
    CorruptLayout(String),

    /// Short read from a source file
    TruncatedRead { expected: u64, actual: u64 },

    /// Destination could not be written
    WriteFailed(String),

    /// Expected inner container structure (ZIP EOCD) is missing
    InvalidContainer(String),

    /// No Java runtime or runtime library could be located
    RuntimeNotFound(String),

    /// The runtime library failed to load
    LibraryLoadFailed(String),

    /// The runtime library lacks its VM-creation entry point
    EntryPointMissing(String),

    /// JNI_CreateJavaVM returned a non-zero status
    VmCreationFailed(i32),

    /// Main class could not be resolved
    MainClassNotFound(String),

    /// `main(String[])` could not be resolved
    MainMethodNotFound(String),

    /// The Java main method threw
    InvocationThrew(String),

    /// The runtime process could not be created
    LaunchFailed(String),

    /// PE patching failed
    PeError(String),

    /// Invalid package configuration
    ConfigError(String),

    /// IO error
    IoError(std::io::Error),

    /// JSON parsing error
    JsonError(serde_json::Error),

    /// Generic error with message
    Generic(String),
}

impl JarpackError {
    /// Map an error onto the shared exit code table
    pub fn exit_code(&self) -> i32 {
        match self {
            JarpackError::TooSmall { .. }
            | JarpackError::NotAComposite(_)
            | JarpackError::InvalidFormat(_)
            | JarpackError::CorruptLayout(_) => EXIT_FORMAT_ERROR,
            JarpackError::TruncatedRead { .. } | JarpackError::InvalidContainer(_) => {
                EXIT_EXTRACTION_ERROR
            }
            JarpackError::RuntimeNotFound(_)
            | JarpackError::LibraryLoadFailed(_)
            | JarpackError::EntryPointMissing(_)
            | JarpackError::VmCreationFailed(_)
            | JarpackError::MainClassNotFound(_)
            | JarpackError::MainMethodNotFound(_)
            | JarpackError::InvocationThrew(_)
            | JarpackError::LaunchFailed(_) => EXIT_EXECUTION_ERROR,
            JarpackError::NotFound(_) | JarpackError::WriteFailed(_) | JarpackError::IoError(_) => {
                EXIT_IO_ERROR
            }
            JarpackError::PeError(_) => EXIT_BUILD_ERROR,
            JarpackError::ConfigError(_) | JarpackError::JsonError(_) => EXIT_CONFIG_ERROR,
            JarpackError::Generic(_) => EXIT_ERROR,
        }
    }
}

impl fmt::Display for JarpackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JarpackError::NotFound(msg) => write!(f, "File not found: {msg}"),
            JarpackError::TooSmall { size, required } => {
                write!(f, "File too small: {size} bytes, footer needs {required}")
            }
            JarpackError::NotAComposite(msg) => write!(f, "Not a composite file: {msg}"),
            JarpackError::InvalidFormat(msg) => write!(f, "Invalid format: {msg}"),
            JarpackError::CorruptLayout(msg) => write!(f, "Corrupt layout: {msg}"),
            JarpackError::TruncatedRead { expected, actual } => {
                write!(f, "Truncated read: expected {expected} bytes, got {actual}")
            }
            JarpackError::WriteFailed(msg) => write!(f, "Write failed: {msg}"),
            JarpackError::InvalidContainer(msg) => write!(f, "Invalid container: {msg}"),
            JarpackError::RuntimeNotFound(msg) => write!(f, "Java runtime not found: {msg}"),
            JarpackError::LibraryLoadFailed(msg) => write!(f, "Failed to load JVM library: {msg}"),
            JarpackError::EntryPointMissing(msg) => write!(f, "Entry point missing: {msg}"),
            JarpackError::VmCreationFailed(code) => {
                write!(f, "JVM creation failed with status {code}")
            }
            JarpackError::MainClassNotFound(msg) => write!(f, "Main class not found: {msg}"),
            JarpackError::MainMethodNotFound(msg) => write!(f, "Main method not found: {msg}"),
            JarpackError::InvocationThrew(msg) => write!(f, "Java main threw: {msg}"),
            JarpackError::LaunchFailed(msg) => write!(f, "Failed to start Java process: {msg}"),
            JarpackError::PeError(msg) => write!(f, "PE modification failed: {msg}"),
            JarpackError::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            JarpackError::IoError(err) => write!(f, "IO error: {err}"),
            JarpackError::JsonError(err) => write!(f, "JSON error: {err}"),
            JarpackError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for JarpackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JarpackError::IoError(err) => Some(err),
            JarpackError::JsonError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for JarpackError {
    fn from(err: std::io::Error) -> Self {
        JarpackError::IoError(err)
    }
}

impl From<serde_json::Error> for JarpackError {
    fn from(err: serde_json::Error) -> Self {
        JarpackError::JsonError(err)
    }
}

impl From<anyhow::Error> for JarpackError {
    fn from(err: anyhow::Error) -> Self {
        JarpackError::PeError(format!("{err:#}"))
    }
}

/// Result type for jarpack operations
pub type Result<T> = std::result::Result<T, JarpackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(
            JarpackError::NotAComposite("x".into()).exit_code(),
            EXIT_FORMAT_ERROR
        );
        assert_eq!(
            JarpackError::TruncatedRead {
                expected: 10,
                actual: 2
            }
            .exit_code(),
            EXIT_EXTRACTION_ERROR
        );
        assert_eq!(
            JarpackError::VmCreationFailed(-1).exit_code(),
            EXIT_EXECUTION_ERROR
        );
        assert_eq!(JarpackError::Generic("x".into()).exit_code(), EXIT_ERROR);
    }

    #[test]
    fn test_display_includes_context() {
        let err = JarpackError::TooSmall {
            size: 3,
            required: 20,
        };
        assert_eq!(err.to_string(), "File too small: 3 bytes, footer needs 20");
    }
}
