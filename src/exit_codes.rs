//! Standard exit codes for jarpack binaries
//!
//! The launcher itself only ever reports `EXIT_SUCCESS` or `EXIT_ERROR`;
//! the builder and attach tools use the full table.

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// Generic error
pub const EXIT_ERROR: i32 = 1;

/// Panic or unrecoverable error
pub const EXIT_PANIC: i32 = 101;

/// Composite format error (missing footer, bad magic, corrupt layout)
pub const EXIT_FORMAT_ERROR: i32 = 102;

/// Extraction error (short reads, missing ZIP directory)
pub const EXIT_EXTRACTION_ERROR: i32 = 103;

/// Execution error (no runtime, JVM failures, spawn failures)
pub const EXIT_EXECUTION_ERROR: i32 = 104;

/// Invalid command-line arguments
pub const EXIT_INVALID_ARGS: i32 = 105;

/// I/O error (file not found, permission denied, disk error)
pub const EXIT_IO_ERROR: i32 = 106;

/// Build/packaging error (builder-specific)
pub const EXIT_BUILD_ERROR: i32 = 108;

/// Configuration error (invalid package config, missing required fields)
pub const EXIT_CONFIG_ERROR: i32 = 109;
