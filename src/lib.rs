//! jarpack - self-contained Windows launchers for Java applications
//!
//! A package is a native launcher executable with a JAR, launch settings and
//! an optional splash image appended behind a fixed-size footer. This crate
//! builds such packages, reads them back, and implements the launcher that
//! extracts the JAR and starts a Java runtime.

// Enforce strict code quality and reliability
#![deny(
    // Safety
    unsafe_code,

    // Correctness
    missing_debug_implementations,
    unreachable_pub,

    // Future compatibility
    future_incompatible,

    // Rust 2018 idioms
    rust_2018_idioms,
)]
#![warn(
    // Documentation
    missing_docs,

    // Error handling
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo,

    // Performance
    clippy::inefficient_to_string,
    clippy::large_enum_variant,

    // Code clarity and maintainability
    clippy::cognitive_complexity,
    clippy::too_many_arguments,
    clippy::type_complexity,

    // Best practices
    clippy::clone_on_ref_ptr,
    clippy::wildcard_imports,
    clippy::enum_glob_use,
    clippy::if_not_else,
    clippy::single_match_else,
    clippy::needless_continue,
    clippy::explicit_iter_loop,
    clippy::explicit_into_iter_loop,
)]
#![allow(
    clippy::too_many_arguments,
    missing_docs,
)]

pub mod api;
pub mod builder;
pub mod cli;
pub mod exceptions;
pub mod exit_codes;
pub mod format;
pub mod launcher;
pub mod logger;
pub mod pe;
pub mod utils;
pub mod version;

// Re-export main API functions
pub use api::{build_package, describe, launch_package};
pub use exceptions::{JarpackError, Result};
pub use format::{Fingerprint, FooterKind, JarDescriptor, LaunchMode, Verification};
