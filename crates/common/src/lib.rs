//! Lenscap Common Utilities
//!
//! Shared infrastructure for all Lenscap crates:
//! - Error types and result aliases
//! - Clock utilities for recording progress
//! - Tracing/logging initialization
//! - Configuration loading and validation

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
