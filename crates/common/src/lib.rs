//! farmjob Common Utilities
//!
//! Shared infrastructure for all farmjob crates:
//! - Error types and result aliases
//! - Timestamp formatting for job creation times
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
