//! # kmon Utilities
//!
//! Shared logging setup for the kmon workspace.
//!
//! The monitor prints to stdout; this crate keeps `tracing` diagnostics on
//! stderr or in a file so they stay out of the console session.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    init_logging, init_logging_to_file, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard,
};
pub use tracing::{debug, error, info, trace, warn};
