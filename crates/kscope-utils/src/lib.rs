//! # kscope Utilities
//!
//! Shared utilities for kscope, mainly logging infrastructure built on
//! `tracing`.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, init_test_logging, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
