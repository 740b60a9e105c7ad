//! Twinflow Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by all other Twinflow crates:
//! - Application configuration (database, backend, sequencer, CLI settings)
//! - Application and backend error taxonomies
//! - Structured logging with tracing
//! - Platform detection utilities
//! - Common constants

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;

// Re-export commonly used items at the crate root
pub use config::AppConfig;
pub use error::{BackendError, BackendResult, ErrorKind, TwError, TwResult};
pub use logging::init_logging;
pub use platform::Platform;
