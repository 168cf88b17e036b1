//! Logging setup for dbkey processes
//!
//! Identity tokens are only ever emitted at TRACE and secret values are never
//! emitted, so the default `info` level is safe to ship to a shared log file.

pub mod logging;

pub use logging::{LoggingGuard, build_filter, init_logging, open_log_file};
