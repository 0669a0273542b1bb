//! Tracing and logging setup shared by the poller binary.

/// Tracing configuration (filters, layers, file output).
pub mod tracing;

pub use self::tracing::{LogConfig, LogFormat, LogGuard, ObservabilityError, init};
