//! Tracing, logging, and cross-boundary trace propagation (shared setup).

/// Tracing/logging initialization.
pub mod tracing;

/// W3C trace-context carriers for envelopes.
pub mod propagation;

pub use propagation::{continue_trace, inject_context};
pub use tracing::{init, shutdown};
