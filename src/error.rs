//! Unified error handling for the harness.
//!
//! Setup errors (topology queries, thread creation, placement) are fatal:
//! a benchmark running on the wrong core measures the wrong thing. Errors
//! inside the timed loop are transient and only logged; see
//! [`crate::worker`].

use thiserror::Error;

use crate::topology::CoreId;

/// Main error type for harness operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Scheduler topology query failures
    #[error("topology query failed: {0}")]
    Topology(String),

    /// Worker thread creation failures
    #[error("failed to spawn {role} thread for CPU {cpu}: {source}")]
    Spawn {
        role: &'static str,
        cpu: CoreId,
        source: std::io::Error,
    },

    /// A worker thread panicked before delivering its result
    #[error("worker thread '{0}' panicked")]
    Join(String),

    /// Report output errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON report serialization errors
    #[error("JSON report error: {0}")]
    Json(#[from] serde_json::Error),
}
