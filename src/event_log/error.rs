//! Event Log Errors

use thiserror::Error;

/// Errors from the append-only event log
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("Event log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Malformed event at line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
