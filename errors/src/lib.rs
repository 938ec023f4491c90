//! # Reminder Notes Errors
//!
//! Error taxonomy shared by the store, the scheduling engine, the broker
//! client and the publisher.
//!
//! - Uses `thiserror` for structured error definitions
//! - Named fields carry the context needed to diagnose a failure
//! - Each enum maps to one boundary: persistence, due-selection, encoding,
//!   broker I/O

use thiserror::Error;

/// Note Store errors.
///
/// `NotFound` and `Validation` are the caller-facing outcomes of a lookup or
/// an update; every other variant is a persistence failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Note not found: {id}")]
    NotFound { id: u64 },

    #[error("Invalid note operation: {reason}")]
    Validation { reason: String },

    #[error("Conflicting update of note {id}: {reason}")]
    Conflict { id: u64, reason: String },

    #[error("Connection to {backend} failed: {reason}")]
    Connection { backend: String, reason: String },

    #[error("Query on {backend} failed: {reason}")]
    Query { backend: String, reason: String },

    #[error("Context cancelled")]
    Cancelled
}

impl StoreError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into()
        }
    }

    pub fn query(backend: &str, reason: impl ToString) -> Self {
        Self::Query {
            backend: backend.to_string(),
            reason: reason.to_string()
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Due-selection errors.
///
/// Any of these aborts a whole publish cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Due notes unavailable from store: {0}")]
    Store(#[from] StoreError),

    #[error("Request to notes service failed: {reason}")]
    Transport { reason: String },

    #[error("Notes service answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Notes service response could not be decoded: {reason}")]
    Decode { reason: String },

    #[error("Context cancelled")]
    Cancelled
}

/// Note to message conversion errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Encoding {field} of note {id} failed: {reason}")]
    Encode {
        id: u64,
        field: String,
        reason: String
    },

    #[error("Decoding message failed: {reason}")]
    Decode { reason: String }
}

/// Broker client errors.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Broker bootstrap failed: {reason}")]
    Bootstrap { reason: String },

    #[error("Context cancelled")]
    Cancelled,

    #[error("Send to {stream} failed: {reason}")]
    Send { stream: String, reason: String },

    #[error("Receive failed: {reason}")]
    Receive { reason: String },

    #[error("Timeout: operation took longer than {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Broker client is closed")]
    Closed,

    #[error("Shutdown failed: {}", failures.join("; "))]
    Shutdown { failures: Vec<String> }
}

impl BrokerError {
    pub fn bootstrap(reason: impl ToString) -> Self {
        Self::Bootstrap {
            reason: reason.to_string()
        }
    }

    /// Errors a caller may clear by trying again with a fresh bootstrap.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Bootstrap { .. } | Self::Send { .. } | Self::Receive { .. } | Self::Timeout { .. }
        )
    }
}
