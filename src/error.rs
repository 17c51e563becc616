//! Error taxonomy for the engine and the durable store.
//!
//! Library code returns typed errors; the CLI wraps them in `anyhow` at the
//! outer edge. Every failure maps to one of four user-facing categories:
//! not-found, validation, authorization, storage.

use thiserror::Error;

/// Errors from the durable key-value store.
///
/// Reads never produce an error — an absent or malformed blob falls back to
/// the caller's default. Writes fail loudly so the engine can roll back.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize value for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write key '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The referenced task or user id is not in its collection.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Input rejected before any mutation (blank title, invalid transition,
    /// missing deadline, …).
    #[error("{0}")]
    Validation(String),

    /// The actor lacks the role or ownership the operation requires.
    #[error("not allowed: {0}")]
    Unauthorized(String),

    /// The durable write failed; the in-memory change was rolled back.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl EngineError {
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "task",
            id: id.into(),
        }
    }

    pub fn user_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "user",
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
