//! The error taxonomy, as a single `thiserror` enum: struct-like variants
//! carrying the identifying detail for each failure (path, id, issue list).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single validation issue: the path into the value that failed, and a
/// human-readable message. Surfaced verbatim from the `Validator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub path: String,
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum ConvergeError {
    #[error("document not found: collection={collection} id={id}")]
    NotFound { collection: String, id: String },

    #[error("document already exists: collection={collection} id={id}")]
    AlreadyExists { collection: String, id: String },

    #[error("invalid path: {path} ({reason})")]
    InvalidPath { path: String, reason: String },

    #[error("validation failed for id={id}: {issues:?}")]
    InvalidData { id: String, issues: Vec<Issue> },

    #[error("stored content for id={id} could not be parsed: {details}")]
    InvalidContent { id: String, details: String },

    #[error("clock regression observed: local={local} remote={remote}")]
    ClockRegression { local: String, remote: String },

    #[error("storage failure during {operation}: {cause}")]
    StorageFailure { operation: String, cause: String },

    /// A bulk `create_many`/`update_many` call where at least one input
    /// failed its pre-check (already-exists, not-found, or validation); no
    /// document in the batch was written.
    #[error("batch rejected before any writes: {failures:?}")]
    BatchRejected { failures: Vec<(String, ConvergeError)> },

    /// A bulk call where every input passed its pre-check but a storage
    /// write later in the sequence failed; `committed` lists the ids that
    /// were already durably written before the failure.
    #[error("storage failure during batch {operation} after committing {committed:?}: {cause}")]
    BatchStorageFailure { operation: String, committed: Vec<String>, cause: String },

    #[error("validator returned an async result, which is not supported")]
    AsyncValidation,
}

pub type ConvergeResult<T> = Result<T, ConvergeError>;
