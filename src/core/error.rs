use thiserror::Error;

use super::types::PermanentReference;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JournalError {
    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    #[error("Object '{0}' not found")]
    NotFound(String),

    #[error("Upload of '{key}' failed: {message}")]
    Upload { key: String, message: String },

    #[error("Delete of '{key}' failed: {message}")]
    Delete { key: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Reference '{0}' is not part of the original image set")]
    UnknownReference(String),

    #[error("Reference '{0}' is not a stored image of this owner")]
    ForeignReference(String),

    #[error("Invalid owner scope: {0}")]
    InvalidOwner(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Travel log '{0}' not found")]
    EntryNotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Owner '{0}' has more than one profile")]
    DuplicateProfile(String),

    #[error("{0}")]
    Reconcile(Box<ReconcileFailure>),
}

impl JournalError {
    pub fn upload(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upload {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn delete(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delete {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a reconciliation attempt that did not fully succeed.
///
/// Every storage call of the attempt has settled by the time this is built,
/// so `deleted` and `uploaded` are exactly the mutations that took effect.
/// A retry with the same original set only redoes the remainder: deleting a
/// key that is already gone succeeds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Reconciliation failed after {} delete(s) and {} upload(s): {cause}",
    .deleted.len(),
    .uploaded.len()
)]
pub struct ReconcileFailure {
    /// Storage keys removed before the failure was reported.
    pub deleted: Vec<String>,
    /// References whose objects were stored but are not yet listed anywhere.
    pub uploaded: Vec<PermanentReference>,
    /// First failure observed, in delete-then-upload order.
    pub cause: JournalError,
}

impl From<ReconcileFailure> for JournalError {
    fn from(failure: ReconcileFailure) -> Self {
        Self::Reconcile(Box::new(failure))
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;
