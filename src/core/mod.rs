pub mod error;
pub mod types;

pub use error::{JournalError, ReconcileFailure, Result};
pub use types::{
    DEFAULT_CONTENT_TYPE, OwnerScope, PermanentReference, ResolutionPair, SignedUrl, StagedFile,
};
