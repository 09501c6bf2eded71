// ============================================================================
// Travel log media core
// ============================================================================

pub mod config;
pub mod core;
pub mod journal;
pub mod media;
pub mod proxy;
pub mod server;
pub mod storage;
pub mod web;

// Re-export main types for convenience
pub use crate::config::AppConfig;
pub use crate::core::{
    JournalError, OwnerScope, PermanentReference, ReconcileFailure, ResolutionPair, Result,
    SignedUrl, StagedFile,
};
pub use crate::journal::{EntryStore, InMemoryEntryStore, JournalService};
pub use crate::media::{ImageSetReconciler, KeyGenerator, ReferenceResolver};
pub use crate::storage::{InMemoryStorage, ObjectStorage, S3Storage};
