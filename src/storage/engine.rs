use crate::core::{Result, SignedUrl};
use async_trait::async_trait;

/// Object storage collaborator - the only way the media core touches stored bytes.
///
/// Keys are bucket-relative (`private/{owner}/...`). Implementations decide
/// how URLs are signed and how long they stay valid.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Issue a time-limited URL for `key`.
    ///
    /// With `validate_existence` set, a missing object yields
    /// `JournalError::NotFound` instead of a URL that would 404 later.
    async fn signed_url(&self, key: &str, validate_existence: bool) -> Result<SignedUrl>;

    /// Store `bytes` under `key`, replacing any previous object.
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Remove the object under `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}
