//! Reference key codec.
//!
//! A permanent reference has the shape
//! `https://{bucket}.s3.amazonaws.com/{key}` and owner keys live under
//! `private/{owner}/`. Everything here is pure apart from the clock read in
//! [`KeyGenerator::generate`].

use crate::core::{JournalError, OwnerScope, PermanentReference, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Host/path boundary inside a permanent reference.
pub const HOST_MARKER: &str = ".com/";
pub const SCHEME: &str = "https://";
pub const HOST_SUFFIX: &str = ".s3.amazonaws.com/";
/// Root of every owner-scoped key.
pub const PRIVATE_ROOT: &str = "private";

/// Returns the bucket-relative key of a permanent reference.
pub fn extract_key(reference: &PermanentReference) -> Result<&str> {
    let raw = reference.as_str();
    let (_, key) = raw.split_once(HOST_MARKER).ok_or_else(|| {
        JournalError::MalformedReference(format!(
            "'{}' has no '{}' host boundary",
            raw, HOST_MARKER
        ))
    })?;
    if key.is_empty() {
        return Err(JournalError::MalformedReference(format!(
            "'{}' has an empty key",
            raw
        )));
    }
    Ok(key)
}

/// Key prefix owned by `owner`, trailing slash included.
pub fn owner_prefix(owner: &OwnerScope) -> String {
    format!("{}/{}/", PRIVATE_ROOT, owner)
}

/// Builds the permanent reference for `key` in `bucket`.
///
/// `key` must already sit under the owner's prefix; no collision handling is
/// done here.
pub fn build_reference(bucket: &str, owner: &OwnerScope, key: &str) -> Result<PermanentReference> {
    validate_bucket(bucket)?;
    let prefix = owner_prefix(owner);
    if !key.starts_with(&prefix) || key.len() == prefix.len() {
        return Err(JournalError::MalformedReference(format!(
            "key '{}' is outside owner scope '{}'",
            key, prefix
        )));
    }
    Ok(PermanentReference::new(format!(
        "{}{}{}{}",
        SCHEME, bucket, HOST_SUFFIX, key
    )))
}

pub fn validate_bucket(bucket: &str) -> Result<()> {
    if bucket.trim().is_empty() {
        return Err(JournalError::Configuration(
            "bucket identifier is empty".to_string(),
        ));
    }
    if bucket.contains('/') || bucket.contains(HOST_MARKER) {
        return Err(JournalError::MalformedReference(format!(
            "bucket '{}' is not a valid bucket identifier",
            bucket
        )));
    }
    Ok(())
}

/// `private/{owner}/{millis}-{filename}` for an explicit timestamp.
pub fn generate_key_at(owner: &OwnerScope, filename: &str, millis: u64) -> String {
    format!("{}{}-{}", owner_prefix(owner), millis, sanitize_filename(filename))
}

fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

type Clock = Box<dyn Fn() -> u64 + Send + Sync>;

/// Issues owner-scoped keys with strictly increasing millisecond stamps.
///
/// Two keys from the same generator never share a stamp, so identical
/// filenames uploaded in the same millisecond still get distinct keys.
pub struct KeyGenerator {
    last_millis: AtomicU64,
    clock: Clock,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self::with_clock(|| Utc::now().timestamp_millis().max(0) as u64)
    }

    pub fn with_clock(clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        Self {
            last_millis: AtomicU64::new(0),
            clock: Box::new(clock),
        }
    }

    pub fn generate(&self, owner: &OwnerScope, filename: &str) -> String {
        generate_key_at(owner, filename, self.next_millis())
    }

    fn next_millis(&self) -> u64 {
        let now = (self.clock)();
        let mut last = self.last_millis.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last_millis.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(observed) => last = observed,
            }
        }
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}
