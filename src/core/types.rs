use super::{JournalError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content type recorded for uploads whose source did not supply one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Stable, persisted pointer to one stored object.
///
/// This is the value written to a travel log's image list. It is never
/// rendered directly and never expires; a [`SignedUrl`] is derived from it
/// on every view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermanentReference(String);

impl PermanentReference {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PermanentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PermanentReference {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PermanentReference {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Time-boxed, directly renderable URL issued by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

impl SignedUrl {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Result of resolving one permanent reference.
///
/// `ephemeral_reference` is `None` when that single resolution failed; the
/// renderer shows a placeholder for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionPair {
    pub permanent_reference: PermanentReference,
    pub ephemeral_reference: Option<SignedUrl>,
}

impl ResolutionPair {
    pub fn resolved(permanent_reference: PermanentReference, signed: SignedUrl) -> Self {
        Self {
            permanent_reference,
            ephemeral_reference: Some(signed),
        }
    }

    pub fn unresolved(permanent_reference: PermanentReference) -> Self {
        Self {
            permanent_reference,
            ephemeral_reference: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.ephemeral_reference.is_some()
    }

    pub fn url(&self) -> Option<&str> {
        self.ephemeral_reference.as_ref().map(|s| s.url.as_str())
    }
}

/// The authenticated user's namespace within storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerScope(String);

impl OwnerScope {
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(JournalError::InvalidOwner(
                "owner scope cannot be empty".to_string(),
            ));
        }
        if trimmed.contains('/') {
            return Err(JournalError::InvalidOwner(format!(
                "owner scope '{}' must not contain '/'",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OwnerScope {
    type Error = JournalError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<OwnerScope> for String {
    fn from(value: OwnerScope) -> Self {
        value.0
    }
}

/// A newly selected local file, not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl StagedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn content_type_or_default(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}
