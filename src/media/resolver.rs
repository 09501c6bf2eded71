use super::codec::{extract_key, owner_prefix};
use crate::core::{JournalError, OwnerScope, PermanentReference, ResolutionPair, Result, SignedUrl};
use crate::storage::ObjectStorage;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Turns permanent references into short-lived, renderable URLs.
///
/// Every call resolves afresh; nothing is cached between batches and
/// identical references inside one batch are resolved independently.
#[derive(Clone)]
pub struct ReferenceResolver {
    storage: Arc<dyn ObjectStorage>,
}

impl ReferenceResolver {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Resolve one reference, folding any failure into an unresolved pair.
    pub async fn resolve_one(&self, reference: &PermanentReference) -> ResolutionPair {
        self.settle(reference, self.try_resolve(reference, None).await)
    }

    fn settle(&self, reference: &PermanentReference, outcome: Result<SignedUrl>) -> ResolutionPair {
        match outcome {
            Ok(signed) => ResolutionPair::resolved(reference.clone(), signed),
            Err(err) => {
                event!(
                    Level::WARN,
                    reference = %reference,
                    error = %err,
                    "image reference could not be resolved"
                );
                ResolutionPair::unresolved(reference.clone())
            }
        }
    }

    /// Resolve a whole image set concurrently.
    ///
    /// The result has the input's length and order regardless of which
    /// resolution settles first; a failed item never affects its siblings.
    pub async fn resolve_all(&self, references: &[PermanentReference]) -> Vec<ResolutionPair> {
        let span = info_span!("media.resolve_all", count = references.len());
        async {
            let pairs = join_all(references.iter().map(|r| self.resolve_one(r))).await;
            let failed = pairs.iter().filter(|pair| !pair.is_resolved()).count();
            event!(Level::DEBUG, failed, "resolution batch settled");
            pairs
        }
        .instrument(span)
        .await
    }

    /// Like [`resolve_all`](Self::resolve_all), but references outside
    /// `owner`'s key prefix come back unresolved without touching storage.
    pub async fn resolve_all_for(
        &self,
        owner: &OwnerScope,
        references: &[PermanentReference],
    ) -> Vec<ResolutionPair> {
        let span = info_span!("media.resolve_all_for", owner = %owner, count = references.len());
        join_all(references.iter().map(|r| async move {
            self.settle(r, self.try_resolve(r, Some(owner)).await)
        }))
        .instrument(span)
        .await
    }

    /// Resolve several image sets (one per entry) at once.
    ///
    /// Batches are independent of each other; the outer order matches the
    /// input so callers can zip results back onto their entries.
    pub async fn resolve_batches(
        &self,
        batches: &[Vec<PermanentReference>],
    ) -> Vec<Vec<ResolutionPair>> {
        join_all(batches.iter().map(|batch| self.resolve_all(batch))).await
    }

    async fn try_resolve(
        &self,
        reference: &PermanentReference,
        owner: Option<&OwnerScope>,
    ) -> Result<SignedUrl> {
        let key = extract_key(reference)?;
        if let Some(owner) = owner {
            if !key.starts_with(&owner_prefix(owner)) {
                return Err(JournalError::MalformedReference(format!(
                    "'{}' is outside the caller's scope",
                    reference
                )));
            }
        }
        self.storage.signed_url(key, true).await
    }
}
