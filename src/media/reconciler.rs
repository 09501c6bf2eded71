use super::codec::{KeyGenerator, build_reference, extract_key};
use crate::core::{
    JournalError, OwnerScope, PermanentReference, ReconcileFailure, Result, StagedFile,
};
use crate::storage::ObjectStorage;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Storage-free diff between an entry's stored image set and the user's edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// The edited list, order preserved.
    pub kept: Vec<PermanentReference>,
    /// Distinct originals missing from the edit, in original order.
    pub to_delete: Vec<PermanentReference>,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.to_delete.is_empty()
    }
}

/// Computes `original - edited`.
///
/// Every edited reference must come from `original`; anything else is a
/// caller bug and is rejected before any storage call is made.
pub fn plan(original: &[PermanentReference], edited: &[PermanentReference]) -> Result<ReconcilePlan> {
    let original_set: HashSet<&PermanentReference> = original.iter().collect();
    if let Some(unknown) = edited.iter().find(|r| !original_set.contains(r)) {
        return Err(JournalError::UnknownReference(unknown.to_string()));
    }

    let edited_set: HashSet<&PermanentReference> = edited.iter().collect();
    let mut seen = HashSet::new();
    let to_delete = original
        .iter()
        .filter(|r| !edited_set.contains(r) && seen.insert(*r))
        .cloned()
        .collect();

    Ok(ReconcilePlan {
        kept: edited.to_vec(),
        to_delete,
    })
}

struct PreparedUpload {
    key: String,
    reference: PermanentReference,
    file: StagedFile,
}

/// Applies an image-set edit to storage and returns the list to persist.
#[derive(Clone)]
pub struct ImageSetReconciler {
    storage: Arc<dyn ObjectStorage>,
    keys: Arc<KeyGenerator>,
}

impl ImageSetReconciler {
    pub fn new(storage: Arc<dyn ObjectStorage>, keys: Arc<KeyGenerator>) -> Self {
        Self { storage, keys }
    }

    pub fn key_generator(&self) -> &Arc<KeyGenerator> {
        &self.keys
    }

    /// Delete what the edit removed, upload what it staged.
    ///
    /// Returns `edited` followed by the new references in staging order.
    /// Deletes and uploads run concurrently and all of them settle before the
    /// outcome is decided; if any failed the whole attempt fails with a
    /// [`ReconcileFailure`] listing what did take effect.
    pub async fn reconcile(
        &self,
        original: &[PermanentReference],
        edited: &[PermanentReference],
        staged: Vec<StagedFile>,
        owner: &OwnerScope,
        bucket: &str,
    ) -> Result<Vec<PermanentReference>> {
        let plan = plan(original, edited)?;
        let delete_keys = plan
            .to_delete
            .iter()
            .map(|r| extract_key(r).map(str::to_string))
            .collect::<Result<Vec<_>>>()?;
        let uploads = staged
            .into_iter()
            .map(|file| self.prepare(owner, bucket, file))
            .collect::<Result<Vec<_>>>()?;

        if delete_keys.is_empty() && uploads.is_empty() {
            return Ok(plan.kept);
        }

        let span = info_span!(
            "media.reconcile",
            owner = %owner,
            deletes = delete_keys.len(),
            uploads = uploads.len()
        );
        async move {
            let deletions = join_all(delete_keys.into_iter().map(|key| async move {
                self.storage.delete(&key).await.map(|_| key)
            }));
            let transfers = join_all(uploads.into_iter().map(|upload| self.upload(upload)));
            let (delete_results, upload_results) = futures::join!(deletions, transfers);

            let mut deleted = Vec::new();
            let mut uploaded = Vec::new();
            let mut first_error = None;
            for result in delete_results {
                match result {
                    Ok(key) => deleted.push(key),
                    Err(err) => {
                        first_error.get_or_insert(err);
                    }
                }
            }
            for result in upload_results {
                match result {
                    Ok(reference) => uploaded.push(reference),
                    Err(err) => {
                        first_error.get_or_insert(err);
                    }
                }
            }

            if let Some(cause) = first_error {
                event!(
                    Level::ERROR,
                    error = %cause,
                    deleted = deleted.len(),
                    uploaded = uploaded.len(),
                    "image set reconciliation failed"
                );
                return Err(ReconcileFailure {
                    deleted,
                    uploaded,
                    cause,
                }
                .into());
            }

            event!(Level::DEBUG, "image set reconciled");
            let mut result = plan.kept;
            result.extend(uploaded);
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Check that every imported reference names an existing object under
    /// `owner`'s prefix in `bucket`. Lookups run concurrently.
    pub async fn verify_imported(
        &self,
        owner: &OwnerScope,
        bucket: &str,
        imported: &[PermanentReference],
    ) -> Result<()> {
        let mut keys = Vec::with_capacity(imported.len());
        for reference in imported {
            let key = extract_key(reference)?;
            match build_reference(bucket, owner, key) {
                Ok(expected) if expected == *reference => keys.push((reference, key)),
                Ok(_) | Err(JournalError::MalformedReference(_)) => {
                    return Err(JournalError::ForeignReference(reference.to_string()));
                }
                Err(err) => return Err(err),
            }
        }

        let lookups = join_all(keys.into_iter().map(|(reference, key)| async move {
            match self.storage.signed_url(key, true).await {
                Ok(_) => Ok(()),
                Err(JournalError::NotFound(_)) => {
                    Err(JournalError::ForeignReference(reference.to_string()))
                }
                Err(err) => Err(err),
            }
        }))
        .await;
        lookups.into_iter().collect()
    }

    /// Best-effort removal of stored objects that ended up listed nowhere.
    ///
    /// Returns the references whose objects could not be removed.
    pub async fn discard(&self, references: &[PermanentReference]) -> Vec<PermanentReference> {
        let outcomes = join_all(references.iter().map(|reference| async move {
            let removed = match extract_key(reference) {
                Ok(key) => self.storage.delete(key).await,
                Err(err) => Err(err),
            };
            (reference, removed)
        }))
        .await;

        outcomes
            .into_iter()
            .filter_map(|(reference, removed)| match removed {
                Ok(()) => None,
                Err(err) => {
                    event!(Level::WARN, reference = %reference, error = %err, "orphaned upload left in storage");
                    Some(reference.clone())
                }
            })
            .collect()
    }

    /// Upload a single file under a fresh owner-scoped key.
    pub async fn store(
        &self,
        owner: &OwnerScope,
        bucket: &str,
        file: StagedFile,
    ) -> Result<PermanentReference> {
        let prepared = self.prepare(owner, bucket, file)?;
        self.upload(prepared).await
    }

    fn prepare(&self, owner: &OwnerScope, bucket: &str, file: StagedFile) -> Result<PreparedUpload> {
        let key = self.keys.generate(owner, &file.filename);
        let reference = build_reference(bucket, owner, &key)?;
        Ok(PreparedUpload {
            key,
            reference,
            file,
        })
    }

    async fn upload(&self, upload: PreparedUpload) -> Result<PermanentReference> {
        let content_type = upload.file.content_type_or_default().to_string();
        self.storage
            .upload(&upload.key, upload.file.bytes, &content_type)
            .await?;
        Ok(upload.reference)
    }
}
