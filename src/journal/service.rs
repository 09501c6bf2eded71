use super::model::{LogDetails, LogView, Profile, ProfileDetails, TravelLog};
use super::store::EntryStore;
use crate::core::{JournalError, OwnerScope, PermanentReference, Result, StagedFile};
use crate::media::{ImageSetReconciler, ReferenceResolver};
use std::sync::Arc;
use tracing::{Level, event, instrument};

/// The journal flows that surround the media core.
///
/// Entity persistence is delegated to an [`EntryStore`]; the service only
/// ever hands it plain permanent-reference lists.
pub struct JournalService {
    store: Arc<dyn EntryStore>,
    resolver: ReferenceResolver,
    reconciler: ImageSetReconciler,
    bucket: Option<String>,
}

impl JournalService {
    pub fn new(
        store: Arc<dyn EntryStore>,
        resolver: ReferenceResolver,
        reconciler: ImageSetReconciler,
        bucket: Option<String>,
    ) -> Self {
        Self {
            store,
            resolver,
            reconciler,
            bucket,
        }
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    pub fn reconciler(&self) -> &ImageSetReconciler {
        &self.reconciler
    }

    /// Upload `staged` and persist a new entry listing `imported` (images
    /// already copied in through the importer) followed by the uploads.
    #[instrument(name = "journal.create_log", skip_all, fields(owner = %owner, images = staged.len()))]
    pub async fn create_log(
        &self,
        owner: &OwnerScope,
        details: LogDetails,
        imported: Vec<PermanentReference>,
        staged: Vec<StagedFile>,
    ) -> Result<TravelLog> {
        details.validate()?;
        let image_urls = self
            .apply_images(owner, &[], &[], imported, staged)
            .await?;
        let log = self
            .store
            .insert_log(TravelLog::create(owner.clone(), details, image_urls))
            .await?;
        event!(Level::INFO, id = %log.id, "travel log created");
        Ok(log)
    }

    /// Apply an edit: `kept` is the subset of the stored images the user left
    /// in place, `imported` the importer copies attached during the edit and
    /// `staged` the files added. The new list is kept, imported, uploaded.
    #[instrument(name = "journal.update_log", skip_all, fields(owner = %owner, id = %id))]
    pub async fn update_log(
        &self,
        owner: &OwnerScope,
        id: &str,
        details: LogDetails,
        kept: Vec<PermanentReference>,
        imported: Vec<PermanentReference>,
        staged: Vec<StagedFile>,
    ) -> Result<TravelLog> {
        details.validate()?;
        let mut log = self.require_log(owner, id).await?;
        log.image_urls = self
            .apply_images(owner, &log.image_urls, &kept, imported, staged)
            .await?;
        log.apply(details);
        let log = self.store.update_log(log).await?;
        event!(Level::INFO, images = log.image_urls.len(), "travel log updated");
        Ok(log)
    }

    /// Single entry with its gallery. Also backs the edit form load.
    pub async fn view_log(&self, owner: &OwnerScope, id: &str) -> Result<LogView> {
        let log = self.require_log(owner, id).await?;
        let gallery = self.resolver.resolve_all(&log.image_urls).await;
        Ok(LogView { log, gallery })
    }

    /// Every entry of `owner`, newest first, each with its own gallery.
    #[instrument(name = "journal.dashboard", skip_all, fields(owner = %owner))]
    pub async fn dashboard(&self, owner: &OwnerScope) -> Result<Vec<LogView>> {
        let mut logs = self.store.list_logs(owner).await?;
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let batches: Vec<Vec<PermanentReference>> =
            logs.iter().map(|log| log.image_urls.clone()).collect();
        let galleries = self.resolver.resolve_batches(&batches).await;

        Ok(logs
            .into_iter()
            .zip(galleries)
            .map(|(log, gallery)| LogView { log, gallery })
            .collect())
    }

    /// Remove the entry. Its stored images are left to storage lifecycle rules.
    pub async fn delete_log(&self, owner: &OwnerScope, id: &str) -> Result<TravelLog> {
        let removed = self
            .store
            .delete_log(owner, id)
            .await?
            .ok_or_else(|| JournalError::EntryNotFound(id.to_string()))?;
        event!(Level::INFO, owner = %owner, id = %id, "travel log deleted");
        Ok(removed)
    }

    /// The owner's profile, if one exists.
    pub async fn profile(&self, owner: &OwnerScope) -> Result<Option<Profile>> {
        let mut profiles = self.store.find_profiles(owner).await?;
        match profiles.len() {
            0 => Ok(None),
            1 => Ok(profiles.pop()),
            count => {
                event!(Level::ERROR, owner = %owner, count, "owner has several profiles");
                Err(JournalError::DuplicateProfile(owner.to_string()))
            }
        }
    }

    pub async fn create_profile(
        &self,
        owner: &OwnerScope,
        details: ProfileDetails,
    ) -> Result<Profile> {
        details.validate()?;
        if self.profile(owner).await?.is_some() {
            return Err(JournalError::Conflict(format!(
                "profile for '{}' already exists",
                owner
            )));
        }
        self.store
            .insert_profile(Profile::create(owner.clone(), details))
            .await
    }

    pub async fn update_profile(
        &self,
        owner: &OwnerScope,
        details: ProfileDetails,
    ) -> Result<Profile> {
        details.validate()?;
        let mut profile = self
            .profile(owner)
            .await?
            .ok_or_else(|| JournalError::EntryNotFound(format!("profile of {}", owner)))?;
        profile.apply(details);
        self.store.update_profile(profile).await
    }

    async fn require_log(&self, owner: &OwnerScope, id: &str) -> Result<TravelLog> {
        self.store
            .get_log(owner, id)
            .await?
            .ok_or_else(|| JournalError::EntryNotFound(id.to_string()))
    }

    async fn apply_images(
        &self,
        owner: &OwnerScope,
        original: &[PermanentReference],
        kept: &[PermanentReference],
        imported: Vec<PermanentReference>,
        staged: Vec<StagedFile>,
    ) -> Result<Vec<PermanentReference>> {
        let bucket = match (&self.bucket, imported.is_empty() && staged.is_empty()) {
            (Some(bucket), _) => bucket.as_str(),
            (None, true) => "",
            (None, false) => {
                return Err(JournalError::Configuration(
                    "no storage bucket configured for uploads".to_string(),
                ));
            }
        };

        if let Some(listed) = imported.iter().find(|r| original.contains(r)) {
            return Err(JournalError::Validation(format!(
                "'{}' already belongs to this entry; list it among the kept images",
                listed
            )));
        }
        if !imported.is_empty() {
            self.reconciler
                .verify_imported(owner, bucket, &imported)
                .await?;
        }

        match self
            .reconciler
            .reconcile(original, kept, staged, owner, bucket)
            .await
        {
            Ok(mut images) => {
                let uploaded = images.split_off(kept.len());
                images.extend(imported);
                images.extend(uploaded);
                Ok(images)
            }
            Err(JournalError::Reconcile(mut failure)) => {
                failure.uploaded = self.reconciler.discard(&failure.uploaded).await;
                Err(JournalError::Reconcile(failure))
            }
            Err(err) => Err(err),
        }
    }
}
