use super::model::{Profile, TravelLog};
use crate::core::{JournalError, OwnerScope, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Durable entity store collaborator.
///
/// Every read is filtered by owner; a log owned by someone else behaves as
/// if it did not exist.
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn insert_log(&self, log: TravelLog) -> Result<TravelLog>;

    async fn get_log(&self, owner: &OwnerScope, id: &str) -> Result<Option<TravelLog>>;

    /// Replace a stored log. Fails with `EntryNotFound` if it is gone.
    async fn update_log(&self, log: TravelLog) -> Result<TravelLog>;

    async fn delete_log(&self, owner: &OwnerScope, id: &str) -> Result<Option<TravelLog>>;

    async fn list_logs(&self, owner: &OwnerScope) -> Result<Vec<TravelLog>>;

    /// Fails with `Conflict` when the owner already has a profile.
    async fn insert_profile(&self, profile: Profile) -> Result<Profile>;

    async fn update_profile(&self, profile: Profile) -> Result<Profile>;

    /// All profiles recorded for `owner`. More than one is a data fault the
    /// caller has to surface.
    async fn find_profiles(&self, owner: &OwnerScope) -> Result<Vec<Profile>>;
}

#[derive(Default)]
pub struct InMemoryEntryStore {
    logs: RwLock<HashMap<String, TravelLog>>,
    profiles: RwLock<Vec<Profile>>,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a profile without the uniqueness check.
    pub async fn import_profile(&self, profile: Profile) {
        self.profiles.write().await.push(profile);
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn insert_log(&self, log: TravelLog) -> Result<TravelLog> {
        let mut logs = self.logs.write().await;
        if logs.contains_key(&log.id) {
            return Err(JournalError::Conflict(format!(
                "travel log '{}' already exists",
                log.id
            )));
        }
        logs.insert(log.id.clone(), log.clone());
        Ok(log)
    }

    async fn get_log(&self, owner: &OwnerScope, id: &str) -> Result<Option<TravelLog>> {
        let logs = self.logs.read().await;
        Ok(logs.get(id).filter(|log| &log.owner == owner).cloned())
    }

    async fn update_log(&self, log: TravelLog) -> Result<TravelLog> {
        let mut logs = self.logs.write().await;
        match logs.get_mut(&log.id) {
            Some(existing) if existing.owner == log.owner => {
                *existing = log.clone();
                Ok(log)
            }
            _ => Err(JournalError::EntryNotFound(log.id)),
        }
    }

    async fn delete_log(&self, owner: &OwnerScope, id: &str) -> Result<Option<TravelLog>> {
        let mut logs = self.logs.write().await;
        if logs.get(id).is_some_and(|log| &log.owner == owner) {
            return Ok(logs.remove(id));
        }
        Ok(None)
    }

    async fn list_logs(&self, owner: &OwnerScope) -> Result<Vec<TravelLog>> {
        let logs = self.logs.read().await;
        Ok(logs
            .values()
            .filter(|log| &log.owner == owner)
            .cloned()
            .collect())
    }

    async fn insert_profile(&self, profile: Profile) -> Result<Profile> {
        let mut profiles = self.profiles.write().await;
        if profiles.iter().any(|p| p.owner == profile.owner) {
            return Err(JournalError::Conflict(format!(
                "profile for '{}' already exists",
                profile.owner
            )));
        }
        profiles.push(profile.clone());
        Ok(profile)
    }

    async fn update_profile(&self, profile: Profile) -> Result<Profile> {
        let mut profiles = self.profiles.write().await;
        let existing = profiles
            .iter_mut()
            .find(|p| p.owner == profile.owner)
            .ok_or_else(|| JournalError::EntryNotFound(format!("profile of {}", profile.owner)))?;
        *existing = profile.clone();
        Ok(profile)
    }

    async fn find_profiles(&self, owner: &OwnerScope) -> Result<Vec<Profile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().filter(|p| &p.owner == owner).cloned().collect())
    }
}
