use crate::core::{JournalError, OwnerScope, PermanentReference, ResolutionPair, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_FUN_LEVEL: u8 = 1;
pub const MAX_FUN_LEVEL: u8 = 5;
pub const DEFAULT_FUN_LEVEL: u8 = 3;

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelLog {
    pub id: String,
    pub owner: OwnerScope,
    pub location: String,
    pub what_you_did_there: String,
    pub overall_experience: String,
    /// Display order is insertion order.
    pub image_urls: Vec<PermanentReference>,
    pub place: Option<String>,
    pub region_speciality: Option<String>,
    pub fun_level: u8,
    pub weather: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TravelLog {
    pub fn create(
        owner: OwnerScope,
        details: LogDetails,
        image_urls: Vec<PermanentReference>,
    ) -> Self {
        let now = Utc::now();
        let mut log = Self {
            id: Uuid::new_v4().to_string(),
            owner,
            location: String::new(),
            what_you_did_there: String::new(),
            overall_experience: String::new(),
            image_urls,
            place: None,
            region_speciality: None,
            fun_level: DEFAULT_FUN_LEVEL,
            weather: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        log.apply(details);
        log
    }

    /// Overwrite the user-editable fields, keeping identity and images.
    pub fn apply(&mut self, details: LogDetails) {
        self.location = details.location.trim().to_string();
        self.what_you_did_there = details.what_you_did_there;
        self.overall_experience = details.overall_experience;
        self.place = non_blank(details.place);
        self.region_speciality = non_blank(details.region_speciality);
        self.fun_level = details.fun_level;
        self.weather = details.weather;
        self.updated_at = Utc::now();
    }
}

/// Form fields of a travel log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogDetails {
    pub location: String,
    pub what_you_did_there: String,
    pub overall_experience: String,
    pub place: Option<String>,
    pub region_speciality: Option<String>,
    pub fun_level: u8,
    pub weather: Vec<String>,
}

impl Default for LogDetails {
    fn default() -> Self {
        Self {
            location: String::new(),
            what_you_did_there: String::new(),
            overall_experience: String::new(),
            place: None,
            region_speciality: None,
            fun_level: DEFAULT_FUN_LEVEL,
            weather: Vec::new(),
        }
    }
}

impl LogDetails {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.location.trim().is_empty() {
            return Err(JournalError::Validation("location is required".to_string()));
        }
        if !(MIN_FUN_LEVEL..=MAX_FUN_LEVEL).contains(&self.fun_level) {
            return Err(JournalError::Validation(format!(
                "funLevel must be between {} and {}",
                MIN_FUN_LEVEL, MAX_FUN_LEVEL
            )));
        }
        Ok(())
    }
}

/// A travel log together with its freshly resolved gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogView {
    #[serde(flatten)]
    pub log: TravelLog,
    /// One pair per entry of `log.image_urls`, same order.
    pub gallery: Vec<ResolutionPair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub owner: OwnerScope,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub gender: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn create(owner: OwnerScope, details: ProfileDetails) -> Self {
        let now = Utc::now();
        let mut profile = Self {
            owner,
            username: String::new(),
            first_name: None,
            last_name: None,
            birthdate: None,
            gender: None,
            bio: None,
            created_at: now,
            updated_at: now,
        };
        profile.apply(details);
        profile
    }

    pub fn apply(&mut self, details: ProfileDetails) {
        self.username = details.username.trim().to_string();
        self.first_name = non_blank(details.first_name);
        self.last_name = non_blank(details.last_name);
        self.birthdate = details.birthdate;
        self.gender = non_blank(details.gender);
        self.bio = non_blank(details.bio);
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileDetails {
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub gender: Option<String>,
    pub bio: Option<String>,
}

impl ProfileDetails {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(JournalError::Validation("username is required".to_string()));
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
