pub mod model;
pub mod service;
pub mod store;

pub use model::{LogDetails, LogView, Profile, ProfileDetails, TravelLog};
pub use service::JournalService;
pub use store::{EntryStore, InMemoryEntryStore};
