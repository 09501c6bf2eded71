//! Outbound proxies: third-party image search, suggested-image import and
//! place search. Each wraps one upstream call and reshapes its JSON.

pub mod image_import;
pub mod image_search;
pub mod place_search;

pub use image_import::{FetchedImage, HttpImageFetcher, IMPORTED_IMAGE_NAME, ImageFetcher, ImageImporter};
pub use image_search::{GoogleImageSearch, ImageResult, ImageSearch};
pub use place_search::{
    LocationServicePlaceSearch, Place, PlaceQuery, PlaceSearch, RestPlaceSearch,
};

use crate::core::{JournalError, Result};
use std::time::Duration;

/// Shared outbound client; every proxy clones it.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| JournalError::Configuration(format!("HTTP client could not be built: {e}")))
}
