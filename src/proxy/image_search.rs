use crate::core::{JournalError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

pub const IMAGE_RESULT_COUNT: u8 = 10;

/// A candidate photo for a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub url: String,
    pub thumbnail_url: String,
    /// Page the image was found on.
    pub source: String,
}

#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn search(&self, location: &str) -> Result<Vec<ImageResult>>;
}

/// Google Custom Search in image mode.
pub struct GoogleImageSearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    search_engine_id: Option<String>,
}

impl GoogleImageSearch {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        search_engine_id: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            search_engine_id,
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    link: String,
    #[serde(default)]
    image: SearchItemImage,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct SearchItemImage {
    thumbnail_link: String,
    context_link: String,
}

#[async_trait]
impl ImageSearch for GoogleImageSearch {
    async fn search(&self, location: &str) -> Result<Vec<ImageResult>> {
        let (Some(api_key), Some(engine_id)) = (&self.api_key, &self.search_engine_id) else {
            return Err(JournalError::Configuration(
                "API keys are not configured on the server.".to_string(),
            ));
        };

        let query = format!("{} travel landmark", location.trim());
        let num = IMAGE_RESULT_COUNT.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", api_key.as_str()),
                ("cx", engine_id.as_str()),
                ("q", query.as_str()),
                ("searchType", "image"),
                ("num", num.as_str()),
                ("safe", "high"),
            ])
            .send()
            .await
            .map_err(|e| JournalError::Upstream(format!("image search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            event!(Level::ERROR, %status, body = %body, "image search upstream rejected the query");
            return Err(JournalError::Upstream(format!(
                "image search returned status {status}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| JournalError::Upstream(format!("image search response unreadable: {e}")))?;

        Ok(parsed
            .items
            .into_iter()
            .map(|item| ImageResult {
                url: item.link,
                thumbnail_url: item.image.thumbnail_link,
                source: item.image.context_link,
            })
            .collect())
    }
}
