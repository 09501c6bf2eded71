use crate::core::{JournalError, OwnerScope, PermanentReference, Result, StagedFile};
use crate::media::ImageSetReconciler;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use tracing::{Level, event};

/// Filename given to every imported image.
pub const IMPORTED_IMAGE_NAME: &str = "google-image.jpg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage>;
}

pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| JournalError::Download(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JournalError::Download(format!("{url}: status {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| JournalError::Download(format!("{url}: {e}")))?;

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// Copies a third-party image into the caller's own storage scope.
pub struct ImageImporter {
    fetcher: Arc<dyn ImageFetcher>,
    reconciler: ImageSetReconciler,
    bucket: Option<String>,
}

impl ImageImporter {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        reconciler: ImageSetReconciler,
        bucket: Option<String>,
    ) -> Self {
        Self {
            fetcher,
            reconciler,
            bucket,
        }
    }

    /// Download `image_url` and store it under a fresh key for `owner`.
    ///
    /// The returned reference is not attached to any entry yet; the client
    /// adds it to the edit in progress.
    pub async fn import(&self, owner: &OwnerScope, image_url: &str) -> Result<PermanentReference> {
        let url = validate_source(image_url)?;
        let bucket = self.bucket.as_deref().ok_or_else(|| {
            JournalError::Configuration("no storage bucket configured for uploads".to_string())
        })?;

        let fetched = self.fetcher.fetch(url.as_str()).await?;
        let file = StagedFile {
            filename: IMPORTED_IMAGE_NAME.to_string(),
            bytes: fetched.bytes,
            content_type: fetched.content_type,
        };
        let reference = self.reconciler.store(owner, bucket, file).await?;
        event!(Level::INFO, owner = %owner, reference = %reference, "suggested image imported");
        Ok(reference)
    }
}

fn validate_source(image_url: &str) -> Result<reqwest::Url> {
    let url = reqwest::Url::parse(image_url.trim())
        .map_err(|e| JournalError::Validation(format!("imageUrl is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(JournalError::Validation(format!(
            "imageUrl scheme '{other}' is not supported"
        ))),
    }
}
