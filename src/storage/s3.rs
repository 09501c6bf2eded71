use super::ObjectStorage;
use crate::core::{JournalError, Result, SignedUrl};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use chrono::Utc;
use std::time::Duration;
use tracing::{Level, event};

/// Build an S3 client from the shared SDK config.
///
/// A custom endpoint (local S3-compatible server) switches to path-style
/// addressing.
pub fn s3_client(sdk: &aws_config::SdkConfig, endpoint: Option<&str>) -> Client {
    let mut builder = aws_sdk_s3::config::Builder::from(sdk);
    if let Some(url) = endpoint {
        builder = builder.endpoint_url(url).force_path_style(true);
    }
    Client::from_conf(builder.build())
}

/// Object storage backed by an S3 bucket.
pub struct S3Storage {
    client: Client,
    bucket: String,
    url_ttl: Duration,
}

impl S3Storage {
    pub fn new(client: Client, bucket: impl Into<String>, url_ttl: Duration) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            url_ttl,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn ensure_exists(&self, key: &str) -> Result<()> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;
        match head {
            Ok(_) => Ok(()),
            Err(err) => {
                let missing = err.as_service_error().is_some_and(|e| e.is_not_found())
                    || err.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if missing {
                    Err(JournalError::NotFound(key.to_string()))
                } else {
                    Err(JournalError::Storage(format!(
                        "head_object '{}' failed: {}",
                        key,
                        DisplayErrorContext(&err)
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn signed_url(&self, key: &str, validate_existence: bool) -> Result<SignedUrl> {
        if validate_existence {
            self.ensure_exists(key).await?;
        }

        let presigning = PresigningConfig::expires_in(self.url_ttl)
            .map_err(|e| JournalError::Configuration(format!("signed URL lifetime: {e}")))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| {
                JournalError::Storage(format!(
                    "signing '{}' failed: {}",
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        let ttl = chrono::Duration::from_std(self.url_ttl)
            .map_err(|e| JournalError::Configuration(format!("signed URL lifetime: {e}")))?;
        Ok(SignedUrl {
            url: request.uri().to_string(),
            expires_at: Utc::now() + ttl,
        })
    }

    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                event!(Level::ERROR, key = %key, error = %DisplayErrorContext(&e), "put_object failed");
                JournalError::upload(key, DisplayErrorContext(&e).to_string())
            })?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                event!(Level::ERROR, key = %key, error = %DisplayErrorContext(&e), "delete_object failed");
                JournalError::delete(key, DisplayErrorContext(&e).to_string())
            })?;
        Ok(())
    }
}
