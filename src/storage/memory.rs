use super::ObjectStorage;
use crate::core::{JournalError, Result, SignedUrl};
use crate::media::codec::{HOST_SUFFIX, SCHEME};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

const DEFAULT_URL_TTL: Duration = Duration::from_secs(900);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    Sign,
    Upload,
    Delete,
}

/// One collaborator call as seen by the storage, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCall {
    pub op: StorageOp,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub stored_at: DateTime<Utc>,
}

/// Process-local object storage.
///
/// Backs the dev server when no bucket is configured, and the test suite:
/// every call is logged, failures can be injected per operation and key
/// pattern, and an artificial latency makes fan-out observable. Its URLs
/// carry a random token instead of a real signature.
pub struct InMemoryStorage {
    bucket: String,
    url_ttl: Duration,
    latency: Option<Duration>,
    objects: RwLock<HashMap<String, StoredObject>>,
    calls: Mutex<Vec<StorageCall>>,
    faults: RwLock<Vec<(StorageOp, String)>>,
}

impl InMemoryStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            url_ttl: DEFAULT_URL_TTL,
            latency: None,
            objects: RwLock::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            faults: RwLock::new(Vec::new()),
        }
    }

    /// Set how long issued URLs stay valid
    pub fn with_url_ttl(mut self, ttl: Duration) -> Self {
        self.url_ttl = ttl;
        self
    }

    /// Delay every call by `latency` before it completes
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Seed an object without logging a call.
    pub async fn put_object(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let mut objects = self.objects.write().await;
        objects.insert(
            key.into(),
            StoredObject {
                bytes: bytes.into(),
                content_type: crate::core::DEFAULT_CONTENT_TYPE.to_string(),
                stored_at: Utc::now(),
            },
        );
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn calls(&self) -> Vec<StorageCall> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_for(&self, op: StorageOp) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.op == op)
            .map(|call| call.key.clone())
            .collect()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Make every `op` on a key containing `pattern` fail.
    pub async fn fail(&self, op: StorageOp, pattern: impl Into<String>) {
        self.faults.write().await.push((op, pattern.into()));
    }

    pub async fn clear_faults(&self) {
        self.faults.write().await.clear();
    }

    async fn enter(&self, op: StorageOp, key: &str) -> bool {
        self.calls.lock().await.push(StorageCall {
            op,
            key: key.to_string(),
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.faults
            .read()
            .await
            .iter()
            .any(|(fault_op, pattern)| *fault_op == op && key.contains(pattern.as_str()))
    }

    fn sign(&self, key: &str) -> SignedUrl {
        let ttl = chrono::Duration::from_std(self.url_ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_URL_TTL.as_secs() as i64));
        SignedUrl {
            url: format!(
                "{}{}{}{}?X-Amz-Expires={}&X-Amz-Signature={}",
                SCHEME,
                self.bucket,
                HOST_SUFFIX,
                key,
                self.url_ttl.as_secs(),
                Uuid::new_v4().simple()
            ),
            expires_at: Utc::now() + ttl,
        }
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn signed_url(&self, key: &str, validate_existence: bool) -> Result<SignedUrl> {
        if self.enter(StorageOp::Sign, key).await {
            return Err(JournalError::Storage(format!(
                "signing '{}' was rejected",
                key
            )));
        }
        if validate_existence && !self.contains(key).await {
            return Err(JournalError::NotFound(key.to_string()));
        }
        Ok(self.sign(key))
    }

    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        if self.enter(StorageOp::Upload, key).await {
            return Err(JournalError::upload(key, "storage rejected the object"));
        }
        let mut objects = self.objects.write().await;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                stored_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if self.enter(StorageOp::Delete, key).await {
            return Err(JournalError::delete(key, "storage rejected the removal"));
        }
        self.objects.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signed_url_validates_existence_only_when_asked() {
        let storage = InMemoryStorage::new("bucket");
        let err = storage.signed_url("private/o/missing.jpg", true).await.unwrap_err();
        assert_eq!(err, JournalError::NotFound("private/o/missing.jpg".to_string()));

        let signed = storage.signed_url("private/o/missing.jpg", false).await.unwrap();
        assert!(signed.url.starts_with("https://bucket.s3.amazonaws.com/private/o/missing.jpg?"));
    }

    #[tokio::test]
    async fn signed_urls_expire_after_ttl_and_differ_per_issue() {
        let storage = InMemoryStorage::new("bucket").with_url_ttl(Duration::from_secs(60));
        storage.put_object("private/o/a.jpg", vec![1u8]).await;

        let first = storage.signed_url("private/o/a.jpg", true).await.unwrap();
        let second = storage.signed_url("private/o/a.jpg", true).await.unwrap();
        assert_ne!(first.url, second.url);
        assert!(first.url.contains("X-Amz-Expires=60"));
        assert!(!first.is_expired_at(Utc::now()));
        assert!(first.is_expired_at(Utc::now() + chrono::Duration::seconds(61)));
    }

    #[tokio::test]
    async fn upload_and_delete_are_logged_in_order() {
        let storage = InMemoryStorage::new("bucket");
        storage.upload("k1", vec![1, 2], "image/png").await.unwrap();
        storage.delete("k1").await.unwrap();
        storage.delete("k1").await.unwrap();

        assert!(!storage.contains("k1").await);
        assert_eq!(
            storage.calls().await,
            vec![
                StorageCall { op: StorageOp::Upload, key: "k1".into() },
                StorageCall { op: StorageOp::Delete, key: "k1".into() },
                StorageCall { op: StorageOp::Delete, key: "k1".into() },
            ]
        );
    }

    #[tokio::test]
    async fn injected_faults_match_by_operation_and_pattern() {
        let storage = InMemoryStorage::new("bucket");
        storage.fail(StorageOp::Upload, "bad").await;

        assert!(matches!(
            storage.upload("private/o/bad.jpg", vec![], "image/jpeg").await,
            Err(JournalError::Upload { .. })
        ));
        storage.upload("private/o/good.jpg", vec![], "image/jpeg").await.unwrap();
        storage.delete("private/o/bad.jpg").await.unwrap();

        storage.clear_faults().await;
        storage.upload("private/o/bad.jpg", vec![], "image/jpeg").await.unwrap();
        assert_eq!(storage.object_count().await, 2);
    }
}
