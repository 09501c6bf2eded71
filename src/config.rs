use crate::core::{JournalError, Result};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_GOOGLE_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Service configuration
///
/// Missing collaborator credentials are not fatal at startup: the endpoint
/// that needs them answers with a configuration error instead.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen host
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Bucket that holds every owner's images
    pub bucket: Option<String>,

    /// Cloud region for the storage and place index clients
    pub region: String,

    /// S3-compatible endpoint override, path-style addressing
    pub s3_endpoint: Option<String>,

    /// Google Custom Search API key
    pub google_api_key: Option<String>,

    /// Google Custom Search engine id (`cx`)
    pub google_search_engine_id: Option<String>,

    /// Google Custom Search endpoint
    pub google_search_endpoint: String,

    /// Place index name
    pub place_index: Option<String>,

    /// Plain REST place index endpoint; the Location Service SDK is used when unset
    pub place_search_endpoint: Option<String>,

    /// Lifetime of issued signed URLs
    pub signed_url_ttl: Duration,

    /// Largest accepted request body
    pub max_body_bytes: usize,

    /// Timeout for outbound HTTP calls
    pub outbound_timeout: Duration,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            bucket: None,
            region: "us-east-1".to_string(),
            s3_endpoint: None,
            google_api_key: None,
            google_search_engine_id: None,
            google_search_endpoint: DEFAULT_GOOGLE_SEARCH_ENDPOINT.to_string(),
            place_index: None,
            place_search_endpoint: None,
            signed_url_ttl: Duration::from_secs(900),
            max_body_bytes: 25 * 1024 * 1024,
            outbound_timeout: Duration::from_secs(30),
        }
    }

    /// Load from the process environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::new();

        if let Some(host) = var("TRAVELOG_HOST") {
            config.host = host;
        }
        if let Some(port) = var("TRAVELOG_PORT") {
            config.port = parse_var("TRAVELOG_PORT", &port)?;
        }
        config.bucket = var("STORAGE_TRAVELLOGDB_BUCKETNAME");
        if let Some(region) = var("REGION") {
            config.region = region;
        }
        config.s3_endpoint = var("S3_ENDPOINT_URL");
        config.google_api_key = var("GOOGLE_API_KEY");
        config.google_search_engine_id = var("GOOGLE_SEARCH_ENGINE_ID");
        if let Some(endpoint) = var("GOOGLE_SEARCH_ENDPOINT") {
            config.google_search_endpoint = endpoint;
        }
        config.place_index = var("GEO_TRAVELLOGPLACEINDEX_NAME");
        config.place_search_endpoint = var("PLACE_SEARCH_ENDPOINT");
        if let Some(ttl) = var("SIGNED_URL_TTL_SECS") {
            config.signed_url_ttl = Duration::from_secs(parse_var("SIGNED_URL_TTL_SECS", &ttl)?);
        }
        if let Some(limit) = var("TRAVELOG_MAX_BODY_BYTES") {
            config.max_body_bytes = parse_var("TRAVELOG_MAX_BODY_BYTES", &limit)?;
        }

        if config.bucket.is_none() {
            warn!("STORAGE_TRAVELLOGDB_BUCKETNAME not set, uploads will be rejected");
        }
        if config.google_api_key.is_none() || config.google_search_engine_id.is_none() {
            info!("Google search credentials not set, /images will report a configuration error");
        }
        if config.place_index.is_none() {
            info!("GEO_TRAVELLOGPLACEINDEX_NAME not set, /search will report a configuration error");
        }

        Ok(config)
    }

    /// Set the host
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the bucket
    pub fn bucket(mut self, bucket: &str) -> Self {
        self.bucket = Some(bucket.to_string());
        self
    }

    /// Set the region
    pub fn region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }

    /// Set Google search credentials
    pub fn google_credentials(mut self, api_key: &str, search_engine_id: &str) -> Self {
        self.google_api_key = Some(api_key.to_string());
        self.google_search_engine_id = Some(search_engine_id.to_string());
        self
    }

    /// Set the Google search endpoint
    pub fn google_search_endpoint(mut self, endpoint: &str) -> Self {
        self.google_search_endpoint = endpoint.to_string();
        self
    }

    /// Set an S3-compatible endpoint
    pub fn s3_endpoint(mut self, endpoint: &str) -> Self {
        self.s3_endpoint = Some(endpoint.to_string());
        self
    }

    /// Set the place index name
    pub fn place_index(mut self, index: &str) -> Self {
        self.place_index = Some(index.to_string());
        self
    }

    /// Set the place index endpoint
    pub fn place_search_endpoint(mut self, endpoint: &str) -> Self {
        self.place_search_endpoint = Some(endpoint.to_string());
        self
    }

    /// Set signed URL lifetime
    pub fn signed_url_ttl(mut self, ttl: Duration) -> Self {
        self.signed_url_ttl = ttl;
        self
    }

    /// Set maximum request body size
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Set outbound request timeout
    pub fn outbound_timeout(mut self, timeout: Duration) -> Self {
        self.outbound_timeout = timeout;
        self
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(JournalError::Configuration("host cannot be empty".to_string()));
        }

        if let Some(bucket) = &self.bucket {
            crate::media::codec::validate_bucket(bucket)?;
        }

        if self.signed_url_ttl.is_zero() {
            return Err(JournalError::Configuration(
                "signed URL lifetime must be > 0".to_string(),
            ));
        }

        if self.max_body_bytes == 0 {
            return Err(JournalError::Configuration(
                "max_body_bytes must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| JournalError::Configuration(format!("invalid {key} value '{value}': {e}")))
}
