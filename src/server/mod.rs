//! Process wiring: builds the collaborators from [`AppConfig`] and serves
//! the HTTP router until a shutdown signal arrives.

use crate::config::AppConfig;
use crate::core::Result;
use crate::journal::{EntryStore, InMemoryEntryStore, JournalService};
use crate::media::{ImageSetReconciler, KeyGenerator, ReferenceResolver};
use crate::proxy::{
    GoogleImageSearch, HttpImageFetcher, ImageImporter, LocationServicePlaceSearch, PlaceSearch,
    RestPlaceSearch, http_client,
};
use crate::storage::{InMemoryStorage, ObjectStorage, S3Storage, s3_client};
use aws_config::{BehaviorVersion, Region};
use crate::web::{AppState, router};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Bucket label used by the local object store when none is configured.
pub const LOCAL_BUCKET: &str = "travelog-local";

pub struct Boot {
    pub state: AppState,
    pub router: Router,
}

/// Assemble the application around the given collaborators.
pub fn assemble(
    config: &AppConfig,
    storage: Arc<dyn ObjectStorage>,
    entries: Arc<dyn EntryStore>,
    places: Arc<dyn PlaceSearch>,
) -> Result<Boot> {
    let client = http_client(config.outbound_timeout)?;

    let resolver = ReferenceResolver::new(Arc::clone(&storage));
    let reconciler = ImageSetReconciler::new(storage, Arc::new(KeyGenerator::new()));

    let journal = JournalService::new(
        entries,
        resolver,
        reconciler.clone(),
        config.bucket.clone(),
    );
    let images = GoogleImageSearch::new(
        client.clone(),
        config.google_search_endpoint.clone(),
        config.google_api_key.clone(),
        config.google_search_engine_id.clone(),
    );
    let importer = ImageImporter::new(
        Arc::new(HttpImageFetcher::new(client)),
        reconciler,
        config.bucket.clone(),
    );

    let state = AppState {
        journal: Arc::new(journal),
        images: Arc::new(images),
        places,
        importer: Arc::new(importer),
    };
    let router = router(state.clone(), config.max_body_bytes);
    Ok(Boot { state, router })
}

/// Production wiring.
///
/// Images go to the configured S3 bucket; without one, a process-local store
/// stands in and uploads are rejected. Places go through the Location
/// Service SDK unless a plain REST endpoint is configured.
pub async fn bootstrap(config: &AppConfig) -> Result<Boot> {
    let sdk = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await;

    let storage: Arc<dyn ObjectStorage> = match &config.bucket {
        Some(bucket) => {
            info!(bucket = %bucket, region = %config.region, "using S3 object storage");
            let client = s3_client(&sdk, config.s3_endpoint.as_deref());
            Arc::new(S3Storage::new(client, bucket.clone(), config.signed_url_ttl))
        }
        None => {
            warn!("no bucket configured; using process-local object storage");
            Arc::new(InMemoryStorage::new(LOCAL_BUCKET).with_url_ttl(config.signed_url_ttl))
        }
    };

    let places: Arc<dyn PlaceSearch> = match &config.place_search_endpoint {
        Some(endpoint) => Arc::new(RestPlaceSearch::new(
            http_client(config.outbound_timeout)?,
            endpoint.clone(),
            config.place_index.clone(),
        )),
        None => Arc::new(LocationServicePlaceSearch::new(
            aws_sdk_location::Client::new(&sdk),
            config.place_index.clone(),
        )),
    };

    assemble(
        config,
        storage,
        Arc::new(InMemoryEntryStore::default()),
        places,
    )
}

pub struct Server {
    config: AppConfig,
}

impl Server {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        self.config.validate()?;
        let boot = bootstrap(&self.config).await?;

        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr).await?;
        info!("Travel log API listening on {}", addr);

        axum::serve(listener, boot.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Travel log API stopped");
        Ok(())
    }
}

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("travelog=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
