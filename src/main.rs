use anyhow::{Context, Result};
use clap::Parser;
use travelog::AppConfig;
use travelog::server::{Server, init_tracing};

#[derive(Parser)]
#[command(name = "travelog")]
#[command(about = "Travel journal API with signed-media resolution")]
struct Cli {
    /// Listen host, overrides TRAVELOG_HOST
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides TRAVELOG_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Image bucket, overrides STORAGE_TRAVELLOGDB_BUCKETNAME
    #[arg(long)]
    bucket: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("failed to read config")?;
    if let Some(host) = cli.host.as_deref() {
        config = config.host(host);
    }
    if let Some(port) = cli.port {
        config = config.port(port);
    }
    if let Some(bucket) = cli.bucket.as_deref() {
        config = config.bucket(bucket);
    }

    Server::new(config).run().await
}
