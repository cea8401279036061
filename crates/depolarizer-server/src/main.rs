//! depolarizer-server
//!
//! アップロード、進捗チャネル、ダウンロードを 1 つの HTTP サーバーで提供する。

mod http;
mod ws;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use depolarizer_core::app::{AppBuilder, AppConfig};

#[derive(Debug, Parser)]
#[command(name = "depolarizer-server", about = "Upload, depolarize and download files")]
struct Cli {
    /// Listen address
    #[arg(long, env = "DEPOLARIZER_BIND", default_value = "0.0.0.0:5001")]
    bind: SocketAddr,

    /// Directory blobs are stored in
    #[arg(long, env = "DEPOLARIZER_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Upload request size limit in MiB
    #[arg(long, env = "DEPOLARIZER_MAX_UPLOAD_MB", default_value_t = 300)]
    max_upload_mb: u64,

    /// Minimum gap between progress events, in seconds
    #[arg(long, env = "DEPOLARIZER_PACING_SECS", default_value_t = 1.8)]
    pacing_secs: f64,

    /// Lifetime of a derived blob, in seconds
    #[arg(long, env = "DEPOLARIZER_EXPIRY_SECS", default_value_t = 60)]
    expiry_secs: u64,

    /// Base URL used in `file_ready` links (defaults to the request's Host)
    #[arg(long, env = "DEPOLARIZER_PUBLIC_BASE_URL")]
    public_base_url: Option<String>,
}

impl Cli {
    fn app_config(&self) -> anyhow::Result<AppConfig> {
        let pacing = Duration::try_from_secs_f64(self.pacing_secs)
            .with_context(|| format!("invalid pacing interval: {}", self.pacing_secs))?;
        let max_upload_bytes = self
            .max_upload_mb
            .checked_mul(1024 * 1024)
            .context("max upload size overflows")?;
        Ok(AppConfig::default()
            .with_upload_dir(&self.upload_dir)
            .with_max_upload_bytes(max_upload_bytes)
            .with_pacing_interval(pacing)
            .with_expiry_delay(Duration::from_secs(self.expiry_secs)))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let app = AppBuilder::new(cli.app_config()?)
        .build()
        .await
        .context("failed to build app")?;
    let router = http::router(http::AppState::new(app.clone(), cli.public_base_url.clone()));

    let listener = TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    tracing::info!(addr = %cli.bind, upload_dir = %cli.upload_dir.display(), "depolarizer server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    app.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
