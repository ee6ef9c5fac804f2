use std::path::PathBuf;
use std::sync::Arc;

use api_rest::AppState;
use submit_store::constants::DEFAULT_STORAGE_DIR;
use submit_store::{StoreConfig, SubmissionStore, max_upload_bytes_from_env_value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the submission service
///
/// Resolves configuration from the environment once, makes sure the storage directories
/// exist and serves the REST API until the process is stopped.
///
/// # Environment Variables
/// - `SUBMIT_ADDR`: listen address (default: "0.0.0.0:3000")
/// - `SUBMIT_STORAGE_DIR`: storage root holding `uploads/` and `metadata/` (default: "storage")
/// - `SUBMIT_MAX_UPLOAD_BYTES`: largest accepted upload in bytes (default: 100 MiB)
/// - `SUBMIT_PUBLIC_DIR`: directory holding the landing page (default: "public")
/// - `RUST_LOG`: log filter
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("submit=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("submit_store=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("SUBMIT_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let storage_dir = std::env::var("SUBMIT_STORAGE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_DIR));
    let public_dir = std::env::var("SUBMIT_PUBLIC_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("public"));
    let max_upload_bytes =
        max_upload_bytes_from_env_value(std::env::var("SUBMIT_MAX_UPLOAD_BYTES").ok())?;

    let cfg = Arc::new(StoreConfig::new(storage_dir, max_upload_bytes)?);
    let store = SubmissionStore::new(cfg.clone());
    store.ensure_directories().await?;

    tracing::info!("++ Starting submission service on {}", addr);
    tracing::info!("Upload directory: {}", cfg.uploads_dir().display());
    tracing::info!("Metadata directory: {}", cfg.metadata_dir().display());

    api_rest::serve(&addr, AppState::new(store, public_dir)).await
}
