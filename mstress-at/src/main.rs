//! mstress-at - Assessment Aggregation & Review Triage service
//!
//! Collects questionnaire, facial-emotion, voice, and sentiment signals,
//! combines them into composite stress assessments, and runs the human
//! review triage queue over completed high-stress records.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use mstress_at::providers::{ChannelDispatcher, HttpScoringProvider, ModalityProvider};
use mstress_at::{build_router, AppState};
use mstress_common::config;

#[derive(Parser, Debug)]
#[command(name = "mstress-at", version, about = "MStress assessment & triage service")]
struct Args {
    /// Path to TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data folder holding mstress.db (overrides config and environment)
    #[arg(long)]
    data_folder: Option<String>,

    /// Bind address (overrides config)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting mstress-at v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let service_config = config::load_config(args.config.as_deref())?;

    let data_folder = config::resolve_data_folder(args.data_folder.as_deref(), &service_config);
    config::ensure_data_folder(&data_folder)?;

    let db_path = config::database_path(&data_folder);
    info!("Database: {}", db_path.display());

    let db_pool = mstress_at::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let channel_timeout = Duration::from_millis(service_config.provider.channel_timeout_ms);
    let dispatcher = match &service_config.provider.base_url {
        Some(base_url) => {
            info!("Modality scoring provider: {}", base_url);
            let provider: Arc<dyn ModalityProvider> = Arc::new(HttpScoringProvider::new(
                base_url.clone(),
                channel_timeout,
            )?);
            ChannelDispatcher::new(Some(provider), channel_timeout)
        }
        None => {
            info!("No modality scoring provider configured; all channels use local fallback");
            ChannelDispatcher::offline()
        }
    };

    let state = AppState::new(db_pool, dispatcher);
    let app = build_router(state);

    let bind_address = args.bind.unwrap_or(service_config.bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
