use anyhow::Context;
use scriptor_lua::LuaEngine;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod repository;
pub mod service;

use config::Config;
use repository::JobStore;
use service::JobService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scriptor_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Scriptor server...");

    let config = Config::from_env();
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        "Worker pool: {} parallel job(s), sampling every {:?}",
        config.max_parallel_jobs,
        config.sample_interval
    );

    let store = Arc::new(JobStore::new());
    let service = JobService::new(&config, store, Arc::new(LuaEngine::new()));

    let app = api::create_router(service);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
