pub mod config;
pub mod error;
pub mod http;
pub mod log;
pub mod model;
pub mod providers;
pub mod rate_provider;
pub mod service;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use tracing::info;

use crate::config::AppConfig;
use crate::providers::open_exchange_rates::OpenExchangeRatesProvider;
use crate::service::ExchangeService;
use crate::store::{RateCache, RateStore};

pub async fn run(config_path: Option<&str>, listen: Option<&str>) -> Result<()> {
    info!("fxrates starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    let service = build_service(&config).await?;
    let app = http::app(service);

    let listen = listen.unwrap_or(&config.listen);
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {listen}"))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Shut down; store clients close on drop");
    Ok(())
}

async fn build_service(config: &AppConfig) -> Result<Arc<ExchangeService>> {
    let provider = Arc::new(OpenExchangeRatesProvider::new(
        &config.provider.base_url,
        &config.provider.app_id,
        Duration::from_secs(config.provider.timeout_secs),
    )?);

    let (store, cache): (Arc<dyn RateStore>, Arc<dyn RateCache>) = if config.store.ephemeral {
        info!("Ephemeral mode: nothing will be persisted");
        (
            Arc::new(store::memory::MemoryStore::new()),
            Arc::new(store::memory::MemoryCache::new()),
        )
    } else {
        let data_dir = config.data_dir()?;
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        info!("Using data directory {}", data_dir.display());
        (
            Arc::new(store::sql::SqliteStore::open(&data_dir.join("rates.db")).await?),
            Arc::new(store::kv::FjallCache::open(&data_dir.join("cache"))?),
        )
    };

    Ok(Arc::new(ExchangeService::new(
        provider,
        store,
        cache,
        &config.base_currency,
        config.round_digits,
    )))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown handler: {e}");
    }
}
