// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ai;
pub mod analysis;
pub mod api;
pub mod bill;
pub mod browse;
pub mod cache;
pub mod classify;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod geo;
pub mod issues;
pub mod metrics;
pub mod pipeline;
pub mod preferences;
pub mod script;
pub mod session;

use std::sync::Arc;

use axum::Router;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use crate::api::{router, AppState};
pub use crate::error::{CivicError, Result};

use crate::cache::{FileStore, ResultCache};
use crate::config::AppConfig;
use crate::gateway::OpenStatesClient;

/// Production wiring: Open States gateway, model collaborators per
/// `AI_TEST_MODE`, file-backed result cache under `cache_dir`.
pub fn build_state(cfg: &AppConfig) -> AppState {
    let store = Arc::new(FileStore::new(&cfg.cache_dir, cfg.cache_capacity_bytes));
    let cache = Arc::new(ResultCache::with_ttl(store, clock::system(), cfg.cache_ttl()));
    let gateway = Arc::new(OpenStatesClient::from_config(cfg));
    let (classifier, writer) = ai::build_from_config(cfg);
    AppState::new(cfg, gateway, classifier, writer, cache)
}

/// Full application router: API routes plus `/metrics`.
pub fn app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let ttl_ms = u64::try_from(cfg.cache_ttl().as_millis()).unwrap_or(u64::MAX);
    let metrics = metrics::Metrics::init(ttl_ms)?;
    Ok(router(build_state(cfg)).merge(metrics.router()))
}

/// Installs the global subscriber. `CIVIC_LOG_JSON=1` switches to JSON lines.
/// A subscriber installed earlier (e.g. by the hosting runtime) wins.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("civic_pulse=info,warn"));
    let json = std::env::var("CIVIC_LOG_JSON").is_ok_and(|v| v == "1");

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
