use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Installs the Prometheus recorder on first call; later calls reuse it.
    /// Publishes the configured cache TTL as a static gauge.
    pub fn init(cache_ttl_ms: u64) -> Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new()
                    .install_recorder()
                    .context("prometheus: install recorder")?;
                describe();
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();

        gauge!("cache_ttl_ms").set(cache_ttl_ms as f64);
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("cache_hits_total", "Result cache hits by kind");
    describe_counter!("cache_misses_total", "Result cache misses by kind");
    describe_counter!("cache_write_failures_total", "Cache writes rejected by the store");
    describe_counter!("classify_calls_total", "Batched classification calls");
    describe_counter!("classify_dropped_total", "Bills dropped for lack of an analysis");
    describe_counter!("script_fallbacks_total", "Scripts served from the local template");
}
