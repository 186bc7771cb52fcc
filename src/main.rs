//! Civic Pulse: Binary Entrypoint
//! Boots the Axum HTTP server with the recommendation pipeline, the proxy
//! routes, and `/metrics`.
//!
//! See `README.md` for configuration.

use shuttle_axum::ShuttleAxum;

use civic_pulse::config::AppConfig;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    civic_pulse::init_tracing();

    let cfg = AppConfig::load().map_err(shuttle_runtime::Error::Custom)?;
    if cfg.open_states_api_key.is_none() {
        tracing::warn!("OPEN_STATES_API_KEY not set; bill and representative routes will fail");
    }
    if cfg.anthropic_api_key.is_none() {
        tracing::warn!("ANTHROPIC_API_KEY not set; classification will fail, scripts fall back to the template");
    }
    tracing::info!(
        jurisdiction = %cfg.jurisdiction,
        cache_dir = %cfg.cache_dir.display(),
        model = %cfg.model,
        "starting civic-pulse"
    );

    let router = civic_pulse::app(&cfg).map_err(shuttle_runtime::Error::Custom)?;
    Ok(router.into())
}
