// tests/metrics.rs
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use civic_pulse::config::AppConfig;

const BODY_LIMIT: usize = 1_048_576; // 1 MiB

// Build the full production router with the mock model and an isolated cache dir.
fn build_app(cache_dir: &std::path::Path) -> Router {
    std::env::set_var("AI_TEST_MODE", "mock");
    let cfg = AppConfig {
        cache_dir: cache_dir.to_path_buf(),
        ..Default::default()
    };
    civic_pulse::app(&cfg).expect("app() should build Router in tests")
}

async fn scrape(app: &Router) -> String {
    let resp = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[serial_test::serial]
#[tokio::test]
async fn metrics_endpoint_exposes_cache_series() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(dir.path());

    let payload = json!({
        "bill": { "id": "ocd-bill/m1", "identifier": "AB 7", "title": "Transit" },
        "preferences": [{ "issueId": "public-transit", "position": 1 }],
        "recommendation": "support"
    });
    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(
                Request::post("/api/generate-script")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let text = scrape(&app).await;
    for needle in ["cache_ttl_ms", "cache_misses_total", "cache_hits_total"] {
        assert!(text.contains(needle), "missing series {needle} in:\n{text}");
    }
    // Second request was served from the file-backed cache.
    assert!(dir.path().join("store.json").exists());
}

#[serial_test::serial]
#[tokio::test]
async fn app_can_be_built_twice_in_one_process() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let first = build_app(a.path());
    let second = build_app(b.path());
    assert!(scrape(&first).await.contains("cache_ttl_ms"));
    assert!(scrape(&second).await.contains("cache_ttl_ms"));
}
