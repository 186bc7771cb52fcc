use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::ai::{DynClassifier, DynScriptWriter};
use crate::analysis::{AnalyzedBill, BillAnalysis, Recommendation, Stance};
use crate::bill::{Bill, BillsPage};
use crate::cache::{CacheStats, ResultCache};
use crate::classify::ClassificationOrchestrator;
use crate::config::{AppConfig, MAX_CLASSIFY_BATCH};
use crate::error::{CivicError, Result};
use crate::gateway::{BillsQuery, LegislativeData, RepresentativesLookup};
use crate::geo::ZipCode;
use crate::issues::{self, PolicyIssue};
use crate::pipeline::Pipeline;
use crate::preferences::{PreferenceSet, UserPreference};
use crate::script::ScriptOrchestrator;

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<dyn LegislativeData>,
    classifier: DynClassifier,
    pipeline: Arc<Pipeline>,
    cache: Arc<ResultCache>,
}

impl AppState {
    pub fn new(
        cfg: &AppConfig,
        gateway: Arc<dyn LegislativeData>,
        classifier: DynClassifier,
        writer: DynScriptWriter,
        cache: Arc<ResultCache>,
    ) -> Self {
        let orchestrator = Arc::new(ClassificationOrchestrator::with_batch_limit(
            cache.clone(),
            classifier.clone(),
            cfg.classify_batch_limit,
        ));
        let scripts = Arc::new(ScriptOrchestrator::new(
            cache.clone(),
            writer,
            cfg.jurisdiction.clone(),
        ));
        let pipeline = Pipeline::new(gateway.clone(), orchestrator, scripts)
            .with_window(cfg.recent_bill_days, cfg.bills_per_page);
        Self {
            gateway,
            classifier,
            pipeline: Arc::new(pipeline),
            cache,
        }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/issues", get(list_issues))
        .route("/api/bills", get(list_bills))
        .route("/api/bills/{id}", get(get_bill))
        .route("/api/representatives", get(representatives))
        .route("/api/analyze-bills", post(analyze_bills))
        .route("/api/generate-script", post(generate_script))
        .route("/api/recommendations", post(recommendations))
        .route("/debug/cache", get(debug_cache))
        .route("/admin/clear-cache", post(admin_clear_cache))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Unwraps a JSON body, turning any extractor rejection into a 400.
fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|rej| CivicError::validation(rej.body_text()))
}

async fn list_issues() -> Json<&'static [PolicyIssue]> {
    Json(issues::all())
}

async fn list_bills(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<BillsPage>> {
    let query = BillsQuery::from_pairs(&pairs)?;
    Ok(Json(state.gateway.fetch_bills(&query).await?))
}

async fn get_bill(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Bill>> {
    Ok(Json(state.gateway.fetch_bill(&id).await?))
}

async fn representatives(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<RepresentativesLookup>> {
    let raw = params
        .get("zip")
        .map(|z| z.trim())
        .filter(|z| !z.is_empty())
        .ok_or_else(|| CivicError::validation("Zip code is required"))?;
    let zip = ZipCode::parse(raw)?;
    let lookup = state.gateway.fetch_representatives(&zip).await?;
    tracing::info!(
        target: "api",
        zip = %zip.anon_id(),
        mapped = zip.is_mapped(),
        count = lookup.results.len(),
        "representatives resolved"
    );
    Ok(Json(lookup))
}

#[derive(Deserialize)]
struct AnalyzeReq {
    #[serde(default)]
    bills: Option<Vec<Bill>>,
    #[serde(default)]
    preferences: Option<Vec<UserPreference>>,
}

#[derive(Serialize)]
struct AnalyzeResp {
    analyses: Vec<BillAnalysis>,
}

async fn analyze_bills(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AnalyzeReq>, JsonRejection>,
) -> Result<Json<AnalyzeResp>> {
    let req = body(payload)?;
    let (Some(mut bills), Some(prefs)) = (req.bills, req.preferences) else {
        return Err(CivicError::validation(
            "Bills and preferences arrays are required",
        ));
    };
    if bills.len() > MAX_CLASSIFY_BATCH {
        tracing::debug!(target: "api", submitted = bills.len(), "truncating analyze batch");
        bills.truncate(MAX_CLASSIFY_BATCH);
    }
    let prefs = PreferenceSet::from(prefs);
    let analyses = state.classifier.classify_bills(&bills, &prefs).await?;
    Ok(Json(AnalyzeResp { analyses }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptReq {
    bill: Option<Bill>,
    #[serde(default)]
    preferences: Vec<UserPreference>,
    recommendation: Option<Recommendation>,
    #[serde(default)]
    bill_status: Option<String>,
    #[serde(default)]
    zip_code: Option<ZipCode>,
}

#[derive(Serialize)]
struct ScriptResp {
    script: String,
}

async fn generate_script(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ScriptReq>, JsonRejection>,
) -> Result<Json<ScriptResp>> {
    let req = body(payload)?;
    let (Some(bill), Some(rec)) = (req.bill, req.recommendation) else {
        return Err(CivicError::validation("Bill and recommendation are required"));
    };
    let stance = Stance::try_from(rec)?;
    let prefs = PreferenceSet::from(req.preferences);
    let script = state
        .pipeline
        .scripts()
        .get_script(
            &bill,
            &prefs,
            stance,
            req.bill_status.as_deref(),
            req.zip_code.as_ref(),
        )
        .await;
    Ok(Json(ScriptResp { script }))
}

#[derive(Deserialize)]
struct RecommendReq {
    preferences: Option<Vec<UserPreference>>,
}

#[derive(Serialize)]
struct RecommendResp {
    fingerprint: String,
    bills: Vec<AnalyzedBill>,
}

async fn recommendations(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RecommendReq>, JsonRejection>,
) -> Result<Json<RecommendResp>> {
    let req = body(payload)?;
    let prefs = req
        .preferences
        .map(PreferenceSet::from)
        .ok_or_else(|| CivicError::validation("Preferences array is required"))?;
    let bills = state.pipeline.recommend(&prefs).await?;
    Ok(Json(RecommendResp {
        fingerprint: prefs.fingerprint(),
        bills,
    }))
}

async fn debug_cache(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

#[derive(Serialize)]
struct ClearResp {
    removed: usize,
}

async fn admin_clear_cache(State(state): State<AppState>) -> Json<ClearResp> {
    Json(ClearResp {
        removed: state.cache.clear_all(),
    })
}
