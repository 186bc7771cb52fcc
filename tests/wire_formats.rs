// tests/wire_formats.rs
//
// Real HTTP round-trips for the Open States and Anthropic clients against a
// local axum server bound to an ephemeral port. Verifies headers, query
// shaping, response decoding and error mapping.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use shuttle_axum::axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};

use civic_pulse::ai::{AnthropicClient, BillClassifier, ScriptPrompt, ScriptWriter};
use civic_pulse::analysis::{Recommendation, Stance};
use civic_pulse::bill::Bill;
use civic_pulse::config::AppConfig;
use civic_pulse::error::CivicError;
use civic_pulse::gateway::{BillsQuery, LegislativeData, OpenStatesClient};
use civic_pulse::geo::ZipCode;
use civic_pulse::preferences::{Position, PreferenceSet};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(HeaderMap, Vec<(String, String)>, Value)>>>,
}

impl Recorded {
    fn push(&self, headers: HeaderMap, query: Vec<(String, String)>, body: Value) {
        self.requests.lock().unwrap().push((headers, query, body));
    }

    fn last(&self) -> (HeaderMap, Vec<(String, String)>, Value) {
        self.requests.lock().unwrap().last().cloned().expect("a request")
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        shuttle_axum::axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ---------- Anthropic ----------

async fn messages(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let denied = headers.get("x-api-key").is_some_and(|k| k == "revoked");
    rec.push(headers, vec![], body.clone());
    if denied {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"type":"error","error":{"type":"authentication_error"}})),
        );
    }
    let text = if body["max_tokens"] == 4096 {
        "```json\n[{\"billId\":\"ocd-bill/a\",\"recommendation\":\"oppose\",\"confidence\":0.6,\"summary\":\"s\",\"relevantIssues\":[\"rent-control\"],\"reasoning\":\"r\"}]\n```".to_string()
    } else {
        "  Hi, my name is [YOUR NAME]. I support AB 1. Thank you.  ".to_string()
    };
    (
        StatusCode::OK,
        Json(json!({ "content": [{ "type": "text", "text": text }] })),
    )
}

async fn anthropic(key: &str) -> (AnthropicClient, Recorded) {
    let rec = Recorded::default();
    let app = Router::new()
        .route("/v1/messages", post(messages))
        .with_state(rec.clone());
    let base = serve(app).await;
    let cfg = AppConfig {
        anthropic_base_url: base,
        anthropic_api_key: Some(key.to_string()),
        ..Default::default()
    };
    (AnthropicClient::from_config(&cfg), rec)
}

fn bill(id: &str, identifier: &str) -> Bill {
    Bill {
        id: id.into(),
        identifier: identifier.into(),
        title: "Tenancy".into(),
        ..Default::default()
    }
}

fn prefs() -> PreferenceSet {
    let mut p = PreferenceSet::new();
    p.set("rent-control", Position::new(-2).unwrap());
    p
}

#[tokio::test]
async fn classification_request_and_response_shape() {
    let (client, rec) = anthropic("sk-test").await;
    let out = client
        .classify_bills(&[bill("ocd-bill/a", "AB 1")], &prefs())
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].recommendation, Recommendation::Oppose);
    assert_eq!(out[0].relevant_issues, vec!["rent-control".to_string()]);

    let (headers, _, body) = rec.last();
    assert_eq!(headers["x-api-key"], "sk-test");
    assert_eq!(headers["anthropic-version"], "2023-06-01");
    assert_eq!(body["model"], "claude-sonnet-4-20250514");
    assert_eq!(body["messages"][0]["role"], "user");
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("ocd-bill/a"));
    assert!(prompt.contains("Rent Control"));
}

#[tokio::test]
async fn script_text_is_trimmed() {
    let (client, rec) = anthropic("sk-test").await;
    let b = bill("ocd-bill/a", "AB 1");
    let p = prefs();
    let prompt = ScriptPrompt {
        bill: &b,
        preferences: &p,
        stance: Stance::Support,
        bill_status: Some("Third Reading"),
        jurisdiction: "California",
    };
    let script = client.write_script(&prompt).await.unwrap();
    assert_eq!(script, "Hi, my name is [YOUR NAME]. I support AB 1. Thank you.");
    let (_, _, body) = rec.last();
    assert_eq!(body["max_tokens"], 500);
}

#[tokio::test]
async fn non_success_status_is_external_call_failure() {
    let (client, _) = anthropic("revoked").await;
    let err = client
        .classify_bills(&[bill("ocd-bill/a", "AB 1")], &prefs())
        .await
        .unwrap_err();
    match err {
        CivicError::ExternalCall(msg) => assert!(msg.contains("401")),
        other => panic!("unexpected error: {other:?}"),
    }
}

// ---------- Open States ----------

async fn bills_route(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Query(q): Query<Vec<(String, String)>>,
) -> Json<Value> {
    rec.push(headers, q, Value::Null);
    Json(serde_json::from_str(include_str!("fixtures/bills.json")).unwrap())
}

async fn bill_route(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Query(q): Query<Vec<(String, String)>>,
) -> Json<Value> {
    rec.push(headers, q, Value::Null);
    Json(json!({ "id": "ocd-bill/xyz", "identifier": "SB 2", "title": "Budget" }))
}

async fn people_route(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Query(q): Query<Vec<(String, String)>>,
) -> Json<Value> {
    rec.push(headers, q, Value::Null);
    // Upstream sends explicit nulls for blank office, email and image fields.
    Json(serde_json::from_str(include_str!("fixtures/people_geo.json")).unwrap())
}

async fn open_states(key: Option<&str>) -> (OpenStatesClient, Recorded) {
    let rec = Recorded::default();
    let app = Router::new()
        .route("/bills", get(bills_route))
        .route("/bills/ocd-bill/{id}", get(bill_route))
        .route("/people.geo", get(people_route))
        .with_state(rec.clone());
    let base = serve(app).await;
    let cfg = AppConfig {
        open_states_base_url: base,
        open_states_api_key: key.map(str::to_string),
        ..Default::default()
    };
    (OpenStatesClient::from_config(&cfg), rec)
}

fn values<'a>(q: &'a [(String, String)], name: &str) -> Vec<&'a str> {
    q.iter()
        .filter(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .collect()
}

#[tokio::test]
async fn bills_query_is_jurisdiction_scoped() {
    let (client, rec) = open_states(Some("os-key")).await;
    let query = BillsQuery {
        q: Some("tenant".into()),
        subject: vec!["Housing".into()],
        ..BillsQuery::recent(30, 20)
    };
    let page = client.fetch_bills(&query).await.unwrap();
    assert_eq!(page.results.len(), 3);
    assert_eq!(page.results[0].status_label(), "In Committee");
    assert_eq!(page.results[1].abstract_text(), "Wildfire prevention: defensible space");

    let (headers, q, _) = rec.last();
    assert_eq!(headers["x-api-key"], "os-key");
    assert_eq!(values(&q, "jurisdiction"), vec!["California"]);
    assert_eq!(values(&q, "q"), vec!["tenant"]);
    assert_eq!(values(&q, "subject"), vec!["Housing"]);
    assert_eq!(values(&q, "per_page"), vec!["20"]);
    assert_eq!(values(&q, "include"), vec!["abstracts", "sponsorships", "actions"]);
    assert_eq!(values(&q, "action_since").len(), 1);
}

#[tokio::test]
async fn single_bill_requests_detail_includes() {
    let (client, rec) = open_states(Some("os-key")).await;
    let b = client.fetch_bill("xyz").await.unwrap();
    assert_eq!(b.identifier, "SB 2");
    let (_, q, _) = rec.last();
    assert!(values(&q, "include").contains(&"votes"));
    assert!(values(&q, "include").contains(&"documents"));

    // Fully-qualified ids hit the same route.
    client.fetch_bill("ocd-bill/xyz").await.unwrap();
}

#[tokio::test]
async fn representatives_are_filtered_to_sitting_state_legislators() {
    let (client, rec) = open_states(Some("os-key")).await;
    let zip = ZipCode::parse("94110").unwrap();
    let lookup = client.fetch_representatives(&zip).await.unwrap();
    assert_eq!(lookup.results.len(), 1);
    assert_eq!(lookup.results[0].name, "Scott Wiener");
    assert_eq!(lookup.results[0].phone_numbers(), vec!["916-651-4011"]);
    assert_eq!(lookup.results[0].email, "");
    assert_eq!(lookup.zip_code, zip);

    let (_, q, _) = rec.last();
    let coords = zip.coordinates();
    assert_eq!(values(&q, "lat"), vec![coords.lat.to_string().as_str()]);
    assert_eq!(values(&q, "lng"), vec![coords.lng.to_string().as_str()]);
}

#[tokio::test]
async fn unknown_route_maps_to_external_call_failure() {
    let (client, _) = open_states(Some("os-key")).await;
    // The stub only serves /bills/ocd-bill/{id}; a nested path 404s.
    let err = client.fetch_bill("a/b").await.unwrap_err();
    assert!(matches!(err, CivicError::ExternalCall(m) if m.contains("404")));
}
