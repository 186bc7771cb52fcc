//! Legislative data gateway: a thin, jurisdiction-scoped client for the Open
//! States v3 API, behind a trait so the pipeline can run against fixtures.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::bill::{Bill, BillsPage, Representative};
use crate::config::{AppConfig, MAX_RECENT_BILL_DAYS};
use crate::error::{CivicError, Result};
use crate::geo::{Coordinates, ZipCode};

const LIST_INCLUDES: &[&str] = &["abstracts", "sponsorships", "actions"];
const DETAIL_INCLUDES: &[&str] = &[
    "abstracts",
    "sponsorships",
    "actions",
    "votes",
    "versions",
    "documents",
];

/// Bill search parameters. The jurisdiction is fixed by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub q: Option<String>,
    pub session: Option<String>,
    pub subject: Vec<String>,
    pub updated_since: Option<String>,
    pub action_since: Option<String>,
}

impl BillsQuery {
    /// Bills with any action in the last `days` days.
    pub fn recent(days: i64, per_page: u32) -> Self {
        Self::recent_from(Utc::now().date_naive(), days, per_page)
    }

    pub fn recent_from(today: NaiveDate, days: i64, per_page: u32) -> Self {
        let since = today - ChronoDuration::days(days.clamp(0, MAX_RECENT_BILL_DAYS));
        Self {
            per_page: Some(per_page),
            action_since: Some(since.format("%Y-%m-%d").to_string()),
            ..Default::default()
        }
    }

    /// Builds a query from raw `key=value` pairs (repeated `subject` allowed).
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self> {
        let mut q = BillsQuery::default();
        for (k, v) in pairs {
            let v = v.trim();
            if v.is_empty() {
                continue;
            }
            match k.as_str() {
                "page" => q.page = Some(parse_positive(k, v)?),
                "per_page" => q.per_page = Some(parse_positive(k, v)?),
                "q" => q.q = Some(v.to_string()),
                "session" => q.session = Some(v.to_string()),
                "subject" => q.subject.push(v.to_string()),
                "updated_since" => q.updated_since = Some(v.to_string()),
                "action_since" => q.action_since = Some(v.to_string()),
                _ => {}
            }
        }
        Ok(q)
    }

    /// Upstream query string parameters, jurisdiction first.
    pub fn to_params(&self, jurisdiction: &str) -> Vec<(&'static str, String)> {
        let mut p = vec![
            ("jurisdiction", jurisdiction.to_string()),
            ("page", self.page.unwrap_or(1).to_string()),
            ("per_page", self.per_page.unwrap_or(20).to_string()),
        ];
        let optional = [
            ("q", &self.q),
            ("session", &self.session),
            ("updated_since", &self.updated_since),
            ("action_since", &self.action_since),
        ];
        for (name, value) in optional {
            if let Some(v) = value {
                p.push((name, v.clone()));
            }
        }
        p.extend(self.subject.iter().map(|s| ("subject", s.clone())));
        p.extend(LIST_INCLUDES.iter().map(|i| ("include", i.to_string())));
        p
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<u32> {
    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CivicError::validation(format!(
            "{name} must be a positive integer"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativesLookup {
    pub results: Vec<Representative>,
    pub coordinates: Coordinates,
    pub zip_code: ZipCode,
}

#[async_trait::async_trait]
pub trait LegislativeData: Send + Sync {
    async fn fetch_bills(&self, query: &BillsQuery) -> Result<BillsPage>;
    async fn fetch_bill(&self, id: &str) -> Result<Bill>;
    async fn fetch_representatives(&self, zip: &ZipCode) -> Result<RepresentativesLookup>;
}

pub struct OpenStatesClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    jurisdiction: String,
}

#[derive(Deserialize)]
struct PeoplePage {
    #[serde(default)]
    results: Vec<Representative>,
}

impl OpenStatesClient {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("civic-pulse/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: cfg.open_states_api_key.clone(),
            base_url: cfg.open_states_base_url.trim_end_matches('/').to_string(),
            jurisdiction: cfg.jurisdiction.clone(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CivicError::ConfigurationMissing("OPEN_STATES_API_KEY"))?;

        let resp = self
            .http
            .get(format!("{}{}", self.base_url, endpoint))
            .header("X-API-KEY", api_key)
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            tracing::warn!(target: "gateway", %endpoint, %status, "upstream error");
            return Err(CivicError::ExternalCall(format!(
                "Open States API error: {status} - {excerpt}"
            )));
        }
        resp.json::<T>()
            .await
            .map_err(|e| CivicError::MalformedResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl LegislativeData for OpenStatesClient {
    async fn fetch_bills(&self, query: &BillsQuery) -> Result<BillsPage> {
        let page: BillsPage = self
            .get("/bills", &query.to_params(&self.jurisdiction))
            .await?;
        tracing::debug!(target: "gateway", count = page.results.len(), "bills fetched");
        Ok(page)
    }

    async fn fetch_bill(&self, id: &str) -> Result<Bill> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CivicError::validation("Bill ID is required"));
        }
        let path = if id.starts_with("ocd-bill/") {
            format!("/bills/{id}")
        } else {
            format!("/bills/ocd-bill/{id}")
        };
        let params: Vec<(&str, String)> = DETAIL_INCLUDES
            .iter()
            .map(|i| ("include", i.to_string()))
            .collect();
        self.get(&path, &params).await
    }

    async fn fetch_representatives(&self, zip: &ZipCode) -> Result<RepresentativesLookup> {
        let coordinates = zip.coordinates();
        let page: PeoplePage = self
            .get(
                "/people.geo",
                &[
                    ("lat", coordinates.lat.to_string()),
                    ("lng", coordinates.lng.to_string()),
                ],
            )
            .await?;
        let results = filter_sitting_legislators(page.results, &self.jurisdiction);
        Ok(RepresentativesLookup {
            results,
            coordinates,
            zip_code: zip.clone(),
        })
    }
}

/// Keeps people in `jurisdiction` who currently hold a role.
pub fn filter_sitting_legislators(
    people: Vec<Representative>,
    jurisdiction: &str,
) -> Vec<Representative> {
    people
        .into_iter()
        .filter(|p| p.in_jurisdiction(jurisdiction) && p.holds_office())
        .collect()
}
