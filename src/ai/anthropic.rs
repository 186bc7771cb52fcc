//! Anthropic Messages API client. Implements both collaborator traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::prompts::{classification_prompt, strip_code_fence, ScriptPrompt};
use super::{BillClassifier, ScriptWriter};
use crate::analysis::BillAnalysis;
use crate::bill::Bill;
use crate::config::AppConfig;
use crate::error::{CivicError, Result};
use crate::preferences::PreferenceSet;

const API_VERSION: &str = "2023-06-01";
const CLASSIFY_MAX_TOKENS: u32 = 4096;
const SCRIPT_MAX_TOKENS: u32 = 500;

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    jurisdiction: String,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl AnthropicClient {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("civic-pulse/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: cfg.anthropic_api_key.clone(),
            base_url: cfg.anthropic_base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            jurisdiction: cfg.jurisdiction.clone(),
        }
    }

    /// Sends one user message and returns the first text block.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CivicError::ConfigurationMissing("ANTHROPIC_API_KEY"))?;

        let req = Req {
            model: &self.model,
            max_tokens,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            return Err(CivicError::ExternalCall(format!(
                "model service returned {status}: {excerpt}"
            )));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| CivicError::MalformedResponse(e.to_string()))?;
        body.content
            .into_iter()
            .find(|c| c.kind == "text")
            .map(|c| c.text)
            .ok_or_else(|| CivicError::MalformedResponse("no text response from model".into()))
    }
}

/// Decodes the model's array of analyses. A non-array is fatal; entries that
/// fail to decode are skipped.
pub fn parse_analyses(text: &str) -> Result<Vec<BillAnalysis>> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| CivicError::MalformedResponse(format!("analysis is not JSON: {e}")))?;
    let serde_json::Value::Array(items) = value else {
        return Err(CivicError::MalformedResponse(
            "analysis is not a JSON array".into(),
        ));
    };

    let total = items.len();
    let analyses: Vec<BillAnalysis> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<BillAnalysis>(item) {
            Ok(a) => Some(a.clamped()),
            Err(e) => {
                tracing::warn!(target: "ai", error = %e, "skipping undecodable analysis entry");
                None
            }
        })
        .collect();
    if analyses.len() < total {
        tracing::warn!(target: "ai", total, kept = analyses.len(), "partial analysis batch");
    }
    Ok(analyses)
}

#[async_trait::async_trait]
impl BillClassifier for AnthropicClient {
    async fn classify_bills(
        &self,
        bills: &[Bill],
        prefs: &PreferenceSet,
    ) -> Result<Vec<BillAnalysis>> {
        if bills.is_empty() || prefs.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = classification_prompt(bills, prefs, &self.jurisdiction);
        let text = self.complete(&prompt, CLASSIFY_MAX_TOKENS).await?;
        parse_analyses(&text)
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

#[async_trait::async_trait]
impl ScriptWriter for AnthropicClient {
    async fn write_script(&self, prompt: &ScriptPrompt<'_>) -> Result<String> {
        let text = self.complete(&prompt.render(), SCRIPT_MAX_TOKENS).await?;
        let script = text.trim();
        if script.is_empty() {
            return Err(CivicError::MalformedResponse("empty script".into()));
        }
        Ok(script.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Recommendation;

    #[test]
    fn parses_fenced_array_and_skips_bad_entries() {
        let text = r#"```json
[
  {"billId":"a","recommendation":"support","confidence":0.9,"summary":"s","relevantIssues":[],"reasoning":"r"},
  {"billId":"b","recommendation":"maybe","confidence":0.4},
  {"billId":"c","recommendation":"oppose","confidence":-3}
]
```"#;
        let out = parse_analyses(text).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].recommendation, Recommendation::Support);
        assert_eq!(out[1].bill_id, "c");
        assert_eq!(out[1].confidence, 0.0);
    }

    #[test]
    fn non_array_is_malformed() {
        assert!(matches!(
            parse_analyses(r#"{"analyses":[]}"#),
            Err(CivicError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_analyses("Sorry, I can't help with that."),
            Err(CivicError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn missing_key_is_configuration_error() {
        let cfg = AppConfig::default();
        let client = AnthropicClient::from_config(&cfg);
        let bills = vec![Bill {
            id: "b".into(),
            ..Default::default()
        }];
        let mut prefs = PreferenceSet::new();
        prefs.set("water", crate::preferences::Position::new(1).unwrap());
        let err = client.classify_bills(&bills, &prefs).await.unwrap_err();
        assert!(matches!(err, CivicError::ConfigurationMissing("ANTHROPIC_API_KEY")));
    }

    #[tokio::test]
    async fn empty_inputs_short_circuit_without_key() {
        let client = AnthropicClient::from_config(&AppConfig::default());
        let out = client
            .classify_bills(&[], &PreferenceSet::new())
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}
