//! Language-model collaborators: provider traits, the Anthropic implementation,
//! and a deterministic mock for local runs and tests.

pub mod anthropic;
pub mod mock;
pub mod prompts;

use std::sync::Arc;

use crate::analysis::BillAnalysis;
use crate::bill::Bill;
use crate::config::AppConfig;
use crate::error::Result;
use crate::preferences::PreferenceSet;

pub use anthropic::AnthropicClient;
pub use mock::MockAi;
pub use prompts::ScriptPrompt;

/// Batch classification. Returns at most one analysis per submitted bill,
/// matched by `billId`; missing or extra entries are the caller's concern.
#[async_trait::async_trait]
pub trait BillClassifier: Send + Sync {
    async fn classify_bills(&self, bills: &[Bill], prefs: &PreferenceSet)
        -> Result<Vec<BillAnalysis>>;
    fn provider_name(&self) -> &'static str;
}

/// Single call-script generation.
#[async_trait::async_trait]
pub trait ScriptWriter: Send + Sync {
    async fn write_script(&self, prompt: &ScriptPrompt<'_>) -> Result<String>;
}

pub type DynClassifier = Arc<dyn BillClassifier>;
pub type DynScriptWriter = Arc<dyn ScriptWriter>;

/// Factory: `AI_TEST_MODE=mock` selects the mock, otherwise Anthropic. A missing
/// API key is not an error here; it surfaces on the first call.
pub fn build_from_config(cfg: &AppConfig) -> (DynClassifier, DynScriptWriter) {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        tracing::info!(target: "ai", "using mock language model");
        let mock = Arc::new(MockAi::default());
        return (mock.clone(), mock);
    }
    let client = Arc::new(AnthropicClient::from_config(cfg));
    (client.clone(), client)
}
