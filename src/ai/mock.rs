use super::prompts::{specific_ask, ScriptPrompt};
use super::{BillClassifier, ScriptWriter};
use crate::analysis::{BillAnalysis, Recommendation};
use crate::bill::Bill;
use crate::error::Result;
use crate::preferences::PreferenceSet;

/// Deterministic stand-in for the model. Every bill comes back as `engage`
/// at 0.5; scripts are assembled from the status ask.
#[derive(Debug, Clone, Default)]
pub struct MockAi;

#[async_trait::async_trait]
impl BillClassifier for MockAi {
    async fn classify_bills(
        &self,
        bills: &[Bill],
        prefs: &PreferenceSet,
    ) -> Result<Vec<BillAnalysis>> {
        if prefs.is_empty() {
            return Ok(Vec::new());
        }
        Ok(bills
            .iter()
            .map(|b| BillAnalysis {
                bill_id: b.id.clone(),
                recommendation: Recommendation::Engage,
                confidence: 0.5,
                summary: b.abstract_text().to_string(),
                relevant_issues: Vec::new(),
                reasoning: "Mock analysis".to_string(),
            })
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[async_trait::async_trait]
impl ScriptWriter for MockAi {
    async fn write_script(&self, prompt: &ScriptPrompt<'_>) -> Result<String> {
        Ok(format!(
            "Hi, my name is [YOUR NAME] and I'm a constituent from [YOUR ZIP CODE]. I {} {}. {} Thank you for your time.",
            prompt.stance,
            prompt.bill.identifier,
            specific_ask(prompt.bill_status, prompt.stance),
        ))
    }
}
