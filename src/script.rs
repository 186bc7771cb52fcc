//! Call-script orchestrator and the presentation helpers for script text.

use std::sync::Arc;

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ai::{DynScriptWriter, ScriptPrompt};
use crate::analysis::Stance;
use crate::bill::Bill;
use crate::cache::ResultCache;
use crate::geo::ZipCode;
use crate::preferences::PreferenceSet;

const ZIP_PLACEHOLDER: &str = "[YOUR ZIP CODE]";

pub struct ScriptOrchestrator {
    cache: Arc<ResultCache>,
    writer: DynScriptWriter,
    jurisdiction: String,
}

impl ScriptOrchestrator {
    pub fn new(cache: Arc<ResultCache>, writer: DynScriptWriter, jurisdiction: impl Into<String>) -> Self {
        Self {
            cache,
            writer,
            jurisdiction: jurisdiction.into(),
        }
    }

    /// Never fails: a cached script, a fresh one, or the local template.
    /// Only fresh scripts are cached.
    pub async fn get_script(
        &self,
        bill: &Bill,
        prefs: &PreferenceSet,
        stance: Stance,
        bill_status: Option<&str>,
        zip: Option<&ZipCode>,
    ) -> String {
        if let Some(hit) = self.cache.get_script(&bill.id, stance) {
            return hit;
        }

        let prompt = ScriptPrompt {
            bill,
            preferences: prefs,
            stance,
            bill_status,
            jurisdiction: &self.jurisdiction,
        };
        match self.writer.write_script(&prompt).await {
            Ok(script) => {
                self.cache.set_script(&bill.id, stance, &script);
                script
            }
            Err(e) => {
                counter!("script_fallbacks_total").increment(1);
                tracing::warn!(target: "script", bill_id = %bill.id, error = %e, "script generation failed, using template");
                fallback_script(&bill.identifier, stance, zip)
            }
        }
    }
}

pub fn fallback_script(identifier: &str, stance: Stance, zip: Option<&ZipCode>) -> String {
    let zip = zip.map(ZipCode::as_str).unwrap_or(ZIP_PLACEHOLDER);
    format!(
        "Hi, my name is [YOUR NAME] and I'm a constituent from {zip}. I'm calling about {identifier}. I {stance} this bill. Thank you for your time."
    )
}

// Longest first so the alternation prefers "urge you to support" over "I support".
static BOLD_PHRASES: Lazy<Regex> = Lazy::new(|| {
    let mut phrases = vec![
        "my support",
        "my opposition",
        "I support",
        "I oppose",
        "in support of",
        "in opposition to",
        "strongly support",
        "strongly oppose",
        "vote yes",
        "vote no",
        "urge you to support",
        "urge you to oppose",
        "asking you to support",
        "asking you to oppose",
        "please support",
        "please oppose",
        "support this bill",
        "oppose this bill",
    ];
    phrases.sort_by_key(|p| std::cmp::Reverse(p.len()));
    let alternation = phrases
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("static phrase pattern")
});

/// Paragraph break after each sentence and `**bold**` around position phrases.
pub fn format_script(script: &str) -> String {
    let spaced = script.replace(". ", ".\n\n").replace("? ", "?\n\n");
    BOLD_PHRASES
        .replace_all(spaced.trim(), "**$0**")
        .into_owned()
}

pub fn strip_bold(script: &str) -> String {
    script.replace("**", "")
}
