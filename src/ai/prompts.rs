//! Prompt text for the classification and script calls, plus the status → ask
//! table that shapes what a caller asks their legislator for.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::analysis::Stance;
use crate::bill::Bill;
use crate::preferences::PreferenceSet;

/// What to ask for, by legislative stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ask {
    KeepTracking,
    Committee,
    FloorVote,
    ImminentVote,
    OtherChamber,
    Generic,
}

static ASK_BY_STATUS: Lazy<HashMap<&'static str, Ask>> = Lazy::new(|| {
    HashMap::from([
        ("Introduced", Ask::KeepTracking),
        ("Filed", Ask::KeepTracking),
        ("In Committee", Ask::Committee),
        ("Passed Committee", Ask::FloorVote),
        ("First Reading", Ask::FloorVote),
        ("Second Reading", Ask::FloorVote),
        ("Third Reading", Ask::ImminentVote),
        ("Passed", Ask::OtherChamber),
    ])
});

/// The one-sentence request the script must contain.
pub fn specific_ask(status: Option<&str>, stance: Stance) -> String {
    let ask = status
        .and_then(|s| ASK_BY_STATUS.get(s).copied())
        .unwrap_or(Ask::Generic);
    let vote = match stance {
        Stance::Support => "vote YES",
        Stance::Oppose => "vote NO",
    };
    match (ask, stance) {
        (Ask::KeepTracking, _) => {
            format!("Please {stance} this bill as it moves through the legislative process.")
        }
        (Ask::Committee, Stance::Support) => {
            "Please support moving this bill out of committee.".to_string()
        }
        (Ask::Committee, Stance::Oppose) => {
            "Please oppose this bill in committee and prevent it from advancing.".to_string()
        }
        (Ask::FloorVote, _) => format!("Please {vote} on this bill when it comes to the floor."),
        (Ask::ImminentVote, _) => format!("I urge you to {vote} on this bill; the vote is imminent."),
        (Ask::OtherChamber, Stance::Support) => {
            "Please continue to champion this bill as it moves to the other chamber.".to_string()
        }
        (Ask::OtherChamber, Stance::Oppose) => {
            "Please work to stop this bill in the other chamber.".to_string()
        }
        (Ask::Generic, _) => format!("I'm asking you to {vote} on this bill."),
    }
}

#[derive(Serialize)]
struct BillDigest<'a> {
    id: &'a str,
    identifier: &'a str,
    title: &'a str,
    r#abstract: &'a str,
    subjects: &'a [String],
    #[serde(rename = "latestAction")]
    latest_action: &'a str,
}

pub fn classification_prompt(bills: &[Bill], prefs: &PreferenceSet, jurisdiction: &str) -> String {
    let digests: Vec<BillDigest<'_>> = bills
        .iter()
        .map(|b| BillDigest {
            id: &b.id,
            identifier: &b.identifier,
            title: &b.title,
            r#abstract: b
                .abstracts
                .first()
                .map(|a| a.r#abstract.as_str())
                .unwrap_or(""),
            subjects: &b.subject,
            latest_action: b.latest_action_text(),
        })
        .collect();
    let bills_json = serde_json::to_string_pretty(&digests).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are analyzing {jurisdiction} state bills to help a citizen understand which bills align with their policy preferences.

## User's Policy Positions

{profile}

## Bills to Analyze

{bills_json}

## Instructions

For each bill, analyze whether the user would likely support, oppose, or want to engage further with this bill based on their stated positions.

Respond with a JSON array containing an analysis object for each bill. Each object should have:
- "billId": the bill's id field
- "recommendation": one of "support", "oppose", or "engage" (use "engage" when the bill is relevant but the user's position isn't clear, or the bill has mixed implications)
- "confidence": a number from 0 to 1 indicating how confident you are in this recommendation
- "summary": a 1-2 sentence plain-language summary of what this bill does (avoid jargon)
- "relevantIssues": array of issue IDs from the user's preferences that this bill relates to
- "reasoning": a brief (1 sentence) explanation of why you made this recommendation based on the user's positions

Important guidelines:
- Be objective and base recommendations purely on the user's stated positions
- If a bill doesn't clearly relate to any of the user's stated issues, recommend "engage" with low confidence
- Write summaries that a non-expert could understand
- Consider the bill's actual likely effects, not just its stated intent

Respond ONLY with the JSON array, no other text."#,
        profile = prefs.user_profile(),
    )
}

/// Everything the script writer needs for one call.
#[derive(Debug, Clone)]
pub struct ScriptPrompt<'a> {
    pub bill: &'a Bill,
    pub preferences: &'a PreferenceSet,
    pub stance: Stance,
    pub bill_status: Option<&'a str>,
    pub jurisdiction: &'a str,
}

impl ScriptPrompt<'_> {
    pub fn render(&self) -> String {
        let abstract_text = self
            .bill
            .abstracts
            .first()
            .map(|a| a.r#abstract.as_str())
            .filter(|a| !a.trim().is_empty())
            .unwrap_or("No abstract available");
        format!(
            r#"Generate a brief, polite phone call script for a constituent calling their {jurisdiction} state legislator about this bill.

## Bill Information
- Identifier: {identifier}
- Title: {title}
- Abstract: {abstract_text}
- Current Status: {status}

## User's Position
The user wants to {stance} this bill.

## Specific Ask to Include
{ask}

## User's Values (for context)
{profile}

## Instructions
Write a script that:
1. Is 3-4 sentences maximum
2. Introduces the caller as a constituent
3. States their position clearly using phrases like "I support" or "I oppose"
4. Includes the SPECIFIC ASK provided above - this is the most important part
5. Gives ONE brief reason based on the bill's actual content
6. Thanks them for their time

Use placeholders [YOUR NAME] and [YOUR ZIP CODE] where appropriate.

Respond ONLY with the script text, no other formatting or explanation."#,
            jurisdiction = self.jurisdiction,
            identifier = self.bill.identifier,
            title = self.bill.title,
            status = self.bill_status.unwrap_or("Unknown"),
            stance = self.stance,
            ask = specific_ask(self.bill_status, self.stance),
            profile = self.preferences.user_profile(),
        )
    }
}

/// Strips a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_code_fence(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::Position;

    #[test]
    fn ask_table_covers_each_stage() {
        use Stance::*;
        assert_eq!(
            specific_ask(Some("In Committee"), Support),
            "Please support moving this bill out of committee."
        );
        assert_eq!(
            specific_ask(Some("In Committee"), Oppose),
            "Please oppose this bill in committee and prevent it from advancing."
        );
        assert_eq!(
            specific_ask(Some("Filed"), Oppose),
            "Please oppose this bill as it moves through the legislative process."
        );
        assert!(specific_ask(Some("Second Reading"), Support).contains("vote YES"));
        assert!(specific_ask(Some("Third Reading"), Oppose).contains("imminent"));
        assert!(specific_ask(Some("Passed"), Support).contains("other chamber"));
    }

    #[test]
    fn unknown_status_asks_generically() {
        assert_eq!(
            specific_ask(Some("Vetoed"), Stance::Oppose),
            "I'm asking you to vote NO on this bill."
        );
        assert_eq!(
            specific_ask(None, Stance::Support),
            "I'm asking you to vote YES on this bill."
        );
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```\n[]```"), "[]");
        assert_eq!(strip_code_fence("  [2] "), "[2]");
    }

    #[test]
    fn classification_prompt_embeds_bill_ids_and_profile() {
        let bills = vec![Bill {
            id: "ocd-bill/abc".into(),
            identifier: "AB 12".into(),
            title: "Tenant protections".into(),
            ..Default::default()
        }];
        let mut prefs = PreferenceSet::new();
        prefs.set("rent-control", Position::new(2).unwrap());
        let p = classification_prompt(&bills, &prefs, "California");
        assert!(p.contains("\"id\": \"ocd-bill/abc\""));
        assert!(p.contains("Expand rent protections"));
        assert!(p.starts_with("You are analyzing California state bills"));
    }

    #[test]
    fn script_prompt_includes_status_and_ask() {
        let bill = Bill {
            id: "b".into(),
            identifier: "SB 5".into(),
            title: "Water".into(),
            ..Default::default()
        };
        let prefs = PreferenceSet::new();
        let prompt = ScriptPrompt {
            bill: &bill,
            preferences: &prefs,
            stance: Stance::Support,
            bill_status: Some("Third Reading"),
            jurisdiction: "California",
        }
        .render();
        assert!(prompt.contains("Current Status: Third Reading"));
        assert!(prompt.contains("No abstract available"));
        assert!(prompt.contains("I urge you to vote YES"));
    }
}
