//! Typed records for bills and legislators as returned by the Open States v3 API.
//!
//! Upstream payloads are deeply nested and most fields are optional; everything
//! here defaults instead of failing, and the fallbacks consumers need live on the
//! record itself.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize};

/// Shown when the latest action carries no known classification.
pub const DEFAULT_STATUS_LABEL: &str = "In Progress";

static STATUS_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("introduction", "Introduced"),
        ("filing", "Filed"),
        ("referral-committee", "In Committee"),
        ("committee-passage", "Passed Committee"),
        ("reading-1", "First Reading"),
        ("reading-2", "Second Reading"),
        ("reading-3", "Third Reading"),
        ("passage", "Passed"),
        ("failure", "Failed"),
        ("withdrawal", "Withdrawn"),
        ("substitution", "Substituted"),
        ("amendment-introduction", "Amended"),
        ("amendment-passage", "Amendment Passed"),
        ("executive-receipt", "Sent to Governor"),
        ("executive-signature", "Signed by Governor"),
        ("executive-veto", "Vetoed"),
        ("became-law", "Became Law"),
    ])
});

/// Open States sends explicit `null` for many blank fields; treat it like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Maps an action classification (e.g. `referral-committee`) to its display label.
pub fn status_label_for(classification: Option<&str>) -> &'static str {
    classification
        .and_then(|c| STATUS_LABELS.get(c).copied())
        .unwrap_or(DEFAULT_STATUS_LABEL)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub classification: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillAbstract {
    #[serde(default, deserialize_with = "null_as_default")]
    pub r#abstract: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub note: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrgRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub classification: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SponsorPerson {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub party: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sponsorship {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<SponsorPerson>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub primary: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub classification: String,
}

/// A bill as fetched for one pipeline run. Never mutated after decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub identifier: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<OrgRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_organization: Option<OrgRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub classification: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub abstracts: Vec<BillAbstract>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sponsorships: Vec<Sponsorship>,
    /// Ordered by legislative event; the last entry is the most recent.
    #[serde(default, deserialize_with = "null_as_default")]
    pub actions: Vec<BillAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_action_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_action_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_action_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openstates_url: Option<String>,
}

impl Bill {
    /// First non-empty abstract, falling back to the title.
    pub fn abstract_text(&self) -> &str {
        self.abstracts
            .iter()
            .map(|a| a.r#abstract.trim())
            .find(|a| !a.is_empty())
            .unwrap_or(&self.title)
    }

    pub fn latest_action(&self) -> Option<&BillAction> {
        self.actions.last()
    }

    pub fn latest_action_text(&self) -> &str {
        self.latest_action_description
            .as_deref()
            .or_else(|| self.latest_action().map(|a| a.description.as_str()))
            .unwrap_or("")
    }

    /// Display status derived from the most recent action's first classification.
    pub fn status_label(&self) -> &'static str {
        status_label_for(
            self.latest_action()
                .and_then(|a| a.classification.first())
                .map(String::as_str),
        )
    }

    pub fn primary_sponsors(&self) -> impl Iterator<Item = &str> + '_ {
        self.sponsorships
            .iter()
            .filter(|s| s.primary)
            .map(|s| s.name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default, deserialize_with = "null_as_default")]
    pub per_page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub max_page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_items: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillsPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<Bill>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentRole {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub org_classification: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub district: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Office {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub voice: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fax: String,
}

/// A sitting (or formerly sitting) legislator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Representative {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub party: String,
    #[serde(default)]
    pub current_role: Option<CurrentRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<OrgRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default)]
    pub capitol_office: Option<Office>,
    #[serde(default)]
    pub district_office: Option<Office>,
}

impl Representative {
    pub fn holds_office(&self) -> bool {
        self.current_role.is_some()
    }

    pub fn in_jurisdiction(&self, name: &str) -> bool {
        self.jurisdiction
            .as_ref()
            .is_some_and(|j| j.name.eq_ignore_ascii_case(name))
    }

    /// e.g. "Senator, District 11"; empty when the person holds no office.
    pub fn role_label(&self) -> String {
        match &self.current_role {
            Some(r) if r.district.is_empty() => r.title.clone(),
            Some(r) => format!("{}, District {}", r.title, r.district),
            None => String::new(),
        }
    }

    /// Office voice numbers, capitol first, blanks skipped.
    pub fn phone_numbers(&self) -> Vec<&str> {
        [&self.capitol_office, &self.district_office]
            .into_iter()
            .flatten()
            .map(|o| o.voice.trim())
            .filter(|v| !v.is_empty())
            .collect()
    }
}
