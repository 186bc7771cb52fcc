//! Static policy-issue catalog, embedded at compile time.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static CATALOG: Lazy<Vec<PolicyIssue>> = Lazy::new(|| {
    let raw = include_str!("../data/issues.json");
    serde_json::from_str::<Vec<PolicyIssue>>(raw).expect("valid issue catalog")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Housing,
    Environment,
    Economy,
    Safety,
    Social,
    Governance,
}

impl IssueCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Housing => "Housing & Urban Development",
            Self::Environment => "Environment & Infrastructure",
            Self::Economy => "Economy & Labor",
            Self::Safety => "Public Safety & Justice",
            Self::Social => "Social Policy",
            Self::Governance => "Governance",
        }
    }
}

/// One catalog entry. `left_label` is the pole at position -2, `right_label` at +2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyIssue {
    pub id: String,
    pub name: String,
    pub category: IssueCategory,
    pub left_label: String,
    pub right_label: String,
    pub description: String,
}

pub fn all() -> &'static [PolicyIssue] {
    CATALOG.as_slice()
}

pub fn issue(id: &str) -> Option<&'static PolicyIssue> {
    CATALOG.iter().find(|i| i.id == id)
}

pub fn by_category(category: IssueCategory) -> impl Iterator<Item = &'static PolicyIssue> {
    CATALOG.iter().filter(move |i| i.category == category)
}
