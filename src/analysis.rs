//! Classification results and the ranking applied to them.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bill::Bill;
use crate::error::CivicError;

/// Inferred alignment between a bill and the user's positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Support,
    Oppose,
    Engage,
}

impl Recommendation {
    /// Ranking weight: support > oppose > engage.
    pub fn priority(self) -> u8 {
        match self {
            Self::Support => 3,
            Self::Oppose => 2,
            Self::Engage => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Oppose => "oppose",
            Self::Engage => "engage",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The side a caller takes on the phone. `engage` bills have no call stance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Support,
    Oppose,
}

impl Stance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Oppose => "oppose",
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<Recommendation> for Stance {
    type Error = CivicError;
    fn try_from(r: Recommendation) -> Result<Self, Self::Error> {
        match r {
            Recommendation::Support => Ok(Stance::Support),
            Recommendation::Oppose => Ok(Stance::Oppose),
            Recommendation::Engage => Err(CivicError::validation(
                "recommendation must be 'support' or 'oppose'",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillAnalysis {
    pub bill_id: String,
    pub recommendation: Recommendation,
    /// In `[0, 1]`; clamped on decode from the model.
    pub confidence: f32,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub relevant_issues: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl BillAnalysis {
    pub fn clamped(mut self) -> Self {
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }
}

/// A bill joined with its analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedBill {
    pub bill: Bill,
    pub analysis: BillAnalysis,
}

impl AnalyzedBill {
    pub fn recommendation(&self) -> Recommendation {
        self.analysis.recommendation
    }
}

fn rank_order(a: &BillAnalysis, b: &BillAnalysis) -> Ordering {
    b.recommendation
        .priority()
        .cmp(&a.recommendation.priority())
        .then_with(|| b.confidence.total_cmp(&a.confidence))
}

/// Recommendation priority descending, then confidence descending. Stable.
pub fn rank(items: &mut [AnalyzedBill]) {
    items.sort_by(|a, b| rank_order(&a.analysis, &b.analysis));
}
