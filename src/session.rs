//! Single-user session state: zip, preferences, the current deck, and a
//! last-request-wins guard around recommendation refreshes.

use crate::analysis::{AnalyzedBill, Stance};
use crate::browse::{BillDeck, BrowsingState};
use crate::clock::SharedClock;
use crate::error::{CivicError, Result};
use crate::geo::ZipCode;
use crate::issues;
use crate::pipeline::Pipeline;
use crate::preferences::{Position, PreferenceSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// Issued by `begin_refresh`; only the most recent ticket may apply results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    Stale,
}

pub struct Session {
    zip: ZipCode,
    preferences: PreferenceSet,
    load: LoadState,
    deck: BillDeck,
    last_issued: u64,
}

impl Session {
    pub fn new(zip: ZipCode, clock: SharedClock) -> Self {
        Self {
            zip,
            preferences: PreferenceSet::new(),
            load: LoadState::Idle,
            deck: BillDeck::new(Vec::new(), BrowsingState::default(), clock),
            last_issued: 0,
        }
    }

    pub fn zip(&self) -> &ZipCode {
        &self.zip
    }

    pub fn set_zip(&mut self, zip: ZipCode) {
        self.zip = zip;
    }

    pub fn preferences(&self) -> &PreferenceSet {
        &self.preferences
    }

    /// Records a position on a catalog issue. Does not refetch.
    pub fn set_preference(&mut self, issue_id: &str, position: Position) -> Result<()> {
        if issues::issue(issue_id).is_none() {
            return Err(CivicError::validation(format!("unknown issue: {issue_id}")));
        }
        self.preferences.set(issue_id, position);
        Ok(())
    }

    pub fn clear_preference(&mut self, issue_id: &str) -> Option<Position> {
        self.preferences.remove(issue_id)
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn deck(&self) -> &BillDeck {
        &self.deck
    }

    pub fn deck_mut(&mut self) -> &mut BillDeck {
        &mut self.deck
    }

    /// Starts a run against a snapshot of the current preferences.
    pub fn begin_refresh(&mut self) -> (RunTicket, PreferenceSet) {
        self.last_issued += 1;
        self.load = LoadState::Loading;
        (RunTicket(self.last_issued), self.preferences.clone())
    }

    pub fn is_current(&self, ticket: RunTicket) -> bool {
        ticket.0 == self.last_issued
    }

    /// Applies a run's outcome unless a newer run has started since.
    pub fn finish_refresh(
        &mut self,
        ticket: RunTicket,
        result: Result<Vec<AnalyzedBill>>,
    ) -> RefreshOutcome {
        if !self.is_current(ticket) {
            tracing::debug!(target: "session", ticket = ticket.0, latest = self.last_issued, "stale run ignored");
            return RefreshOutcome::Stale;
        }
        match result {
            Ok(items) => {
                tracing::info!(target: "session", zip = %self.zip.anon_id(), bills = items.len(), "recommendations ready");
                self.deck.replace_items(items);
                self.load = LoadState::Ready;
            }
            Err(e) => {
                tracing::warn!(target: "session", zip = %self.zip.anon_id(), error = %e, "recommendations failed");
                self.load = LoadState::Failed(e.to_string());
            }
        }
        RefreshOutcome::Applied
    }

    pub async fn refresh(&mut self, pipeline: &Pipeline) -> RefreshOutcome {
        let (ticket, prefs) = self.begin_refresh();
        let result = pipeline.recommend(&prefs).await;
        self.finish_refresh(ticket, result)
    }

    /// Script for the bill currently on screen, or `None` when nothing is shown.
    pub async fn script_for_current(&self, pipeline: &Pipeline, stance: Stance) -> Option<String> {
        let current = self.deck.current()?;
        Some(
            pipeline
                .call_script(&current.bill, &self.preferences, stance, Some(&self.zip))
                .await,
        )
    }
}
