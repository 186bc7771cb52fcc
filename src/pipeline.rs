//! End-to-end recommendation flow: recent bills from the gateway, classified
//! and ranked for one preference set; call scripts for a chosen bill.

use std::sync::Arc;

use crate::analysis::{AnalyzedBill, Stance};
use crate::bill::Bill;
use crate::classify::ClassificationOrchestrator;
use crate::error::Result;
use crate::gateway::{BillsQuery, LegislativeData};
use crate::geo::ZipCode;
use crate::preferences::PreferenceSet;
use crate::script::ScriptOrchestrator;

pub struct Pipeline {
    gateway: Arc<dyn LegislativeData>,
    classifier: Arc<ClassificationOrchestrator>,
    scripts: Arc<ScriptOrchestrator>,
    recent_days: i64,
    per_page: u32,
}

impl Pipeline {
    pub fn new(
        gateway: Arc<dyn LegislativeData>,
        classifier: Arc<ClassificationOrchestrator>,
        scripts: Arc<ScriptOrchestrator>,
    ) -> Self {
        Self {
            gateway,
            classifier,
            scripts,
            recent_days: 30,
            per_page: 20,
        }
    }

    pub fn with_window(mut self, recent_days: i64, per_page: u32) -> Self {
        self.recent_days = recent_days;
        self.per_page = per_page;
        self
    }

    pub fn gateway(&self) -> &Arc<dyn LegislativeData> {
        &self.gateway
    }

    pub fn classifier(&self) -> &Arc<ClassificationOrchestrator> {
        &self.classifier
    }

    pub fn scripts(&self) -> &Arc<ScriptOrchestrator> {
        &self.scripts
    }

    pub async fn recommend(&self, prefs: &PreferenceSet) -> Result<Vec<AnalyzedBill>> {
        let query = BillsQuery::recent(self.recent_days, self.per_page);
        let page = self.gateway.fetch_bills(&query).await?;
        if page.results.is_empty() {
            tracing::info!(target: "pipeline", "no recent bills");
            return Ok(Vec::new());
        }
        self.classifier.classify(&page.results, prefs).await
    }

    /// The script for `bill`, asking with the bill's current status label.
    pub async fn call_script(
        &self,
        bill: &Bill,
        prefs: &PreferenceSet,
        stance: Stance,
        zip: Option<&ZipCode>,
    ) -> String {
        self.scripts
            .get_script(bill, prefs, stance, Some(bill.status_label()), zip)
            .await
    }
}
