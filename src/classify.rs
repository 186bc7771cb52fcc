//! Classification orchestrator: cache partition, batched model calls, join,
//! rank.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;

use crate::ai::DynClassifier;
use crate::analysis::{rank, AnalyzedBill, BillAnalysis};
use crate::bill::Bill;
use crate::cache::ResultCache;
use crate::config::MAX_CLASSIFY_BATCH;
use crate::error::Result;
use crate::preferences::PreferenceSet;

pub struct ClassificationOrchestrator {
    cache: Arc<ResultCache>,
    classifier: DynClassifier,
    batch_limit: usize,
}

impl ClassificationOrchestrator {
    pub fn new(cache: Arc<ResultCache>, classifier: DynClassifier) -> Self {
        Self::with_batch_limit(cache, classifier, MAX_CLASSIFY_BATCH)
    }

    /// `batch_limit` is clamped to 1..=20.
    pub fn with_batch_limit(
        cache: Arc<ResultCache>,
        classifier: DynClassifier,
        batch_limit: usize,
    ) -> Self {
        Self {
            cache,
            classifier,
            batch_limit: batch_limit.clamp(1, MAX_CLASSIFY_BATCH),
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Returns the bills that have an analysis, ranked. Bills the model did not
    /// answer for are dropped. Any failed model call fails the whole run;
    /// batches that completed before it stay cached.
    pub async fn classify(
        &self,
        bills: &[Bill],
        prefs: &PreferenceSet,
    ) -> Result<Vec<AnalyzedBill>> {
        if bills.is_empty() {
            return Ok(Vec::new());
        }
        let fingerprint = prefs.fingerprint();

        let mut found: HashMap<String, BillAnalysis> = HashMap::new();
        let mut uncached: Vec<Bill> = Vec::new();
        for bill in bills {
            if found.contains_key(&bill.id) {
                continue;
            }
            match self.cache.get_analysis(&bill.id, &fingerprint) {
                Some(a) => {
                    found.insert(bill.id.clone(), a);
                }
                None => {
                    if !uncached.iter().any(|b| b.id == bill.id) {
                        uncached.push(bill.clone());
                    }
                }
            }
        }
        let cached_count = found.len();

        for chunk in uncached.chunks(self.batch_limit) {
            counter!("classify_calls_total").increment(1);
            tracing::debug!(
                target: "classify",
                provider = self.classifier.provider_name(),
                batch = chunk.len(),
                "classifying batch"
            );
            let analyses = self.classifier.classify_bills(chunk, prefs).await?;
            for analysis in analyses {
                // Answers for bills outside this chunk are ignored; duplicates: last wins.
                if !chunk.iter().any(|b| b.id == analysis.bill_id) {
                    tracing::warn!(target: "classify", bill_id = %analysis.bill_id, "analysis for unknown bill ignored");
                    continue;
                }
                self.cache.set_analysis(&fingerprint, &analysis);
                found.insert(analysis.bill_id.clone(), analysis);
            }
        }

        let mut out = Vec::with_capacity(found.len());
        let mut dropped = 0usize;
        for bill in bills {
            match found.remove(&bill.id) {
                Some(analysis) => out.push(AnalyzedBill {
                    bill: bill.clone(),
                    analysis,
                }),
                None if out.iter().any(|a: &AnalyzedBill| a.bill.id == bill.id) => {}
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            counter!("classify_dropped_total").increment(dropped as u64);
            tracing::warn!(target: "classify", dropped, "bills without analysis were dropped");
        }

        rank(&mut out);
        tracing::info!(
            target: "classify",
            total = bills.len(),
            cached = cached_count,
            classified = uncached.len(),
            returned = out.len(),
            "classification complete"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::BillClassifier;
    use crate::analysis::Recommendation;
    use crate::clock::ManualClock;
    use crate::error::CivicError;
    use crate::preferences::Position;
    use std::sync::Mutex;

    /// Answers from a fixed table; records the size of every batch.
    #[derive(Default)]
    struct Scripted {
        answers: HashMap<String, (Recommendation, f32)>,
        batches: Mutex<Vec<usize>>,
        fail: bool,
        extra: Option<String>,
        /// Appended after the regular answers, possibly repeating an id.
        trailing: Option<BillAnalysis>,
    }

    #[async_trait::async_trait]
    impl BillClassifier for Scripted {
        async fn classify_bills(
            &self,
            bills: &[Bill],
            _prefs: &PreferenceSet,
        ) -> Result<Vec<BillAnalysis>> {
            self.batches
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(bills.len());
            if self.fail {
                return Err(CivicError::ExternalCall("boom".into()));
            }
            let mut out: Vec<BillAnalysis> = bills
                .iter()
                .filter_map(|b| {
                    self.answers.get(&b.id).map(|(r, c)| analysis(&b.id, *r, *c))
                })
                .collect();
            if let Some(extra) = &self.extra {
                out.push(analysis(extra, Recommendation::Support, 1.0));
            }
            out.extend(self.trailing.clone());
            Ok(out)
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn analysis(id: &str, rec: Recommendation, confidence: f32) -> BillAnalysis {
        BillAnalysis {
            bill_id: id.into(),
            recommendation: rec,
            confidence,
            summary: String::new(),
            relevant_issues: vec![],
            reasoning: String::new(),
        }
    }

    fn bills(n: usize) -> Vec<Bill> {
        (0..n)
            .map(|i| Bill {
                id: format!("b{i}"),
                identifier: format!("AB {i}"),
                ..Default::default()
            })
            .collect()
    }

    fn prefs() -> PreferenceSet {
        let mut p = PreferenceSet::new();
        p.set("rent-control", Position::new(2).unwrap());
        p
    }

    fn setup(classifier: Arc<Scripted>) -> ClassificationOrchestrator {
        let cache = Arc::new(ResultCache::in_memory(Arc::new(ManualClock::at(0))));
        ClassificationOrchestrator::new(cache, classifier)
    }

    #[tokio::test]
    async fn twenty_five_uncached_bills_go_out_in_two_batches() {
        let answers = (0..25)
            .map(|i| (format!("b{i}"), (Recommendation::Engage, 0.5)))
            .collect();
        let c = Arc::new(Scripted {
            answers,
            ..Default::default()
        });
        let orch = setup(c.clone());
        let out = orch.classify(&bills(25), &prefs()).await.unwrap();
        assert_eq!(out.len(), 25);
        assert_eq!(*c.batches.lock().unwrap(), vec![20, 5]);
    }

    #[tokio::test]
    async fn second_run_is_served_from_cache() {
        let answers = (0..3)
            .map(|i| (format!("b{i}"), (Recommendation::Support, 0.7)))
            .collect();
        let c = Arc::new(Scripted {
            answers,
            ..Default::default()
        });
        let orch = setup(c.clone());
        orch.classify(&bills(3), &prefs()).await.unwrap();
        let again = orch.classify(&bills(3), &prefs()).await.unwrap();
        assert_eq!(again.len(), 3);
        assert_eq!(c.batches.lock().unwrap().len(), 1);

        // A different preference set is a different partition.
        let mut other = prefs();
        other.set("rent-control", Position::new(-2).unwrap());
        orch.classify(&bills(3), &other).await.unwrap();
        assert_eq!(c.batches.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unanswered_bills_are_dropped_and_extras_ignored() {
        let answers = [
            ("b0".to_string(), (Recommendation::Engage, 0.99)),
            ("b2".to_string(), (Recommendation::Support, 0.4)),
        ]
        .into_iter()
        .collect();
        let c = Arc::new(Scripted {
            answers,
            extra: Some("stranger".into()),
            ..Default::default()
        });
        let orch = setup(c);
        let out = orch.classify(&bills(3), &prefs()).await.unwrap();
        let ids: Vec<&str> = out.iter().map(|a| a.bill.id.as_str()).collect();
        assert_eq!(ids, vec!["b2", "b0"]);
        assert!(orch
            .cache()
            .get_analysis("stranger", &prefs().fingerprint())
            .is_none());
    }

    #[tokio::test]
    async fn repeated_answer_for_a_bill_last_one_wins() {
        let c = Arc::new(Scripted {
            answers: [("b0".to_string(), (Recommendation::Engage, 0.2))]
                .into_iter()
                .collect(),
            trailing: Some(analysis("b0", Recommendation::Oppose, 0.9)),
            ..Default::default()
        });
        let orch = setup(c);
        let out = orch.classify(&bills(1), &prefs()).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].analysis, analysis("b0", Recommendation::Oppose, 0.9));
        assert_eq!(
            orch.cache().get_analysis("b0", &prefs().fingerprint()),
            Some(analysis("b0", Recommendation::Oppose, 0.9))
        );
    }

    #[tokio::test]
    async fn repeated_input_bill_is_classified_and_returned_once() {
        let answers = (0..2)
            .map(|i| (format!("b{i}"), (Recommendation::Support, 0.5)))
            .collect();
        let c = Arc::new(Scripted {
            answers,
            ..Default::default()
        });
        let orch = setup(c.clone());
        let mut input = bills(2);
        input.push(input[0].clone());
        let out = orch.classify(&input, &prefs()).await.unwrap();
        assert_eq!(*c.batches.lock().unwrap(), vec![2]);
        let ids: Vec<&str> = out.iter().map(|a| a.bill.id.as_str()).collect();
        assert_eq!(ids, vec!["b0", "b1"]);
    }

    #[tokio::test]
    async fn collaborator_failure_propagates() {
        let c = Arc::new(Scripted {
            fail: true,
            ..Default::default()
        });
        let orch = setup(c);
        let err = orch.classify(&bills(2), &prefs()).await.unwrap_err();
        assert!(matches!(err, CivicError::ExternalCall(_)));
    }

    #[tokio::test]
    async fn empty_input_makes_no_call() {
        let c = Arc::new(Scripted::default());
        let orch = setup(c.clone());
        assert!(orch.classify(&[], &prefs()).await.unwrap().is_empty());
        assert!(c.batches.lock().unwrap().is_empty());
    }
}
