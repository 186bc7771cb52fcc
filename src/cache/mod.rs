//! Result cache for model output: per-bill analyses keyed by preference
//! fingerprint, and call scripts keyed by stance.
//!
//! Entries are JSON envelopes `{data, cachedAt, expiresAt}` (epoch ms). An entry
//! is valid while `now < expiresAt`; an expired entry reads as absent and is
//! removed on that read. Every failure path is soft: reads return `None`,
//! writes log and move on.

pub mod store;

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::analysis::{BillAnalysis, Stance};
use crate::clock::SharedClock;

pub use store::{FileStore, KvStore, MemoryStore, StoreError};

pub const CACHE_PREFIX: &str = "civicpulse_";
/// Bump when the envelope or payload shapes change; old entries then never match.
pub const SCHEMA_VERSION: &str = "v1_";
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const KIND_ANALYSIS: &str = "analysis";
const KIND_SCRIPT: &str = "script";

pub fn analysis_key(bill_id: &str, fingerprint: &str) -> String {
    format!("{CACHE_PREFIX}{SCHEMA_VERSION}{KIND_ANALYSIS}_{bill_id}_{fingerprint}")
}

pub fn script_key(bill_id: &str, stance: Stance) -> String {
    format!("{CACHE_PREFIX}{SCHEMA_VERSION}{KIND_SCRIPT}_{bill_id}_{stance}")
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    data: T,
    cached_at: i64,
    expires_at: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub analysis_count: usize,
    pub script_count: usize,
    /// Bytes across keys and values under the cache prefix.
    pub total_size: usize,
}

pub struct ResultCache {
    store: Arc<dyn KvStore>,
    clock: SharedClock,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KvStore>, clock: SharedClock) -> Self {
        Self::with_ttl(store, clock, DEFAULT_TTL)
    }

    pub fn with_ttl(store: Arc<dyn KvStore>, clock: SharedClock, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub fn in_memory(clock: SharedClock) -> Self {
        Self::new(Arc::new(MemoryStore::new()), clock)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        let env: Envelope<T> = match serde_json::from_str(&raw) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(target: "cache", %key, error = %e, "undecodable entry treated as miss");
                return None;
            }
        };
        if self.clock.now_ms() >= env.expires_at {
            self.store.remove(key);
            tracing::debug!(target: "cache", %key, "expired entry evicted");
            return None;
        }
        Some(env.data)
    }

    /// Never fails; a rejected write is logged and counted.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let now = self.clock.now_ms();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let env = Envelope {
            data: value,
            cached_at: now,
            expires_at: now.saturating_add(ttl_ms),
        };
        let json = match serde_json::to_string(&env) {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!(target: "cache", %key, error = %e, "failed to encode entry");
                return;
            }
        };
        if let Err(e) = self.store.set(key, json) {
            counter!("cache_write_failures_total").increment(1);
            tracing::warn!(target: "cache", %key, error = %e, "failed to cache");
        }
    }

    /// Removes every entry under the cache prefix. Returns how many were removed.
    pub fn clear_all(&self) -> usize {
        let keys: Vec<String> = self
            .store
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(CACHE_PREFIX))
            .collect();
        for k in &keys {
            self.store.remove(k);
        }
        tracing::info!(target: "cache", removed = keys.len(), "cache cleared");
        keys.len()
    }

    pub fn stats(&self) -> CacheStats {
        let analysis_tag = format!("{KIND_ANALYSIS}_");
        let script_tag = format!("{KIND_SCRIPT}_");
        let mut stats = CacheStats::default();
        for key in self.store.keys() {
            if !key.starts_with(CACHE_PREFIX) {
                continue;
            }
            if let Some(v) = self.store.get(&key) {
                stats.total_size += key.len() + v.len();
            }
            if key.contains(&analysis_tag) {
                stats.analysis_count += 1;
            }
            if key.contains(&script_tag) {
                stats.script_count += 1;
            }
        }
        stats
    }

    pub fn get_analysis(&self, bill_id: &str, fingerprint: &str) -> Option<BillAnalysis> {
        let hit = self.get::<BillAnalysis>(&analysis_key(bill_id, fingerprint));
        record_lookup(KIND_ANALYSIS, hit.is_some());
        hit
    }

    pub fn set_analysis(&self, fingerprint: &str, analysis: &BillAnalysis) {
        self.set(&analysis_key(&analysis.bill_id, fingerprint), analysis, self.ttl);
    }

    pub fn get_script(&self, bill_id: &str, stance: Stance) -> Option<String> {
        let hit = self.get::<String>(&script_key(bill_id, stance));
        record_lookup(KIND_SCRIPT, hit.is_some());
        hit
    }

    pub fn set_script(&self, bill_id: &str, stance: Stance, script: &str) {
        self.set(&script_key(bill_id, stance), &script, self.ttl);
    }
}

fn record_lookup(kind: &'static str, hit: bool) {
    if hit {
        counter!("cache_hits_total", "kind" => kind).increment(1);
    } else {
        counter!("cache_misses_total", "kind" => kind).increment(1);
    }
}
