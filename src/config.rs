// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::cache::store::DEFAULT_CAPACITY_BYTES;

pub const ENV_CONFIG_PATH: &str = "CIVIC_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/civic.toml";

pub const ENV_OPEN_STATES_API_KEY: &str = "OPEN_STATES_API_KEY";
pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Upstream cost cap on bills per classification call.
pub const MAX_CLASSIFY_BATCH: usize = 20;

/// Upper bound on the recent-bill look-back window (about ten years).
pub const MAX_RECENT_BILL_DAYS: i64 = 3650;

fn default_jurisdiction() -> String {
    "California".to_string()
}
fn default_open_states_base_url() -> String {
    "https://v3.openstates.org".to_string()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_batch_limit() -> usize {
    MAX_CLASSIFY_BATCH
}
fn default_ttl_days() -> u64 {
    7
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/civic")
}
fn default_capacity() -> usize {
    DEFAULT_CAPACITY_BYTES
}
fn default_recent_days() -> i64 {
    30
}
fn default_per_page() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_jurisdiction")]
    pub jurisdiction: String,
    #[serde(default = "default_open_states_base_url")]
    pub open_states_base_url: String,
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Clamped to 1..=20.
    #[serde(default = "default_batch_limit")]
    pub classify_batch_limit: usize,
    #[serde(default = "default_ttl_days")]
    pub cache_ttl_days: u64,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_capacity")]
    pub cache_capacity_bytes: usize,
    #[serde(default = "default_recent_days")]
    pub recent_bill_days: i64,
    #[serde(default = "default_per_page")]
    pub bills_per_page: u32,

    /// Credentials only ever come from the environment.
    #[serde(skip)]
    pub open_states_api_key: Option<String>,
    #[serde(skip)]
    pub anthropic_api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jurisdiction: default_jurisdiction(),
            open_states_base_url: default_open_states_base_url(),
            anthropic_base_url: default_anthropic_base_url(),
            model: default_model(),
            classify_batch_limit: default_batch_limit(),
            cache_ttl_days: default_ttl_days(),
            cache_dir: default_cache_dir(),
            cache_capacity_bytes: default_capacity(),
            recent_bill_days: default_recent_days(),
            bills_per_page: default_per_page(),
            open_states_api_key: None,
            anthropic_api_key: None,
        }
    }
}

impl AppConfig {
    /// Load using env var + fallbacks, then pull credentials from the environment:
    /// 1) $CIVIC_CONFIG_PATH (must exist if set)
    /// 2) config/civic.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                Self::load_from_file(default_path)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: AppConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        self.open_states_api_key = non_empty_env(ENV_OPEN_STATES_API_KEY);
        self.anthropic_api_key = non_empty_env(ENV_ANTHROPIC_API_KEY);
    }

    fn sanitize(&mut self) {
        self.classify_batch_limit = self.classify_batch_limit.clamp(1, MAX_CLASSIFY_BATCH);
        self.bills_per_page = self.bills_per_page.clamp(1, 20);
        if self.cache_ttl_days == 0 {
            self.cache_ttl_days = default_ttl_days();
        }
        if self.recent_bill_days <= 0 {
            self.recent_bill_days = default_recent_days();
        }
        self.recent_bill_days = self.recent_bill_days.min(MAX_RECENT_BILL_DAYS);
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_days * 24 * 60 * 60)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
