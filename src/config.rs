//! Configuration management for the `Kidson` application
//!
//! Runtime settings come from environment variables with sensible defaults,
//! matching how the proxy is deployed. Scoring and relaxation constants that
//! are empirically tuned live here as named values so they can be adjusted
//! without touching engine or filter logic.

use crate::KidsonError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Root configuration structure for the `Kidson` application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KidsonConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Naver open-API credentials
    pub naver: NaverConfig,
    /// Optional AI suitability classifier settings
    pub classifier: ClassifierConfig,
    /// Search/enrichment limits and radius relaxation policy
    pub search: SearchConfig,
    /// Cache TTLs and capacity bounds
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaverConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Master switch; off unless `AI_CLASSIFIER_ENABLED=1`
    #[serde(default)]
    pub enabled: bool,
    pub api_key: Option<String>,
    #[serde(default = "default_classifier_model")]
    pub model: String,
    #[serde(default = "default_classifier_base_url")]
    pub base_url: String,
    /// Deadline for the batched classification call
    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,
    /// A negative verdict below this confidence is ignored
    #[serde(default = "default_classifier_min_confidence")]
    pub min_confidence: f64,
    /// Maximum candidates submitted per batch
    #[serde(default = "default_classifier_max_items")]
    pub max_items: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Places enriched with details per request
    #[serde(default = "default_max_detail_items")]
    pub max_detail_items: usize,
    /// Normalized places returned per request
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Result cap for secondary web-search lookups
    #[serde(default = "default_web_lookup_display")]
    pub web_lookup_display: usize,
    /// Query variants issued per base query (area hints included)
    #[serde(default = "default_search_variants_limit")]
    pub search_variants_limit: usize,
    /// Strict radius gate: requested radius plus this padding
    #[serde(default = "default_radius_padding_km")]
    pub radius_padding_km: f64,
    /// Relaxed radius gate: requested radius plus this extra
    #[serde(default = "default_relaxed_radius_extra_km")]
    pub relaxed_radius_extra_km: f64,
    /// Absolute cap on the relaxed radius
    #[serde(default = "default_relaxed_radius_cap_km")]
    pub relaxed_radius_cap_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_place_lookup_ttl_secs")]
    pub place_lookup_ttl_secs: u64,
    #[serde(default = "default_place_lookup_capacity")]
    pub place_lookup_capacity: usize,
    #[serde(default = "default_ai_decision_ttl_secs")]
    pub ai_decision_ttl_secs: u64,
    #[serde(default = "default_ai_decision_capacity")]
    pub ai_decision_capacity: usize,
}

// Default value functions
fn default_port() -> u16 {
    8787
}

fn default_classifier_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_classifier_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_classifier_timeout_ms() -> u64 {
    12_000
}

fn default_classifier_min_confidence() -> f64 {
    0.55
}

fn default_classifier_max_items() -> usize {
    20
}

fn default_max_detail_items() -> usize {
    12
}

fn default_max_results() -> usize {
    30
}

fn default_web_lookup_display() -> usize {
    5
}

fn default_search_variants_limit() -> usize {
    3
}

fn default_radius_padding_km() -> f64 {
    0.8
}

fn default_relaxed_radius_extra_km() -> f64 {
    3.0
}

fn default_relaxed_radius_cap_km() -> f64 {
    25.0
}

fn default_place_lookup_ttl_secs() -> u64 {
    30 * 60
}

fn default_place_lookup_capacity() -> usize {
    500
}

fn default_ai_decision_ttl_secs() -> u64 {
    6 * 60 * 60
}

fn default_ai_decision_capacity() -> usize {
    1000
}

impl Default for KidsonConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: default_port(),
            },
            naver: NaverConfig {
                client_id: String::new(),
                client_secret: String::new(),
            },
            classifier: ClassifierConfig::default(),
            search: SearchConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            model: default_classifier_model(),
            base_url: default_classifier_base_url(),
            timeout_ms: default_classifier_timeout_ms(),
            min_confidence: default_classifier_min_confidence(),
            max_items: default_classifier_max_items(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_detail_items: default_max_detail_items(),
            max_results: default_max_results(),
            web_lookup_display: default_web_lookup_display(),
            search_variants_limit: default_search_variants_limit(),
            radius_padding_km: default_radius_padding_km(),
            relaxed_radius_extra_km: default_relaxed_radius_extra_km(),
            relaxed_radius_cap_km: default_relaxed_radius_cap_km(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            place_lookup_ttl_secs: default_place_lookup_ttl_secs(),
            place_lookup_capacity: default_place_lookup_capacity(),
            ai_decision_ttl_secs: default_ai_decision_ttl_secs(),
            ai_decision_capacity: default_ai_decision_capacity(),
        }
    }
}

impl ClassifierConfig {
    /// Classification runs only when switched on and credentialed
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.enabled
            && self.api_key.as_deref().is_some_and(|k| !k.is_empty())
            && !self.model.is_empty()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

impl KidsonConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = read_env("PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| KidsonError::config(format!("Invalid PORT value '{port}'")))?;
        }

        config.naver.client_id = read_env("NAVER_SEARCH_CLIENT_ID").unwrap_or_default();
        config.naver.client_secret = read_env("NAVER_SEARCH_CLIENT_SECRET").unwrap_or_default();

        config.classifier.enabled = read_env("AI_CLASSIFIER_ENABLED").as_deref() == Some("1");
        config.classifier.api_key = read_env("OPENAI_API_KEY");
        if let Some(model) = read_env("OPENAI_MODEL") {
            config.classifier.model = model;
        }
        if let Some(base_url) = read_env("OPENAI_BASE_URL") {
            config.classifier.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = read_env("AI_CLASSIFIER_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse::<u64>() {
                if ms > 0 {
                    config.classifier.timeout_ms = ms;
                }
            }
        }
        if let Some(raw) = read_env("AI_CLASSIFIER_MIN_CONFIDENCE") {
            if let Ok(value) = raw.parse::<f64>() {
                config.classifier.min_confidence = value.clamp(0.0, 1.0);
            }
        }
        if let Some(raw) = read_env("AI_CLASSIFIER_MAX_ITEMS") {
            if let Ok(value) = raw.parse::<usize>() {
                config.classifier.max_items = value.max(1);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        if self.naver.client_id.is_empty() != self.naver.client_secret.is_empty() {
            return Err(KidsonError::config(
                "NAVER_SEARCH_CLIENT_ID and NAVER_SEARCH_CLIENT_SECRET must be set together",
            )
            .into());
        }

        if self.classifier.enabled && self.classifier.api_key.is_none() {
            tracing::warn!("AI_CLASSIFIER_ENABLED=1 but OPENAI_API_KEY is missing; skipping AI classification");
        }

        if !(0.0..=1.0).contains(&self.classifier.min_confidence) {
            return Err(
                KidsonError::config("Classifier min confidence must be within [0, 1]").into(),
            );
        }

        if self.search.max_results == 0 || self.search.max_detail_items == 0 {
            return Err(KidsonError::config("Search result caps must be positive").into());
        }

        if self.search.relaxed_radius_cap_km
            < self.search.radius_padding_km.max(self.search.relaxed_radius_extra_km)
        {
            return Err(KidsonError::config(
                "Relaxed radius cap must cover the padding and extra margins",
            )
            .into());
        }

        Ok(())
    }
}

fn read_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
