//! Configuration for HireStream Core.
//!
//! All values have sensible defaults and can be overridden from the
//! environment with the `HIRESTREAM` prefix and `__` as the section
//! separator, e.g. `HIRESTREAM__AI__BREAKER_THRESHOLD=10`.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub producer: ProducerConfig,
    #[serde(default)]
    pub consumers: ConsumersConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from the environment (.env file honored).
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("HIRESTREAM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Broker
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Maximum messages held per queue before publishes are rejected.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,
    /// Poll interval for consumers waiting on an empty queue.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_max_queue_depth() -> usize {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    25
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_queue_depth: default_max_queue_depth(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Producer
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Publish attempts before giving up (counting the first).
    #[serde(default = "default_publish_attempts")]
    pub max_attempts: u32,
    /// First retry delay.
    #[serde(default = "default_publish_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Backoff multiplier between attempts.
    #[serde(default = "default_publish_multiplier")]
    pub multiplier: f64,
    /// Retry delay ceiling.
    #[serde(default = "default_publish_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_publish_attempts() -> u32 {
    3
}

fn default_publish_initial_delay_ms() -> u64 {
    1_000
}

fn default_publish_multiplier() -> f64 {
    2.0
}

fn default_publish_max_delay_ms() -> u64 {
    10_000
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_publish_attempts(),
            initial_delay_ms: default_publish_initial_delay_ms(),
            multiplier: default_publish_multiplier(),
            max_delay_ms: default_publish_max_delay_ms(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Consumers
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-consumer concurrency limits (max in-flight messages each).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumersConfig {
    #[serde(default = "default_resume_parse_concurrency")]
    pub resume_parse: usize,
    #[serde(default = "default_candidate_score_concurrency")]
    pub candidate_score: usize,
    #[serde(default = "default_application_screen_concurrency")]
    pub application_screen: usize,
    #[serde(default = "default_interview_evaluate_concurrency")]
    pub interview_evaluate: usize,
    #[serde(default = "default_notification_concurrency")]
    pub notification: usize,
}

fn default_resume_parse_concurrency() -> usize {
    5
}

fn default_candidate_score_concurrency() -> usize {
    3
}

fn default_application_screen_concurrency() -> usize {
    3
}

fn default_interview_evaluate_concurrency() -> usize {
    3
}

fn default_notification_concurrency() -> usize {
    2
}

impl Default for ConsumersConfig {
    fn default() -> Self {
        Self {
            resume_parse: default_resume_parse_concurrency(),
            candidate_score: default_candidate_score_concurrency(),
            application_screen: default_application_screen_concurrency(),
            interview_evaluate: default_interview_evaluate_concurrency(),
            notification: default_notification_concurrency(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AI Gateway
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Provider call attempts before the gateway degrades or errors.
    #[serde(default = "default_ai_attempts")]
    pub max_attempts: u32,
    /// First retry delay for provider calls.
    #[serde(default = "default_ai_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Consecutive failures before the circuit breaker opens.
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: u32,
    /// How long the breaker stays open before a half-open probe.
    #[serde(default = "default_breaker_recovery_secs")]
    pub breaker_recovery_secs: u64,
    /// Retry hint attached to blocking-operation failures.
    #[serde(default = "default_retry_hint_secs")]
    pub retry_hint_secs: u64,
    /// Texts are truncated to this many characters before embedding.
    #[serde(default = "default_max_embedding_chars")]
    pub max_embedding_chars: usize,
}

fn default_ai_attempts() -> u32 {
    3
}

fn default_ai_initial_delay_ms() -> u64 {
    500
}

fn default_breaker_threshold() -> u32 {
    5
}

fn default_breaker_recovery_secs() -> u64 {
    30
}

fn default_retry_hint_secs() -> u64 {
    30
}

fn default_max_embedding_chars() -> usize {
    8_000
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_ai_attempts(),
            initial_delay_ms: default_ai_initial_delay_ms(),
            breaker_threshold: default_breaker_threshold(),
            breaker_recovery_secs: default_breaker_recovery_secs(),
            retry_hint_secs: default_retry_hint_secs(),
            max_embedding_chars: default_max_embedding_chars(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Vector Store
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Embedding dimension; all stored vectors must match it.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// How many active jobs are scored when no target job is given.
    #[serde(default = "default_score_job_limit")]
    pub score_job_limit: usize,
}

fn default_dimension() -> usize {
    1_536
}

fn default_score_job_limit() -> usize {
    5
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            score_job_limit: default_score_job_limit(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Cache
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default entry TTL in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub default_ttl_secs: u64,
    /// Score-entry TTL in seconds (24h).
    #[serde(default = "default_score_ttl_secs")]
    pub score_ttl_secs: u64,
    /// Maximum entries per region before oldest are evicted.
    #[serde(default = "default_max_entries")]
    pub max_entries_per_region: usize,
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_score_ttl_secs() -> u64 {
    86_400
}

fn default_max_entries() -> usize {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_cache_ttl_secs(),
            score_ttl_secs: default_score_ttl_secs(),
            max_entries_per_region: default_max_entries(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Telemetry
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default log filter when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON logs instead of human-readable ones.
    #[serde(default)]
    pub json_logs: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
