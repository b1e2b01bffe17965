use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub quota: QuotaConfig,
    pub ingest: IngestConfig,
    pub worker: WorkerConfig,
    pub llm: LlmConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            quota: QuotaConfig::from_env(),
            ingest: IngestConfig::from_env(),
            worker: WorkerConfig::from_env(),
            llm: LlmConfig::from_env(),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  server:  {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  quota:   daily={}, hourly={}, per_run_cap={}",
            self.quota.daily_limit,
            self.quota.hourly_limit,
            self.quota.per_run_cap
        );
        tracing::info!(
            "  ingest:  concurrency={}, dedup_window_days={}",
            self.ingest.fetch_concurrency,
            self.ingest.dedup_window_days
        );
        tracing::info!(
            "  worker:  poll={}s, stale_after={}s, auto_fetch={}s",
            self.worker.poll_interval_secs,
            self.worker.stale_after_secs,
            self.worker.auto_fetch_interval_secs
        );
        tracing::info!(
            "  llm:     model={}, configured={}",
            self.llm.model,
            self.llm.is_configured()
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_opt("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3020),
        }
    }
}

// ── Ingestion quota ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Max topics admitted per calendar day.
    pub daily_limit: u32,
    /// Max topics admitted per wall-clock hour.
    pub hourly_limit: u32,
    /// Max topics admitted in one fetch run.
    pub per_run_cap: u32,
}

impl QuotaConfig {
    fn from_env() -> Self {
        Self {
            daily_limit: env_u32("QUOTA_DAILY_LIMIT", 300),
            hourly_limit: env_u32("QUOTA_HOURLY_LIMIT", 30),
            per_run_cap: env_u32("QUOTA_PER_RUN_CAP", 10),
        }
    }
}

// ── Intake pipeline ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Max concurrent feed fetches within one run.
    pub fetch_concurrency: usize,
    pub fetch_timeout_secs: u64,
    /// Topics younger than this many days form the dedup comparison set.
    pub dedup_window_days: i64,
    /// Items under `min_chars` AND under `min_words` are rejected as too thin.
    pub min_chars: usize,
    pub min_words: usize,
    /// Initial topic score is drawn uniformly from this range.
    pub score_min: f32,
    pub score_max: f32,
    pub default_language: String,
}

impl IngestConfig {
    fn from_env() -> Self {
        Self {
            fetch_concurrency: env_u32("INGEST_FETCH_CONCURRENCY", 4) as usize,
            fetch_timeout_secs: env_u64("INGEST_FETCH_TIMEOUT_SECS", 20),
            dedup_window_days: env_u32("INGEST_DEDUP_WINDOW_DAYS", 7) as i64,
            min_chars: env_u32("INGEST_MIN_CHARS", 30) as usize,
            min_words: env_u32("INGEST_MIN_WORDS", 4) as usize,
            score_min: env_f32("INGEST_SCORE_MIN", 55.0),
            score_max: env_f32("INGEST_SCORE_MAX", 90.0),
            default_language: env_or("INGEST_DEFAULT_LANGUAGE", "en"),
        }
    }
}

// ── Worker / scheduler ────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// How often the worker polls for a queued job.
    pub poll_interval_secs: u64,
    /// Random jitter added on top of the poll interval.
    pub poll_jitter_ms: u64,
    /// A running job with no progress update for this long is reclaimed.
    pub stale_after_secs: i64,
    /// How often the staleness sweep runs.
    pub sweep_interval_secs: u64,
    /// How often the scheduler enqueues an automatic fetch-topics job.
    pub auto_fetch_interval_secs: u64,
}

impl WorkerConfig {
    fn from_env() -> Self {
        Self {
            poll_interval_secs: env_u64("WORKER_POLL_INTERVAL_SECS", 1),
            poll_jitter_ms: env_u64("WORKER_POLL_JITTER_MS", 250),
            stale_after_secs: env_u64("WORKER_STALE_AFTER_SECS", 600) as i64,
            sweep_interval_secs: env_u64("WORKER_SWEEP_INTERVAL_SECS", 60),
            auto_fetch_interval_secs: env_u64("WORKER_AUTO_FETCH_INTERVAL_SECS", 300),
        }
    }
}

// ── LLM ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env() -> Self {
        Self {
            api_key: env_opt("LLM_API_KEY"),
            model: env_or("LLM_MODEL", "gpt-4o-mini"),
            base_url: env_or("LLM_BASE_URL", "https://api.openai.com"),
            embedding_model: env_or("LLM_EMBEDDING_MODEL", "text-embedding-3-small"),
            temperature: env_f32("LLM_TEMPERATURE", 0.7),
            max_tokens: env_u32("LLM_MAX_TOKENS", 2048),
        }
    }

    /// Without an API key the pipeline runs on deterministic template output.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
