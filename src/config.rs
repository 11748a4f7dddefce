use std::env;

/// Operating mode for the suggestion server.
/// Controls the worker pool's size and capacity the same way the original
/// reranker's `ENCAPURE_MODE` variable picked session-pool/semaphore sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    /// Optimized for single requests with low latency: a small pool.
    Single,
    /// Optimized for concurrent requests with high throughput: a large pool.
    Concurrent,
    /// Use individual environment variable settings.
    Custom,
}

impl OperatingMode {
    pub fn from_env() -> Self {
        match env::var("SUGGESTD_MODE").unwrap_or_default().to_lowercase().as_str() {
            "single" | "low-latency" | "single-request" => Self::Single,
            "concurrent" | "high-throughput" | "multi" => Self::Concurrent,
            _ => Self::Custom,
        }
    }
}

/// Names resolved against the `RetrievalAlgorithm`/`Twiddler` registries at
/// startup (spec §6, "Manager-level flags"). Absent from the on-disk index
/// and falcon population, which remains a non-goal: every bound algorithm
/// in this release operates over in-memory data supplied at construction.
pub struct Config {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,

    pub threadpool_size: usize,
    pub threadpool_capacity: usize,

    pub primary_algo: String,
    pub fallback_algo: String,
    pub secondary_algo: String,
    pub dedupers: Vec<String>,
    pub primary_twiddler: String,
    pub secondary_twiddler: String,

    pub max_suggestions_multiplier: usize,
    pub min_secondary_suggestions: usize,
    pub top_suggestion_min_freq_for_instant: f64,
    pub top_suggestion_min_selection_probability_for_instant: f64,

    pub bag_of_words_max_boost: f64,
    pub bag_of_words_max_suggestions_multiplier: usize,
    pub max_attribute_candidates: usize,

    /// Gates `POST /suggest/debug`; off by default in a production config.
    pub debug_enabled: bool,

    /// Wall-clock budget for one pipeline run, enforced by the handler the
    /// same way `rerank_handler` bounds inference with `tokio::time::timeout`.
    pub request_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let mode = OperatingMode::from_env();

        let (threadpool_size, threadpool_capacity) = match mode {
            OperatingMode::Single => (1, 16),
            OperatingMode::Concurrent => (16, 1024),
            OperatingMode::Custom => {
                let size = env::var("THREADPOOL_SIZE").ok().and_then(|s| s.parse().ok()).unwrap_or(512);
                let capacity = env::var("THREADPOOL_CAPACITY")
                    .unwrap_or_else(|_| "256".to_string())
                    .parse()?;
                (size, capacity)
            }
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse()?,
            shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT").unwrap_or_else(|_| "30".to_string()).parse()?,
            threadpool_size,
            threadpool_capacity,
            primary_algo: env::var("PRIMARY_ALGO").unwrap_or_else(|_| "primary_group".to_string()),
            fallback_algo: env::var("FALLBACK_ALGO").unwrap_or_else(|_| "fallback".to_string()),
            secondary_algo: env::var("SECONDARY_ALGO").unwrap_or_else(|_| "attribute".to_string()),
            dedupers: env::var("DEDUPERS")
                .unwrap_or_else(|_| "duplicate".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            primary_twiddler: env::var("PRIMARY_TWIDDLER").unwrap_or_else(|_| "domain_boost".to_string()),
            secondary_twiddler: env::var("SECONDARY_TWIDDLER").unwrap_or_else(|_| "identity".to_string()),
            max_suggestions_multiplier: env::var("MAX_SUGGESTIONS_MULTIPLIER")
                .unwrap_or_else(|_| "6".to_string())
                .parse()?,
            min_secondary_suggestions: env::var("MIN_SECONDARY_SUGGESTIONS")
                .unwrap_or_else(|_| "6".to_string())
                .parse()?,
            top_suggestion_min_freq_for_instant: env::var("TOP_SUGGESTION_MIN_FREQ_FOR_INSTANT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            top_suggestion_min_selection_probability_for_instant: env::var(
                "TOP_SUGGESTION_MIN_SELECTION_PROBABILITY_FOR_INSTANT",
            )
            .unwrap_or_else(|_| "0.4".to_string())
            .parse()?,
            bag_of_words_max_boost: env::var("BAG_OF_WORDS_MAX_BOOST")
                .unwrap_or_else(|_| "5.0".to_string())
                .parse()?,
            bag_of_words_max_suggestions_multiplier: env::var("BAG_OF_WORDS_MAX_SUGGESTIONS_MULTIPLIER")
                .unwrap_or_else(|_| "4".to_string())
                .parse()?,
            max_attribute_candidates: env::var("MAX_ATTRIBUTE_CANDIDATES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
            debug_enabled: env::var("DEBUG_ENABLED")
                .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            request_timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()?,
        })
    }

    pub fn mode(&self) -> OperatingMode {
        OperatingMode::from_env()
    }
}
