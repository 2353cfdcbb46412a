use serde::{Deserialize, Serialize};

/// Top-level configuration for Augur.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AugurConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Persistence and market-detail cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Path to the SQLite database holding agent configs, watchlists and the decision feed.
    pub sqlite_path: String,
    /// Maximum number of resolved markets kept in memory.
    #[serde(default = "default_market_cache_capacity")]
    pub market_cache_capacity: u64,
    /// How long a resolved market stays in memory.
    #[serde(default = "default_market_cache_ttl")]
    pub market_cache_ttl_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/augur.db".to_string(),
            market_cache_capacity: default_market_cache_capacity(),
            market_cache_ttl_seconds: default_market_cache_ttl(),
        }
    }
}

/// Endpoints and credentials for the market-data and news providers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default = "default_gamma_api")]
    pub gamma_api_base: String,
    #[serde(default = "default_clob_api")]
    pub clob_api_base: String,
    #[serde(default = "default_data_api")]
    pub data_api_base: String,
    #[serde(default = "default_tavily_api")]
    pub tavily_api_base: String,
    /// Falls back to `TAVILY_API_KEY` when unset.
    #[serde(default)]
    pub tavily_api_key: Option<String>,
    #[serde(default = "default_news_api")]
    pub news_api_base: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            gamma_api_base: default_gamma_api(),
            clob_api_base: default_clob_api(),
            data_api_base: default_data_api(),
            tavily_api_base: default_tavily_api(),
            tavily_api_key: None,
            news_api_base: default_news_api(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Which completion backend the advisor talks to.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmBackend {
    /// Any OpenAI-compatible `/chat/completions` endpoint (OpenRouter by default).
    #[default]
    OpenAiCompatible,
    /// The locally installed `claude` CLI.
    ClaudeCli,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    #[serde(default)]
    pub backend: LlmBackend,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_api")]
    pub api_base: String,
    /// Falls back to `OPENROUTER_API_KEY` when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::default(),
            model: default_llm_model(),
            api_base: default_llm_api(),
            api_key: None,
            temperature: default_temperature(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelegramConfig {
    /// Falls back to `TELEGRAM_BOT_TOKEN` when unset.
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: default_telegram_api(),
        }
    }
}

/// Decision feed scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    /// Seconds between proactive scans. The full interval is slept after every tick.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
        }
    }
}

fn default_market_cache_capacity() -> u64 {
    10_000
}
fn default_market_cache_ttl() -> u64 {
    300
}
fn default_gamma_api() -> String {
    "https://gamma-api.polymarket.com".to_string()
}
fn default_clob_api() -> String {
    "https://clob.polymarket.com".to_string()
}
fn default_data_api() -> String {
    "https://data-api.polymarket.com".to_string()
}
fn default_tavily_api() -> String {
    "https://api.tavily.com".to_string()
}
fn default_news_api() -> String {
    "https://min-api.cryptocompare.com".to_string()
}
fn default_request_timeout() -> u64 {
    15
}
fn default_llm_model() -> String {
    "openai/gpt-4o-mini".to_string()
}
fn default_llm_api() -> String {
    "https://openrouter.ai/api/v1".to_string()
}
fn default_temperature() -> f64 {
    0.3
}
fn default_llm_timeout() -> u64 {
    60
}
fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}
fn default_interval() -> u64 {
    300
}
