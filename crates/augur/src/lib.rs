//! Augur - proactive prediction-market advisor
//!
//! Runs a supervisor-routed pipeline (context, market analysis, research,
//! advice) per user and turns the result into BUY_YES / BUY_NO / HOLD / SKIP
//! recommendations.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! # async fn demo() -> anyhow::Result<()> {
//! let config = augur::load_config("config/augur.toml")?;
//! let components = augur::build_components(&config)?;
//! let response = components.pipeline.analyze("user-id", "proactive_scan").await?;
//! println!("{} decisions", response.decisions.len());
//! # Ok(())
//! # }
//! ```

pub use augur_agents as agents;
pub use augur_models as models;
pub use augur_providers as providers;
pub use augur_store as store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use augur_agents::claude_cli::ClaudeCliClient;
use augur_agents::{
    AdvisorStage, CompletionClient, ContextStage, MarketDataProvider, MarketStage, NewsProvider,
    Notifier, Persistence, Pipeline, ResearchStage,
};
use augur_models::config::{AugurConfig, LlmBackend};
use augur_providers::{
    http_client, CachedMarketData, OpenAiCompatibleClient, PolymarketClient, TelegramNotifier,
    WebNews,
};
use augur_store::SqliteStore;
use tracing::info;

pub const OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
pub const TAVILY_API_KEY: &str = "TAVILY_API_KEY";
pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";

/// Everything a binary needs: the pipeline, the store it reads from, and the push channel.
pub struct Components {
    pub pipeline: Pipeline,
    pub store: Arc<SqliteStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// Read and parse the TOML config, then fill unset secrets from the environment.
pub fn load_config(path: &str) -> anyhow::Result<AugurConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {path}"))?;
    let mut config: AugurConfig =
        toml::from_str(&raw).with_context(|| format!("Failed to parse config: {path}"))?;
    apply_env_fallbacks(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Secrets set in the file win; blank values count as unset.
pub fn apply_env_fallbacks<F>(config: &mut AugurConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let fill = |slot: &mut Option<String>, key: &str| {
        if slot.as_deref().map_or(true, |v| v.trim().is_empty()) {
            *slot = lookup(key).filter(|v| !v.trim().is_empty());
        }
    };
    fill(&mut config.llm.api_key, OPENROUTER_API_KEY);
    fill(&mut config.providers.tavily_api_key, TAVILY_API_KEY);
    fill(&mut config.telegram.bot_token, TELEGRAM_BOT_TOKEN);
}

/// Open the store and wire the real providers into a pipeline.
pub fn build_components(config: &AugurConfig) -> anyhow::Result<Components> {
    let store = Arc::new(
        SqliteStore::open(&config.store.sqlite_path)
            .with_context(|| format!("Failed to open store: {}", config.store.sqlite_path))?,
    );
    let http = http_client(Duration::from_secs(config.providers.request_timeout_seconds))?;

    let market_data: Arc<dyn MarketDataProvider> = Arc::new(CachedMarketData::new(
        Arc::new(PolymarketClient::new(http.clone(), &config.providers)),
        config.store.market_cache_capacity,
        Duration::from_secs(config.store.market_cache_ttl_seconds),
    ));
    let news = Arc::new(WebNews::new(
        http.clone(),
        &config.providers,
        config.providers.tavily_api_key.clone(),
    ));
    let completion = completion_client(config, http.clone())?;

    let pipeline = build_pipeline(store.clone(), market_data, news, completion)?;
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(
        http,
        &config.telegram,
        config.telegram.bot_token.clone(),
        store.clone(),
    ));

    info!(
        backend = ?config.llm.backend,
        model = %config.llm.model,
        telegram = config.telegram.bot_token.is_some(),
        "Pipeline wired"
    );
    Ok(Components {
        pipeline,
        store,
        notifier,
    })
}

pub fn build_pipeline(
    persistence: Arc<dyn Persistence>,
    market_data: Arc<dyn MarketDataProvider>,
    news: Arc<dyn NewsProvider>,
    completion: Arc<dyn CompletionClient>,
) -> anyhow::Result<Pipeline> {
    let pipeline = Pipeline::builder()
        .stage(Arc::new(ContextStage::new(persistence, market_data.clone())))
        .stage(Arc::new(MarketStage::new(market_data)))
        .stage(Arc::new(ResearchStage::new(news)))
        .stage(Arc::new(AdvisorStage::new(completion)))
        .build()?;
    Ok(pipeline)
}

/// The advisor's completion backend, chosen by `llm.backend`.
pub fn completion_client(
    config: &AugurConfig,
    http: reqwest::Client,
) -> anyhow::Result<Arc<dyn CompletionClient>> {
    let timeout = Duration::from_secs(config.llm.timeout_seconds);
    match config.llm.backend {
        LlmBackend::ClaudeCli => Ok(Arc::new(ClaudeCliClient::new(
            config.llm.model.clone(),
            timeout,
        ))),
        LlmBackend::OpenAiCompatible => {
            let Some(api_key) = config.llm.api_key.clone() else {
                bail!("llm.api_key is not set and {OPENROUTER_API_KEY} is empty");
            };
            Ok(Arc::new(OpenAiCompatibleClient::new(http, &config.llm, api_key)))
        }
    }
}
