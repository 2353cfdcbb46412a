pub mod cached;
pub mod openrouter;
pub mod polymarket;
pub mod search;
pub mod telegram;

use std::time::Duration;

use augur_agents::AgentError;

pub use cached::CachedMarketData;
pub use openrouter::OpenAiCompatibleClient;
pub use polymarket::PolymarketClient;
pub use search::WebNews;
pub use telegram::{format_decision_message, TelegramNotifier};

const USER_AGENT: &str = concat!("augur/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for every provider. Each request inherits `timeout`.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, AgentError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AgentError::Provider(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn http_error(context: &str, e: reqwest::Error) -> AgentError {
    AgentError::Provider(format!("{context}: {e}"))
}
