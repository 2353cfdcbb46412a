//! The outside world as seen by the pipeline and the feed scheduler.
//!
//! Every trait is object-safe and shared as `Arc<dyn Trait>` across runs.
//! In-memory fakes live in [`crate::test_support`].

use std::collections::HashMap;

use async_trait::async_trait;
use augur_models::decision::Decision;
use augur_models::market::{MarketDetail, SearchResult, WalletTrade};
use augur_models::profile::{ActiveUser, UserConfig};
use augur_store::SqliteStore;
use tracing::debug;

use crate::error::AgentError;

/// Reads of user context and the append-only decision feed.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// The user's agent configuration, or defaults when none is stored.
    async fn agent_config(&self, user_id: &str) -> Result<UserConfig, AgentError>;

    /// Market ids or slugs across all the user's watchlists, de-duplicated.
    async fn watchlist_ids(&self, user_id: &str) -> Result<Vec<String>, AgentError>;

    /// Wallets tracked through the user's active squads, de-duplicated.
    async fn tracked_wallets(&self, user_id: &str) -> Result<Vec<String>, AgentError>;

    async fn active_configs(&self) -> Result<Vec<ActiveUser>, AgentError>;

    /// Returns whether the decision was stored.
    async fn insert_decision(&self, user_id: &str, decision: &Decision)
        -> Result<bool, AgentError>;
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Resolve a market by condition id (`0x...`) or slug.
    async fn market(&self, id_or_slug: &str) -> Result<Option<MarketDetail>, AgentError>;

    /// Current buy-side price per token. Tokens without a price are absent.
    async fn prices(&self, token_ids: &[String]) -> Result<HashMap<String, f64>, AgentError>;

    async fn wallet_trades(&self, wallet: &str, limit: usize)
        -> Result<Vec<WalletTrade>, AgentError>;
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<SearchResult>, AgentError>;

    async fn general_news(&self, limit: usize) -> Result<Vec<SearchResult>, AgentError>;
}

/// A language model taking a system and a user prompt and returning raw text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, AgentError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns `Ok(false)` when the user has no notification channel.
    async fn notify(&self, user_id: &str, decision: &Decision) -> Result<bool, AgentError>;
}

#[async_trait]
impl Persistence for SqliteStore {
    async fn agent_config(&self, user_id: &str) -> Result<UserConfig, AgentError> {
        Ok(SqliteStore::agent_config(self, user_id)?.unwrap_or_default())
    }

    async fn watchlist_ids(&self, user_id: &str) -> Result<Vec<String>, AgentError> {
        Ok(SqliteStore::watchlist_ids(self, user_id)?)
    }

    async fn tracked_wallets(&self, user_id: &str) -> Result<Vec<String>, AgentError> {
        Ok(SqliteStore::tracked_wallets(self, user_id)?)
    }

    async fn active_configs(&self) -> Result<Vec<ActiveUser>, AgentError> {
        Ok(SqliteStore::active_configs(self)?)
    }

    async fn insert_decision(
        &self,
        user_id: &str,
        decision: &Decision,
    ) -> Result<bool, AgentError> {
        let id = SqliteStore::insert_decision(self, user_id, decision)?;
        debug!(user_id = %short_id(user_id), decision_id = %id, "Decision stored");
        Ok(true)
    }
}

/// User ids are logged truncated to their first 8 characters.
pub fn short_id(user_id: &str) -> &str {
    match user_id.char_indices().nth(8) {
        Some((idx, _)) => &user_id[..idx],
        None => user_id,
    }
}
