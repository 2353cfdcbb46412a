use std::sync::Arc;

use async_trait::async_trait;
use augur_models::market::MarketRef;
use augur_models::profile::{Source, UserConfig};
use augur_models::{Node, PipelineState, StageOutput, StageUpdate};
use tracing::{info, warn};

use crate::collaborators::{short_id, MarketDataProvider, Persistence};
use crate::stages::Stage;

/// Loads the user's personal context: agent config, watchlist markets and
/// tracked wallets.
pub struct ContextStage {
    persistence: Arc<dyn Persistence>,
    market_data: Arc<dyn MarketDataProvider>,
}

impl ContextStage {
    pub fn new(persistence: Arc<dyn Persistence>, market_data: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            persistence,
            market_data,
        }
    }

    async fn resolve_markets(&self, ids: &[String], messages: &mut Vec<String>) -> Vec<MarketRef> {
        let mut markets = Vec::with_capacity(ids.len());
        for id in ids {
            // The provider distinguishes condition ids (0x...) from slugs.
            match self.market_data.market(id).await {
                Ok(Some(detail)) => markets.push(detail.to_market_ref()),
                Ok(None) => {
                    info!(market = %id, "Watchlist market not found, skipping");
                }
                Err(e) => {
                    warn!(market = %id, error = %e, "Failed to resolve watchlist market");
                    messages.push(format!("Context: could not resolve market {id}: {e}"));
                }
            }
        }
        markets
    }
}

#[async_trait]
impl Stage for ContextStage {
    fn node(&self) -> Node {
        Node::Context
    }

    async fn run(&self, state: &PipelineState) -> StageUpdate {
        let user_id = state.user_id.as_str();
        if user_id.is_empty() {
            return StageUpdate::new(StageOutput::Context {
                user_config: UserConfig::default(),
                watchlist_markets: vec![],
                tracked_wallets: vec![],
            })
            .with_message("Context: no user_id provided, skipping");
        }

        info!(user_id = %short_id(user_id), "Loading user context");
        let mut messages = Vec::new();

        let user_config = match self.persistence.agent_config(user_id).await {
            Ok(config) => config,
            Err(e) => {
                warn!(user_id = %short_id(user_id), error = %e, "Failed to load agent config");
                messages.push(format!("Context: agent config unavailable, using defaults: {e}"));
                UserConfig::default()
            }
        };

        let watchlist_markets = if user_config.has_source(Source::Watchlists) {
            match self.persistence.watchlist_ids(user_id).await {
                Ok(ids) => self.resolve_markets(&ids, &mut messages).await,
                Err(e) => {
                    warn!(user_id = %short_id(user_id), error = %e, "Failed to load watchlists");
                    messages.push(format!("Context: watchlists unavailable: {e}"));
                    vec![]
                }
            }
        } else {
            vec![]
        };

        let tracked_wallets = if user_config.has_source(Source::Squads) {
            match self.persistence.tracked_wallets(user_id).await {
                Ok(wallets) => wallets,
                Err(e) => {
                    warn!(user_id = %short_id(user_id), error = %e, "Failed to load tracked wallets");
                    messages.push(format!("Context: tracked wallets unavailable: {e}"));
                    vec![]
                }
            }
        } else {
            vec![]
        };

        let summary = format!(
            "Context loaded: {} watchlist markets, {} tracked wallets, risk={}",
            watchlist_markets.len(),
            tracked_wallets.len(),
            user_config.risk_profile
        );
        info!(user_id = %short_id(user_id), "{summary}");
        messages.push(summary);

        StageUpdate {
            output: StageOutput::Context {
                user_config,
                watchlist_markets,
                tracked_wallets,
            },
            messages,
        }
    }
}
