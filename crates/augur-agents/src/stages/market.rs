use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use augur_models::market::{round_to, MarketSnapshot, WalletActivity};
use augur_models::{Node, PipelineState, StageOutput, StageUpdate};
use tracing::{info, warn};

use crate::collaborators::MarketDataProvider;
use crate::stages::Stage;

/// Wallets beyond this many are ignored to stay under provider rate limits.
pub const MAX_WALLETS: usize = 10;
pub const TRADES_PER_WALLET: usize = 5;

/// Enriches watchlist markets with live prices and pulls recent trades from
/// tracked wallets.
pub struct MarketStage {
    market_data: Arc<dyn MarketDataProvider>,
}

impl MarketStage {
    pub fn new(market_data: Arc<dyn MarketDataProvider>) -> Self {
        Self { market_data }
    }
}

#[async_trait]
impl Stage for MarketStage {
    fn node(&self) -> Node {
        Node::MarketAnalyst
    }

    async fn run(&self, state: &PipelineState) -> StageUpdate {
        let markets = state.watchlist_markets();
        let wallets = state.tracked_wallets();
        info!(
            markets = markets.len(),
            wallets = wallets.len(),
            "Analyzing markets"
        );
        let mut messages = Vec::new();

        let token_ids: Vec<String> = markets
            .iter()
            .filter(|m| !m.token_id.is_empty())
            .map(|m| m.token_id.clone())
            .collect();

        let prices = if token_ids.is_empty() {
            HashMap::new()
        } else {
            match self.market_data.prices(&token_ids).await {
                Ok(prices) => prices,
                Err(e) => {
                    warn!(error = %e, tokens = token_ids.len(), "Price batch failed");
                    messages.push(format!("Market Analyst: price lookup failed: {e}"));
                    HashMap::new()
                }
            }
        };

        let market_snapshots: Vec<MarketSnapshot> = markets
            .iter()
            .map(|market| {
                let price = prices.get(&market.token_id).copied();
                MarketSnapshot {
                    token_id: market.token_id.clone(),
                    question: market.question.clone(),
                    slug: market.slug.clone(),
                    yes_price: price.map(|p| round_to(p, 4)).unwrap_or(0.0),
                    no_price: price.map(|p| round_to(1.0 - p, 4)).unwrap_or(0.0),
                    volume: market.volume,
                    liquidity: market.liquidity,
                }
            })
            .collect();

        let mut smart_money_trades = Vec::new();
        for wallet in wallets.iter().take(MAX_WALLETS) {
            match self
                .market_data
                .wallet_trades(wallet, TRADES_PER_WALLET)
                .await
            {
                Ok(trades) => smart_money_trades.extend(
                    trades
                        .iter()
                        .take(TRADES_PER_WALLET)
                        .map(|t| WalletActivity::from_trade(wallet, t)),
                ),
                Err(e) => {
                    warn!(wallet = %wallet, error = %e, "Wallet trade lookup failed, skipping");
                }
            }
        }

        let summary = format!(
            "Market Analyst complete: {} snapshots, {} smart-money trades",
            market_snapshots.len(),
            smart_money_trades.len()
        );
        info!("{summary}");
        messages.push(summary);

        StageUpdate {
            output: StageOutput::Market {
                market_snapshots,
                smart_money_trades,
            },
            messages,
        }
    }
}
