use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use augur_models::{Node, PipelineState, StageOutput, StageUpdate};
use tracing::{error, info};

use crate::collaborators::CompletionClient;
use crate::error::AgentError;
use crate::parser::parse_decisions;
use crate::prompts::{advisor_system_prompt, advisor_user_prompt};
use crate::stages::Stage;

/// Synthesizes snapshots, smart-money trades and news into decisions with
/// a language model.
pub struct AdvisorStage {
    completion: Arc<dyn CompletionClient>,
}

impl AdvisorStage {
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl Stage for AdvisorStage {
    fn node(&self) -> Node {
        Node::Advisor
    }

    async fn run(&self, state: &PipelineState) -> StageUpdate {
        let snapshots = state.market_snapshots();
        if snapshots.is_empty() {
            return StageUpdate::new(StageOutput::Advisor { decisions: vec![] })
                .with_message("Advisor: no markets to analyze");
        }

        let trades = state.smart_money_trades();
        let news = state.news_items();
        info!(
            markets = snapshots.len(),
            trades = trades.len(),
            news = news.len(),
            "Synthesizing decisions"
        );

        let system_prompt = advisor_system_prompt(state.user_config.risk_profile);
        let user_prompt = advisor_user_prompt(snapshots, trades, news);

        let start = Instant::now();
        let result = match self.completion.complete(&system_prompt, &user_prompt).await {
            Ok(raw) => parse_decisions(&raw),
            Err(e) => Err(e),
        };
        let elapsed_ms = start.elapsed().as_millis();

        match result {
            Ok(decisions) => {
                let msg = format!(
                    "Advisor complete: {} recommendations generated",
                    decisions.len()
                );
                info!(elapsed_ms, "{msg}");
                StageUpdate::new(StageOutput::Advisor { decisions }).with_message(msg)
            }
            Err(AgentError::Parse(reason)) => {
                error!(elapsed_ms, reason = %reason, "Advisor response was not a decision array");
                StageUpdate::new(StageOutput::Advisor { decisions: vec![] })
                    .with_message(format!("Advisor: failed to parse model response: {reason}"))
            }
            Err(e) => {
                error!(elapsed_ms, error = %e, "Advisor completion failed");
                StageUpdate::new(StageOutput::Advisor { decisions: vec![] })
                    .with_message(format!("Advisor error: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeCompletion;
    use augur_models::decision::{Decision, Signal};
    use augur_models::market::MarketSnapshot;
    use augur_models::profile::{RiskProfile, UserConfig};
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;

    fn state(snapshots: Vec<MarketSnapshot>, risk_profile: RiskProfile) -> PipelineState {
        let mut state = PipelineState::proactive_scan("user-1");
        state.apply(StageUpdate::new(StageOutput::Context {
            user_config: UserConfig {
                risk_profile,
                ..UserConfig::default()
            },
            watchlist_markets: vec![],
            tracked_wallets: vec![],
        }));
        state.apply(StageUpdate::new(StageOutput::Market {
            market_snapshots: snapshots,
            smart_money_trades: vec![],
        }));
        state.apply(StageUpdate::new(StageOutput::Research { news_items: vec![] }));
        state
    }

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            token_id: "y1".to_string(),
            question: "Will BTC hit $100k?".to_string(),
            slug: "btc-100k".to_string(),
            yes_price: 0.41,
            no_price: 0.59,
            volume: 0.0,
            liquidity: 0.0,
        }
    }

    fn decisions_of(update: &StageUpdate) -> &[Decision] {
        match &update.output {
            StageOutput::Advisor { decisions } => decisions,
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_snapshots_skips_model() {
        let completion = FakeCompletion::returning("[]");
        let calls = completion.calls.clone();
        let update = AdvisorStage::new(Arc::new(completion))
            .run(&state(vec![], RiskProfile::Moderate))
            .await;

        assert!(decisions_of(&update).is_empty());
        assert_eq!(update.messages, vec!["Advisor: no markets to analyze"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn decisions_from_model_output() {
        let completion = FakeCompletion::returning(
            r#"```json
[{"market_question": "Will BTC hit $100k?", "market_slug": "btc-100k", "signal": "BUY_YES",
  "confidence": 1.4, "reasoning": "Momentum", "key_factors": ["ETF"], "risk_level": "high"}]
```"#,
        );
        let prompts = completion.prompts.clone();
        let update = AdvisorStage::new(Arc::new(completion))
            .run(&state(vec![snapshot()], RiskProfile::Degen))
            .await;

        let decisions = decisions_of(&update);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].signal, Signal::BuyYes);
        assert_eq!(decisions[0].confidence, dec!(1));

        let prompts = prompts.lock().unwrap();
        let (system, user) = &prompts[0];
        assert!(system.contains("risk profile is: degen"));
        assert!(user.contains("YES: 41.0% | NO: 59.0%"));
    }

    #[tokio::test]
    async fn malformed_output_yields_parse_message() {
        let update = AdvisorStage::new(Arc::new(FakeCompletion::returning("not json at all")))
            .run(&state(vec![snapshot()], RiskProfile::Moderate))
            .await;
        assert!(decisions_of(&update).is_empty());
        assert!(update.messages[0].contains("failed to parse"));
    }

    #[tokio::test]
    async fn completion_failure_yields_error_message() {
        let update = AdvisorStage::new(Arc::new(FakeCompletion::failing("rate limited")))
            .run(&state(vec![snapshot()], RiskProfile::Moderate))
            .await;
        assert!(decisions_of(&update).is_empty());
        assert!(update.messages[0].starts_with("Advisor error"));
        assert!(update.messages[0].contains("rate limited"));
    }
}
