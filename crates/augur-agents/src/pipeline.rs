use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use augur_models::decision::AnalyzeResponse;
use augur_models::{Node, PipelineState};
use tracing::{debug, info};

use crate::collaborators::short_id;
use crate::error::PipelineError;
use crate::stages::Stage;
use crate::supervisor::supervise;

/// Upper bound on worker invocations per run: one per worker node.
pub const MAX_WORKER_STEPS: usize = Node::WORKERS.len();

/// Drives one state through supervisor and stages until the supervisor routes to END.
///
/// Holds only its wiring; runs never share state, so one `Pipeline` can be
/// reused across sequential and concurrent runs.
pub struct Pipeline {
    stages: HashMap<Node, Arc<dyn Stage>>,
}

#[derive(Default)]
pub struct PipelineBuilder {
    stages: HashMap<Node, Arc<dyn Stage>>,
}

impl PipelineBuilder {
    /// Register a stage under its own node. A later registration replaces an earlier one.
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.insert(stage.node(), stage);
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        for node in Node::WORKERS {
            if !self.stages.contains_key(&node) {
                return Err(PipelineError::MissingStage(node));
            }
        }
        Ok(Pipeline {
            stages: self.stages,
        })
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub async fn run(&self, mut state: PipelineState) -> Result<PipelineState, PipelineError> {
        let start = Instant::now();
        let mut steps = 0usize;

        loop {
            let route = supervise(&state);
            state.next_node = Some(route.next);
            state.messages.push(route.message);

            if route.next == Node::End {
                break;
            }
            if steps == MAX_WORKER_STEPS {
                return Err(PipelineError::StepLimit(MAX_WORKER_STEPS));
            }

            let stage = self
                .stages
                .get(&route.next)
                .ok_or(PipelineError::MissingStage(route.next))?;

            let stage_start = Instant::now();
            let update = stage.run(&state).await;
            let produced = update.output.node();
            if produced != route.next {
                return Err(PipelineError::StageMismatch {
                    expected: route.next,
                    got: produced,
                });
            }
            debug!(
                node = %route.next,
                elapsed_ms = stage_start.elapsed().as_millis(),
                "Stage complete"
            );
            state.apply(update);
            steps += 1;
        }

        info!(
            user_id = %short_id(&state.user_id),
            decisions = state.decisions().len(),
            steps,
            elapsed_ms = start.elapsed().as_millis(),
            "Pipeline complete"
        );
        Ok(state)
    }

    /// On-demand analysis: raw, unfiltered decisions plus the run's messages.
    pub async fn analyze(
        &self,
        user_id: &str,
        task: &str,
    ) -> Result<AnalyzeResponse, PipelineError> {
        let state = self.run(PipelineState::new(user_id, task)).await?;
        Ok(AnalyzeResponse {
            decisions: state.decisions.unwrap_or_default(),
            messages: state.messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FnStage;
    use augur_models::{StageOutput, StageUpdate, UserConfig};

    fn context_stage() -> Arc<dyn Stage> {
        Arc::new(FnStage::new(Node::Context, |_| {
            StageUpdate::new(StageOutput::Context {
                user_config: UserConfig::default(),
                watchlist_markets: vec![],
                tracked_wallets: vec![],
            })
        }))
    }

    fn market_stage() -> Arc<dyn Stage> {
        Arc::new(FnStage::new(Node::MarketAnalyst, |_| {
            StageUpdate::new(StageOutput::Market {
                market_snapshots: vec![],
                smart_money_trades: vec![],
            })
        }))
    }

    fn research_stage() -> Arc<dyn Stage> {
        Arc::new(FnStage::new(Node::Researcher, |_| {
            StageUpdate::new(StageOutput::Research { news_items: vec![] })
        }))
    }

    fn advisor_stage() -> Arc<dyn Stage> {
        Arc::new(FnStage::new(Node::Advisor, |_| {
            StageUpdate::new(StageOutput::Advisor { decisions: vec![] })
                .with_message("advised")
        }))
    }

    #[test]
    fn build_requires_every_worker() {
        let result = Pipeline::builder()
            .stage(context_stage())
            .stage(market_stage())
            .stage(advisor_stage())
            .build();
        assert!(matches!(
            result,
            Err(PipelineError::MissingStage(Node::Researcher))
        ));
    }

    #[tokio::test]
    async fn runs_all_workers_in_order() {
        let pipeline = Pipeline::builder()
            .stage(advisor_stage())
            .stage(research_stage())
            .stage(market_stage())
            .stage(context_stage())
            .build()
            .unwrap();

        let state = pipeline
            .run(PipelineState::proactive_scan("user-1"))
            .await
            .unwrap();
        assert_eq!(state.next_node, Some(Node::End));
        assert_eq!(state.decisions, Some(vec![]));
        assert_eq!(
            state.messages,
            vec![
                "Supervisor: routing to context",
                "Supervisor: routing to market_analyst",
                "Supervisor: routing to researcher",
                "Supervisor: routing to advisor",
                "advised",
                "Supervisor: routing to END",
            ]
        );
    }

    #[tokio::test]
    async fn wrong_output_is_a_mismatch() {
        let lying_research: Arc<dyn Stage> = Arc::new(FnStage::new(Node::Researcher, |_| {
            StageUpdate::new(StageOutput::Advisor { decisions: vec![] })
        }));
        let pipeline = Pipeline::builder()
            .stage(context_stage())
            .stage(market_stage())
            .stage(lying_research)
            .stage(advisor_stage())
            .build()
            .unwrap();

        let err = pipeline
            .run(PipelineState::proactive_scan("user-1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StageMismatch {
                expected: Node::Researcher,
                got: Node::Advisor
            }
        ));
    }

    #[tokio::test]
    async fn analyze_returns_decisions_and_messages() {
        let pipeline = Pipeline::builder()
            .stage(context_stage())
            .stage(market_stage())
            .stage(research_stage())
            .stage(advisor_stage())
            .build()
            .unwrap();

        let response = pipeline.analyze("user-1", "what now?").await.unwrap();
        assert!(response.decisions.is_empty());
        assert!(response.messages.contains(&"advised".to_string()));
    }
}
