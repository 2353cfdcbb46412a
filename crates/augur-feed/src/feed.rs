use std::sync::Arc;
use std::time::{Duration, Instant};

use augur_agents::collaborators::short_id;
use augur_agents::{Notifier, Persistence, Pipeline};
use augur_models::decision::Decision;
use augur_models::profile::{ActiveUser, RiskProfile};
use augur_models::state::PROACTIVE_SCAN_TASK;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::FeedError;

/// Counters for one scheduler tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Active users returned by the store.
    pub users: usize,
    /// Users whose pipeline run completed.
    pub processed: usize,
    /// Users whose run errored or panicked.
    pub failed: usize,
    pub persisted: usize,
    pub notified: usize,
}

/// Periodically scans every active user and pushes the actionable decisions.
///
/// Users are scanned one after another. Each run is spawned and awaited
/// immediately so a panicking stage only costs that user.
pub struct DecisionFeed {
    pipeline: Arc<Pipeline>,
    persistence: Arc<dyn Persistence>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    cancel: CancellationToken,
}

impl DecisionFeed {
    pub fn new(
        pipeline: Arc<Pipeline>,
        persistence: Arc<dyn Persistence>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
    ) -> Self {
        Self {
            pipeline,
            persistence,
            notifier,
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a CancellationToken that can be used to trigger shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Tick, then sleep the full interval, until cancelled.
    pub async fn run(&self) {
        info!(interval_secs = self.interval.as_secs(), "Decision feed starting");

        while !self.cancel.is_cancelled() {
            let start = Instant::now();
            match self.run_tick().await {
                Ok(report) => info!(
                    users = report.users,
                    processed = report.processed,
                    failed = report.failed,
                    persisted = report.persisted,
                    notified = report.notified,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Feed tick complete"
                ),
                Err(e) => error!(error = %e, "Feed tick abandoned"),
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Decision feed stopped");
    }

    /// One pass over all active users.
    ///
    /// Only a failure to list the users fails the tick. Cancellation is
    /// checked before each user, never mid-user.
    pub async fn run_tick(&self) -> Result<TickReport, FeedError> {
        let users = self
            .persistence
            .active_configs()
            .await
            .map_err(FeedError::ActiveUsers)?;

        let mut report = TickReport {
            users: users.len(),
            ..TickReport::default()
        };
        if users.is_empty() {
            info!("No active agent configs, nothing to scan");
            return Ok(report);
        }

        for user in &users {
            if self.cancel.is_cancelled() {
                info!(remaining = users.len() - report.processed - report.failed, "Shutdown requested, ending tick early");
                break;
            }

            match self.scan(&user.user_id).await {
                Ok(decisions) => {
                    report.processed += 1;
                    self.deliver(user, decisions, &mut report).await;
                }
                Err(e) => {
                    report.failed += 1;
                    error!(user_id = %short_id(&user.user_id), error = %e, "Scan failed");
                }
            }
        }

        Ok(report)
    }

    async fn scan(&self, user_id: &str) -> Result<Vec<Decision>, FeedError> {
        let pipeline = self.pipeline.clone();
        let owned_id = user_id.to_string();
        let handle =
            tokio::spawn(async move { pipeline.analyze(&owned_id, PROACTIVE_SCAN_TASK).await });

        match handle.await {
            Ok(Ok(response)) => Ok(response.decisions),
            Ok(Err(e)) => Err(FeedError::Pipeline(e)),
            Err(e) => Err(FeedError::Task(e.to_string())),
        }
    }

    async fn deliver(&self, user: &ActiveUser, decisions: Vec<Decision>, report: &mut TickReport) {
        let user_id = short_id(&user.user_id);
        if decisions.is_empty() {
            debug!(user_id = %user_id, "No decisions");
            return;
        }

        let total = decisions.len();
        let actionable = select_actionable(decisions, user.risk_profile);
        info!(
            user_id = %user_id,
            total,
            actionable = actionable.len(),
            threshold = %user.risk_profile.confidence_threshold(),
            "Filtered decisions"
        );

        for decision in &actionable {
            match self.persistence.insert_decision(&user.user_id, decision).await {
                Ok(true) => report.persisted += 1,
                Ok(false) => warn!(user_id = %user_id, slug = %decision.market_slug, "Decision not stored"),
                Err(e) => {
                    error!(user_id = %user_id, slug = %decision.market_slug, error = %e, "Failed to store decision")
                }
            }

            match self.notifier.notify(&user.user_id, decision).await {
                Ok(true) => report.notified += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(user_id = %user_id, slug = %decision.market_slug, error = %e, "Failed to notify")
                }
            }
        }
    }
}

/// Decisions worth pushing for this risk profile: confident enough and not SKIP.
pub fn select_actionable(decisions: Vec<Decision>, profile: RiskProfile) -> Vec<Decision> {
    let threshold = profile.confidence_threshold();
    decisions
        .into_iter()
        .filter(|d| d.is_actionable(threshold))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_agents::test_support::decision;
    use augur_models::decision::Signal;
    use rust_decimal_macros::dec;

    #[test]
    fn threshold_follows_profile() {
        let decisions = vec![decision("fed", Signal::BuyYes, dec!(0.75))];
        assert!(select_actionable(decisions.clone(), RiskProfile::Conservative).is_empty());
        assert_eq!(select_actionable(decisions.clone(), RiskProfile::Moderate).len(), 1);
        assert_eq!(select_actionable(decisions, RiskProfile::Unknown).len(), 1);
    }

    #[test]
    fn threshold_is_inclusive() {
        let decisions = vec![decision("fed", Signal::BuyNo, dec!(0.8))];
        assert_eq!(select_actionable(decisions, RiskProfile::Conservative).len(), 1);
    }

    #[test]
    fn skip_is_never_actionable() {
        let decisions = vec![
            decision("a", Signal::Skip, dec!(1)),
            decision("b", Signal::Hold, dec!(0.5)),
        ];
        let picked = select_actionable(decisions, RiskProfile::Degen);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].market_slug, "b");
    }
}
