use std::sync::Arc;

use async_trait::async_trait;
use augur_models::market::{NewsItem, Relevance};
use augur_models::profile::Source;
use augur_models::{Node, PipelineState, StageOutput, StageUpdate};
use tracing::{info, warn};

use crate::collaborators::NewsProvider;
use crate::stages::Stage;

pub const MAX_SEARCHED_MARKETS: usize = 5;
pub const RESULTS_PER_MARKET: usize = 3;
pub const GENERAL_NEWS_LIMIT: usize = 5;

/// Gathers targeted search results per market plus general news.
pub struct ResearchStage {
    news: Arc<dyn NewsProvider>,
}

impl ResearchStage {
    pub fn new(news: Arc<dyn NewsProvider>) -> Self {
        Self { news }
    }
}

#[async_trait]
impl Stage for ResearchStage {
    fn node(&self) -> Node {
        Node::Researcher
    }

    async fn run(&self, state: &PipelineState) -> StageUpdate {
        if !state.user_config.has_source(Source::News) {
            return StageUpdate::new(StageOutput::Research { news_items: vec![] })
                .with_message("Researcher: news source disabled, skipping");
        }

        let snapshots = state.market_snapshots();
        info!(markets = snapshots.len(), "Gathering research");
        let mut messages = Vec::new();
        let mut news_items = Vec::new();

        // The cap counts markets, including ones without a question to search.
        for snapshot in snapshots
            .iter()
            .take(MAX_SEARCHED_MARKETS)
            .filter(|s| !s.question.is_empty())
        {
            let query = format!("Polymarket prediction: {}", snapshot.question);
            match self.news.search(&query, RESULTS_PER_MARKET).await {
                Ok(results) => news_items.extend(
                    results
                        .into_iter()
                        .take(RESULTS_PER_MARKET)
                        .map(|r| NewsItem::from_result(r, Relevance::High)),
                ),
                Err(e) => {
                    warn!(slug = %snapshot.slug, error = %e, "Search failed");
                    messages.push(format!("Researcher: search failed for {}: {e}", snapshot.slug));
                }
            }
        }

        match self.news.general_news(GENERAL_NEWS_LIMIT).await {
            Ok(results) => news_items.extend(
                results
                    .into_iter()
                    .take(GENERAL_NEWS_LIMIT)
                    .map(|r| NewsItem::from_result(r, Relevance::Medium)),
            ),
            Err(e) => {
                warn!(error = %e, "General news fetch failed");
                messages.push(format!("Researcher: general news failed: {e}"));
            }
        }

        let summary = format!("Researcher complete: {} news items gathered", news_items.len());
        info!("{summary}");
        messages.push(summary);

        StageUpdate {
            output: StageOutput::Research { news_items },
            messages,
        }
    }
}
