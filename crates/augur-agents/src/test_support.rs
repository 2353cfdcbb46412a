//! In-memory fakes for every collaborator, plus small builders for test data.
//!
//! Fakes share their recorders (`calls`, `queries`, `sent`, ...) through `Arc`,
//! so a test can clone a recorder before handing the fake to a stage.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use augur_models::decision::{Decision, RiskLevel, Signal};
use augur_models::market::{MarketDetail, OutcomeToken, SearchResult, WalletTrade};
use augur_models::profile::{ActiveUser, RiskProfile, UserConfig};
use augur_models::{Node, PipelineState, StageUpdate};
use rust_decimal::Decimal;

use crate::collaborators::{CompletionClient, MarketDataProvider, NewsProvider, Notifier, Persistence};
use crate::error::{AgentError, PipelineError};
use crate::pipeline::Pipeline;
use crate::stages::{AdvisorStage, ContextStage, MarketStage, ResearchStage, Stage};

pub fn market_detail(condition_id: &str, slug: &str, tokens: &[(&str, &str)]) -> MarketDetail {
    MarketDetail {
        condition_id: condition_id.to_string(),
        question: format!("Will {} happen?", slug.replace('-', " ")),
        slug: slug.to_string(),
        volume: 0.0,
        liquidity: 0.0,
        tokens: tokens
            .iter()
            .map(|(outcome, token_id)| OutcomeToken {
                outcome: outcome.to_string(),
                token_id: token_id.to_string(),
            })
            .collect(),
    }
}

pub fn trade(side: Option<&str>, size: f64, price: f64, market_slug: &str) -> WalletTrade {
    WalletTrade {
        side: side.map(str::to_string),
        size,
        price,
        market_slug: Some(market_slug.to_string()),
    }
}

pub fn search_result(title: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        url: format!("https://news.example/{}", title.to_lowercase().replace(' ', "-")),
        snippet: format!("{title} snippet"),
        source: "test".to_string(),
    }
}

pub fn decision(market_slug: &str, signal: Signal, confidence: Decimal) -> Decision {
    Decision {
        market_question: format!("Will {} happen?", market_slug.replace('-', " ")),
        market_slug: market_slug.to_string(),
        signal,
        confidence,
        reasoning: format!("Test reasoning for {market_slug}"),
        key_factors: vec!["Test factor".to_string()],
        risk_level: RiskLevel::Medium,
    }
}

/// Persistence backed by hash maps. `calls` counts every trait call.
#[derive(Default)]
pub struct FakePersistence {
    configs: HashMap<String, UserConfig>,
    watchlists: HashMap<String, Vec<String>>,
    wallets: HashMap<String, Vec<String>>,
    active: Vec<ActiveUser>,
    fail: bool,
    fail_inserts: bool,
    pub calls: Arc<AtomicUsize>,
    pub inserted: Arc<Mutex<Vec<(String, Decision)>>>,
}

impl FakePersistence {
    /// Every call fails with a store error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    pub fn with_config(mut self, user_id: &str, config: UserConfig) -> Self {
        self.configs.insert(user_id.to_string(), config);
        self
    }

    pub fn with_watchlist(mut self, user_id: &str, ids: &[&str]) -> Self {
        self.watchlists
            .insert(user_id.to_string(), ids.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_wallets(mut self, user_id: &str, wallets: &[&str]) -> Self {
        self.wallets
            .insert(user_id.to_string(), wallets.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_active_user(mut self, user_id: &str, risk_profile: RiskProfile) -> Self {
        let config = self.configs.get(user_id).cloned().unwrap_or_default();
        self.active.push(ActiveUser {
            user_id: user_id.to_string(),
            risk_profile,
            focus_sectors: config.focus_sectors,
            sources: config.sources,
        });
        self
    }

    fn check(&self) -> Result<(), AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AgentError::Provider("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Persistence for FakePersistence {
    async fn agent_config(&self, user_id: &str) -> Result<UserConfig, AgentError> {
        self.check()?;
        Ok(self.configs.get(user_id).cloned().unwrap_or_default())
    }

    async fn watchlist_ids(&self, user_id: &str) -> Result<Vec<String>, AgentError> {
        self.check()?;
        Ok(self.watchlists.get(user_id).cloned().unwrap_or_default())
    }

    async fn tracked_wallets(&self, user_id: &str) -> Result<Vec<String>, AgentError> {
        self.check()?;
        Ok(self.wallets.get(user_id).cloned().unwrap_or_default())
    }

    async fn active_configs(&self) -> Result<Vec<ActiveUser>, AgentError> {
        self.check()?;
        Ok(self.active.clone())
    }

    async fn insert_decision(&self, user_id: &str, decision: &Decision) -> Result<bool, AgentError> {
        self.check()?;
        if self.fail_inserts {
            return Err(AgentError::Provider("insert rejected".to_string()));
        }
        self.inserted
            .lock()
            .map_err(|e| AgentError::Provider(e.to_string()))?
            .push((user_id.to_string(), decision.clone()));
        Ok(true)
    }
}

/// Market data keyed by id/slug, token and wallet.
#[derive(Default)]
pub struct FakeMarketData {
    markets: HashMap<String, MarketDetail>,
    prices: HashMap<String, f64>,
    trades: HashMap<String, Vec<WalletTrade>>,
    failing_wallets: HashSet<String>,
    fail_prices: bool,
    pub price_calls: Arc<AtomicUsize>,
    pub market_calls: Arc<AtomicUsize>,
}

impl FakeMarketData {
    pub fn with_market(mut self, id_or_slug: &str, detail: MarketDetail) -> Self {
        self.markets.insert(id_or_slug.to_string(), detail);
        self
    }

    pub fn with_price(mut self, token_id: &str, price: f64) -> Self {
        self.prices.insert(token_id.to_string(), price);
        self
    }

    pub fn with_trades(mut self, wallet: &str, trades: Vec<WalletTrade>) -> Self {
        self.trades.insert(wallet.to_string(), trades);
        self
    }

    pub fn failing_wallet(mut self, wallet: &str) -> Self {
        self.failing_wallets.insert(wallet.to_string());
        self
    }

    pub fn failing_prices(mut self) -> Self {
        self.fail_prices = true;
        self
    }
}

#[async_trait]
impl MarketDataProvider for FakeMarketData {
    async fn market(&self, id_or_slug: &str) -> Result<Option<MarketDetail>, AgentError> {
        self.market_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.markets.get(id_or_slug).cloned())
    }

    async fn prices(&self, token_ids: &[String]) -> Result<HashMap<String, f64>, AgentError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_prices {
            return Err(AgentError::Provider("price endpoint down".to_string()));
        }
        Ok(token_ids
            .iter()
            .filter_map(|id| self.prices.get(id).map(|p| (id.clone(), *p)))
            .collect())
    }

    async fn wallet_trades(&self, wallet: &str, limit: usize) -> Result<Vec<WalletTrade>, AgentError> {
        if self.failing_wallets.contains(wallet) {
            return Err(AgentError::Provider(format!("trades unavailable for {wallet}")));
        }
        Ok(self
            .trades
            .get(wallet)
            .map(|t| t.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// News that returns the same results for every query. `queries` records searches.
#[derive(Default)]
pub struct FakeNews {
    search: Vec<SearchResult>,
    general: Vec<SearchResult>,
    fail_search: bool,
    fail_general: bool,
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl FakeNews {
    pub fn with_search(mut self, results: Vec<SearchResult>) -> Self {
        self.search = results;
        self
    }

    pub fn with_general(mut self, results: Vec<SearchResult>) -> Self {
        self.general = results;
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn failing_general(mut self) -> Self {
        self.fail_general = true;
        self
    }
}

#[async_trait]
impl NewsProvider for FakeNews {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, AgentError> {
        self.queries
            .lock()
            .map_err(|e| AgentError::Provider(e.to_string()))?
            .push(query.to_string());
        if self.fail_search {
            return Err(AgentError::Provider("search quota exceeded".to_string()));
        }
        Ok(self.search.iter().take(max_results).cloned().collect())
    }

    async fn general_news(&self, limit: usize) -> Result<Vec<SearchResult>, AgentError> {
        if self.fail_general {
            return Err(AgentError::Provider("news feed down".to_string()));
        }
        Ok(self.general.iter().take(limit).cloned().collect())
    }
}

/// A completion client with a canned reply. `prompts` records (system, user) pairs.
pub struct FakeCompletion {
    reply: Result<String, String>,
    pub calls: Arc<AtomicUsize>,
    pub prompts: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeCompletion {
    pub fn returning(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: Arc::default(),
            prompts: Arc::default(),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            reply: Err(reason.to_string()),
            calls: Arc::default(),
            prompts: Arc::default(),
        }
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .map_err(|e| AgentError::Provider(e.to_string()))?
            .push((system_prompt.to_string(), user_prompt.to_string()));
        self.reply.clone().map_err(AgentError::Provider)
    }
}

/// Records every notification. Users listed via `without_channel` get `Ok(false)`.
#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    unlinked: HashSet<String>,
    pub sent: Arc<Mutex<Vec<(String, Decision)>>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn without_channel(mut self, user_id: &str) -> Self {
        self.unlinked.insert(user_id.to_string());
        self
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: &str, decision: &Decision) -> Result<bool, AgentError> {
        if self.fail {
            return Err(AgentError::Provider("telegram unreachable".to_string()));
        }
        if self.unlinked.contains(user_id) {
            return Ok(false);
        }
        self.sent
            .lock()
            .map_err(|e| AgentError::Provider(e.to_string()))?
            .push((user_id.to_string(), decision.clone()));
        Ok(true)
    }
}

/// A stage built from a closure, for exercising the runner and scheduler.
pub struct FnStage<F> {
    node: Node,
    run: F,
}

impl<F> FnStage<F>
where
    F: Fn(&PipelineState) -> StageUpdate + Send + Sync,
{
    pub fn new(node: Node, run: F) -> Self {
        Self { node, run }
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&PipelineState) -> StageUpdate + Send + Sync,
{
    fn node(&self) -> Node {
        self.node
    }

    async fn run(&self, state: &PipelineState) -> StageUpdate {
        (self.run)(state)
    }
}

/// A pipeline of the real stages wired to the given collaborators.
pub fn pipeline_with(
    persistence: Arc<dyn Persistence>,
    market_data: Arc<dyn MarketDataProvider>,
    news: Arc<dyn NewsProvider>,
    completion: Arc<dyn CompletionClient>,
) -> Result<Pipeline, PipelineError> {
    Pipeline::builder()
        .stage(Arc::new(ContextStage::new(persistence, market_data.clone())))
        .stage(Arc::new(MarketStage::new(market_data)))
        .stage(Arc::new(ResearchStage::new(news)))
        .stage(Arc::new(AdvisorStage::new(completion)))
        .build()
}
