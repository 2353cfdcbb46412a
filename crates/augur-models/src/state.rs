//! The state threaded through one pipeline run for one user.
//!
//! Stage outputs are optional fields: `None` means the producing stage has not
//! run yet, `Some(vec![])` means it ran and found nothing. Fields are only
//! filled through [`PipelineState::apply`], whose [`StageOutput`] variants
//! carry every key a stage owns, so a stage cannot finish without setting them.

use serde::{Deserialize, Serialize};

use crate::decision::Decision;
use crate::market::{MarketRef, MarketSnapshot, NewsItem, WalletActivity};
use crate::profile::UserConfig;

pub const PROACTIVE_SCAN_TASK: &str = "proactive_scan";

/// Routing destinations chosen by the supervisor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Node {
    #[serde(rename = "context")]
    Context,
    #[serde(rename = "market_analyst")]
    MarketAnalyst,
    #[serde(rename = "researcher")]
    Researcher,
    #[serde(rename = "advisor")]
    Advisor,
    #[serde(rename = "END")]
    End,
}

impl Node {
    /// Worker nodes in pipeline order.
    pub const WORKERS: [Node; 4] = [
        Node::Context,
        Node::MarketAnalyst,
        Node::Researcher,
        Node::Advisor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::MarketAnalyst => "market_analyst",
            Self::Researcher => "researcher",
            Self::Advisor => "advisor",
            Self::End => "END",
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a run has progressed, derived from which stage outputs are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Fresh,
    ContextLoaded,
    MarketsLoaded,
    Researched,
    Decided,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineState {
    pub user_id: String,
    pub task: String,
    #[serde(default)]
    pub user_config: UserConfig,
    #[serde(default)]
    pub watchlist_markets: Option<Vec<MarketRef>>,
    #[serde(default)]
    pub tracked_wallets: Option<Vec<String>>,
    #[serde(default)]
    pub market_snapshots: Option<Vec<MarketSnapshot>>,
    #[serde(default)]
    pub smart_money_trades: Option<Vec<WalletActivity>>,
    #[serde(default)]
    pub news_items: Option<Vec<NewsItem>>,
    #[serde(default)]
    pub decisions: Option<Vec<Decision>>,
    #[serde(default)]
    pub next_node: Option<Node>,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl PipelineState {
    pub fn new(user_id: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            task: task.into(),
            ..Self::default()
        }
    }

    pub fn proactive_scan(user_id: impl Into<String>) -> Self {
        Self::new(user_id, PROACTIVE_SCAN_TASK)
    }

    /// Fixed-priority presence check: the first missing output decides the phase.
    pub fn phase(&self) -> Phase {
        if self.watchlist_markets.is_none() {
            Phase::Fresh
        } else if self.market_snapshots.is_none() {
            Phase::ContextLoaded
        } else if self.news_items.is_none() {
            Phase::MarketsLoaded
        } else if self.decisions.is_none() {
            Phase::Researched
        } else {
            Phase::Decided
        }
    }

    /// Merge a stage's output. Messages are appended, never replaced.
    pub fn apply(&mut self, update: StageUpdate) {
        match update.output {
            StageOutput::Context {
                user_config,
                watchlist_markets,
                tracked_wallets,
            } => {
                self.user_config = user_config;
                self.watchlist_markets = Some(watchlist_markets);
                self.tracked_wallets = Some(tracked_wallets);
            }
            StageOutput::Market {
                market_snapshots,
                smart_money_trades,
            } => {
                self.market_snapshots = Some(market_snapshots);
                self.smart_money_trades = Some(smart_money_trades);
            }
            StageOutput::Research { news_items } => {
                self.news_items = Some(news_items);
            }
            StageOutput::Advisor { decisions } => {
                self.decisions = Some(decisions);
            }
        }
        self.messages.extend(update.messages);
    }

    pub fn watchlist_markets(&self) -> &[MarketRef] {
        self.watchlist_markets.as_deref().unwrap_or_default()
    }

    pub fn tracked_wallets(&self) -> &[String] {
        self.tracked_wallets.as_deref().unwrap_or_default()
    }

    pub fn market_snapshots(&self) -> &[MarketSnapshot] {
        self.market_snapshots.as_deref().unwrap_or_default()
    }

    pub fn smart_money_trades(&self) -> &[WalletActivity] {
        self.smart_money_trades.as_deref().unwrap_or_default()
    }

    pub fn news_items(&self) -> &[NewsItem] {
        self.news_items.as_deref().unwrap_or_default()
    }

    pub fn decisions(&self) -> &[Decision] {
        self.decisions.as_deref().unwrap_or_default()
    }
}

/// The keys a worker stage owns, all of them mandatory.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Context {
        user_config: UserConfig,
        watchlist_markets: Vec<MarketRef>,
        tracked_wallets: Vec<String>,
    },
    Market {
        market_snapshots: Vec<MarketSnapshot>,
        smart_money_trades: Vec<WalletActivity>,
    },
    Research {
        news_items: Vec<NewsItem>,
    },
    Advisor {
        decisions: Vec<Decision>,
    },
}

impl StageOutput {
    /// The node that owns this output.
    pub fn node(&self) -> Node {
        match self {
            Self::Context { .. } => Node::Context,
            Self::Market { .. } => Node::MarketAnalyst,
            Self::Research { .. } => Node::Researcher,
            Self::Advisor { .. } => Node::Advisor,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageUpdate {
    pub output: StageOutput,
    pub messages: Vec<String>,
}

impl StageUpdate {
    pub fn new(output: StageOutput) -> Self {
        Self {
            output,
            messages: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}
