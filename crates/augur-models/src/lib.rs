pub mod config;
pub mod decision;
pub mod market;
pub mod profile;
pub mod schema;
pub mod state;

pub use config::{AugurConfig, FeedConfig, LlmBackend, LlmConfig, ProvidersConfig, StoreConfig};
pub use decision::{AnalyzeResponse, Decision, RiskLevel, Signal, StoredDecision};
pub use market::{
    MarketDetail, MarketRef, MarketSnapshot, NewsItem, OutcomeToken, Relevance, SearchResult,
    WalletActivity, WalletTrade,
};
pub use profile::{ActiveUser, RiskProfile, Source, UserConfig};
pub use state::{Node, Phase, PipelineState, StageOutput, StageUpdate};
