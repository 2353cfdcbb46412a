pub mod claude_cli;
pub mod collaborators;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod stages;
pub mod supervisor;

pub mod test_support;

pub use collaborators::{CompletionClient, MarketDataProvider, NewsProvider, Notifier, Persistence};
pub use error::{AgentError, PipelineError};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use stages::{AdvisorStage, ContextStage, MarketStage, ResearchStage, Stage};
pub use supervisor::{route, supervise, Route};
