//! The four worker stages. Each reads the state, calls its collaborators and
//! returns the keys it owns. Collaborator failures degrade to empty outputs
//! plus a message, so `run` is infallible.

pub mod advisor;
pub mod context;
pub mod market;
pub mod research;

use async_trait::async_trait;
use augur_models::{Node, PipelineState, StageUpdate};

pub use advisor::AdvisorStage;
pub use context::ContextStage;
pub use market::MarketStage;
pub use research::ResearchStage;

#[async_trait]
pub trait Stage: Send + Sync {
    /// The node this stage is registered under.
    fn node(&self) -> Node;

    async fn run(&self, state: &PipelineState) -> StageUpdate;
}
