use augur_agents::{AgentError, PipelineError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to list active users: {0}")]
    ActiveUsers(#[source] AgentError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Scan task failed: {0}")]
    Task(String),
}
