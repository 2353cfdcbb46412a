use augur_models::Node;
use thiserror::Error;

/// Failures raised by collaborators and inside stages. Stages turn these into
/// empty outputs plus a message; they never cross the pipeline boundary.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Store error: {0}")]
    Store(#[from] augur_store::StoreError),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("Model response parse error: {0}")]
    Parse(String),

    #[error("Completion timed out after {0} seconds")]
    Timeout(u64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Hard errors of the pipeline runner.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No stage registered for node {0}")]
    MissingStage(Node),

    #[error("Stage for {expected} returned output for {got}")]
    StageMismatch { expected: Node, got: Node },

    #[error("Pipeline exceeded {0} worker invocations without reaching END")]
    StepLimit(usize),
}
