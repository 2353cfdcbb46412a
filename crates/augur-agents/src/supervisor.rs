use augur_models::{Node, Phase, PipelineState};
use tracing::debug;

/// The supervisor's routing decision for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub next: Node,
    pub message: String,
}

/// Transition function: which node handles a run in the given phase.
pub fn route(phase: Phase) -> Node {
    match phase {
        Phase::Fresh => Node::Context,
        Phase::ContextLoaded => Node::MarketAnalyst,
        Phase::MarketsLoaded => Node::Researcher,
        Phase::Researched => Node::Advisor,
        Phase::Decided => Node::End,
    }
}

/// Decide the next node from which stage outputs are present. Pure; no I/O.
pub fn supervise(state: &PipelineState) -> Route {
    let next = route(state.phase());
    debug!(task = %state.task, next = %next, "Supervisor routing");
    Route {
        next,
        message: format!("Supervisor: routing to {next}"),
    }
}
