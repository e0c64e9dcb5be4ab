//! Triage-and-dispatch graph
//!
//! triage → handoff (interrupt)
//!        → question_lookup → answer
//!        → answer
//!
//! `build_graph` wires the classifier and lookup tool into an executable
//! [`SupportGraph`]. One call to `wait` is one turn.

pub mod nodes;
pub mod router;

pub use nodes::{NodeOutcome, ACKNOWLEDGEMENT, HANDOFF_REASON};
pub use router::{route_after_triage, NodeName, Route};

use crate::classifier::{Classifier, KeywordClassifier};
use crate::models::{ConversationState, Interrupt};
use crate::tools::{LookupTool, PlaceholderLookup};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of one traversal of the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed {
        state: ConversationState,
        path: Vec<NodeName>,
    },
    Interrupted {
        state: ConversationState,
        path: Vec<NodeName>,
        interrupt: Interrupt,
    },
}

impl RunOutcome {
    pub fn state(&self) -> &ConversationState {
        match self {
            RunOutcome::Completed { state, .. } | RunOutcome::Interrupted { state, .. } => state,
        }
    }

    pub fn path(&self) -> &[NodeName] {
        match self {
            RunOutcome::Completed { path, .. } | RunOutcome::Interrupted { path, .. } => path,
        }
    }

    pub fn interrupt(&self) -> Option<&Interrupt> {
        match self {
            RunOutcome::Interrupted { interrupt, .. } => Some(interrupt),
            RunOutcome::Completed { .. } => None,
        }
    }

    pub fn into_state(self) -> ConversationState {
        match self {
            RunOutcome::Completed { state, .. } | RunOutcome::Interrupted { state, .. } => state,
        }
    }
}

/// Executable support graph
#[derive(Clone)]
pub struct SupportGraph {
    classifier: Arc<dyn Classifier>,
    lookup: Arc<dyn LookupTool>,
}

/// Compile the graph around the given classifier and lookup tool
pub fn build_graph(classifier: Arc<dyn Classifier>, lookup: Arc<dyn LookupTool>) -> SupportGraph {
    SupportGraph { classifier, lookup }
}

impl Default for SupportGraph {
    fn default() -> Self {
        build_graph(Arc::new(KeywordClassifier), Arc::new(PlaceholderLookup))
    }
}

impl SupportGraph {
    /// Run one turn and return the final state. When interrupted, the
    /// state is the one at the interrupt point.
    pub async fn invoke(&self, state: ConversationState) -> Result<ConversationState> {
        Ok(self.wait(state).await?.into_state())
    }

    /// Run one turn, reporting either completion or the interrupt.
    pub async fn wait(&self, state: ConversationState) -> Result<RunOutcome> {
        let mut state = state;
        let mut path = Vec::with_capacity(3);
        let mut current = NodeName::Triage;

        loop {
            path.push(current);
            debug!(node = %current, "Entering node");

            let update = match self.run_node(current, &state).await? {
                NodeOutcome::Continue(update) => update,
                NodeOutcome::Interrupt(interrupt) => {
                    info!(
                        node = %current,
                        reason = %interrupt.reason,
                        "Run interrupted"
                    );
                    return Ok(RunOutcome::Interrupted {
                        state,
                        path,
                        interrupt,
                    });
                }
            };
            state.apply(update);

            match self.next_node(current, &state) {
                Some(next) => current = next,
                None => return Ok(RunOutcome::Completed { state, path }),
            }
        }
    }

    async fn run_node(&self, node: NodeName, state: &ConversationState) -> Result<NodeOutcome> {
        let outcome = match node {
            NodeName::Triage => {
                NodeOutcome::Continue(nodes::triage(state, self.classifier.as_ref())?)
            }
            NodeName::QuestionLookup => {
                NodeOutcome::Continue(nodes::question_lookup(state, self.lookup.as_ref()).await?)
            }
            NodeName::Answer => NodeOutcome::Continue(nodes::answer(state)),
            NodeName::Handoff => nodes::handoff(state),
        };
        Ok(outcome)
    }

    fn next_node(&self, current: NodeName, state: &ConversationState) -> Option<NodeName> {
        match current {
            NodeName::Triage => {
                let route = route_after_triage(state);
                debug!(route = ?route, "Routed after triage");
                Some(route.into())
            }
            NodeName::QuestionLookup => Some(NodeName::Answer),
            NodeName::Answer | NodeName::Handoff => None,
        }
    }
}
