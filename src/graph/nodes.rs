//! Node functions of the support graph
//!
//! Each node reads the state and returns a partial update, except
//! `handoff`, which always interrupts. They can be called without the
//! executor.

use crate::classifier::Classifier;
use crate::error::TriageError;
use crate::graph::router::NodeName;
use crate::models::{ConversationState, Interrupt, Message, StateUpdate};
use crate::tools::LookupTool;
use crate::Result;
use tracing::{debug, warn};

/// Reply when no lookup happened this turn
pub const ACKNOWLEDGEMENT: &str = "Got it. Homework question is now answered!";

/// Interrupt reason raised by `handoff`
pub const HANDOFF_REASON: &str = "Escalate to a human agent: refund/complaint requires approval.";

/// What a node hands back to the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    Continue(StateUpdate),
    Interrupt(Interrupt),
}

/// Classify the last message and reset the turn-scoped lookup fields.
///
/// Fails with `EmptyConversation` when there is nothing to classify.
pub fn triage(state: &ConversationState, classifier: &dyn Classifier) -> Result<StateUpdate> {
    let last = state.last_message().ok_or(TriageError::EmptyConversation)?;
    let signals = classifier.classify(&last.content);

    debug!(
        need_human = signals.need_human,
        needs_tool = signals.needs_tool,
        "Triage complete"
    );

    Ok(StateUpdate {
        need_human: Some(signals.need_human),
        needs_tool: Some(signals.needs_tool),
        question_result: Some(None),
        lookup_error: Some(None),
        ..StateUpdate::default()
    })
}

/// Run the lookup tool. Tool errors are recorded for `answer`; anything
/// else propagates.
pub async fn question_lookup(
    state: &ConversationState,
    tool: &dyn LookupTool,
) -> Result<StateUpdate> {
    match tool.lookup(state).await {
        Ok(result) => Ok(StateUpdate {
            question_result: Some(Some(result)),
            ..StateUpdate::default()
        }),
        Err(TriageError::ToolError(reason)) => {
            warn!(tool = tool.name(), error = %reason, "Lookup tool failed");
            Ok(StateUpdate {
                question_result: Some(None),
                lookup_error: Some(Some(reason)),
                ..StateUpdate::default()
            })
        }
        Err(e) => Err(e),
    }
}

/// Compose the assistant reply for this turn.
pub fn answer(state: &ConversationState) -> StateUpdate {
    let text = match (&state.lookup_error, &state.question_result) {
        (Some(error), _) => format!("Update unavailable: {}", error),
        (None, Some(result)) if !result.is_empty() => format!("Update: {}", result),
        _ => ACKNOWLEDGEMENT.to_string(),
    };

    StateUpdate::append(Message::assistant(text))
}

/// Always interrupts; never touches the state.
pub fn handoff(_state: &ConversationState) -> NodeOutcome {
    NodeOutcome::Interrupt(Interrupt::new(NodeName::Handoff.as_str(), HANDOFF_REASON))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::KeywordClassifier;
    use crate::models::Role;
    use crate::tools::{PlaceholderLookup, PLACEHOLDER_RESULT};

    struct FailingTool(fn() -> TriageError);

    #[async_trait::async_trait]
    impl LookupTool for FailingTool {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn lookup(&self, _state: &ConversationState) -> Result<String> {
            Err((self.0)())
        }
    }

    #[test]
    fn test_triage_reads_last_message_only() {
        let mut state = ConversationState::from_human("I want a refund");
        state.messages.push(Message::assistant("Sorry to hear that"));
        state.messages.push(Message::human("where is my order"));

        let update = triage(&state, &KeywordClassifier).unwrap();
        assert_eq!(update.need_human, Some(false));
        assert_eq!(update.needs_tool, Some(true));
    }

    #[test]
    fn test_triage_clears_lookup_fields() {
        let state = ConversationState {
            question_result: Some("stale".to_string()),
            lookup_error: Some("stale".to_string()),
            ..ConversationState::from_human("hello")
        };

        let update = triage(&state, &KeywordClassifier).unwrap();
        assert_eq!(update.question_result, Some(None));
        assert_eq!(update.lookup_error, Some(None));
        assert!(update.messages.is_empty());
    }

    #[test]
    fn test_triage_empty_conversation() {
        let result = triage(&ConversationState::new(), &KeywordClassifier);
        assert!(matches!(result, Err(TriageError::EmptyConversation)));
    }

    #[tokio::test]
    async fn test_question_lookup_sets_result() {
        let state = ConversationState::from_human("order status");
        let update = question_lookup(&state, &PlaceholderLookup).await.unwrap();
        assert_eq!(
            update.question_result,
            Some(Some(PLACEHOLDER_RESULT.to_string()))
        );
    }

    #[tokio::test]
    async fn test_question_lookup_records_tool_error() {
        let state = ConversationState::from_human("order status");
        let tool = FailingTool(|| TriageError::ToolError("backend down".to_string()));

        let update = question_lookup(&state, &tool).await.unwrap();
        assert_eq!(update.lookup_error, Some(Some("backend down".to_string())));
    }

    #[tokio::test]
    async fn test_question_lookup_propagates_other_errors() {
        let state = ConversationState::from_human("order status");
        let tool = FailingTool(|| TriageError::Unknown("bug".to_string()));

        let result = question_lookup(&state, &tool).await;
        assert!(matches!(result, Err(TriageError::Unknown(_))));
    }

    #[test]
    fn test_answer_variants() {
        let mut state = ConversationState::from_human("hi");
        let update = answer(&state);
        assert_eq!(update.messages[0].content, ACKNOWLEDGEMENT);
        assert_eq!(update.messages[0].role, Role::Assistant);

        state.question_result = Some(String::new());
        assert_eq!(answer(&state).messages[0].content, ACKNOWLEDGEMENT);

        state.question_result = Some("Shipped".to_string());
        assert_eq!(answer(&state).messages[0].content, "Update: Shipped");

        state.lookup_error = Some("timeout".to_string());
        assert_eq!(
            answer(&state).messages[0].content,
            "Update unavailable: timeout"
        );
    }

    #[test]
    fn test_handoff_interrupts() {
        let state = ConversationState::from_human("refund");
        match handoff(&state) {
            NodeOutcome::Interrupt(interrupt) => {
                assert_eq!(interrupt.node, "handoff");
                assert!(interrupt.reason.contains("refund/complaint requires approval"));
            }
            other => panic!("expected interrupt, got {:?}", other),
        }
    }
}
