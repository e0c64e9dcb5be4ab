//! Routing after triage
//!
//! Strict priority: escalation beats lookup, lookup beats a direct answer.

use crate::models::ConversationState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Node names of the support graph
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeName {
    Triage,
    QuestionLookup,
    Answer,
    Handoff,
}

impl NodeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeName::Triage => "triage",
            NodeName::QuestionLookup => "question_lookup",
            NodeName::Answer => "answer",
            NodeName::Handoff => "handoff",
        }
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three labels the router can pick after `triage`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Handoff,
    QuestionLookup,
    Answer,
}

impl From<Route> for NodeName {
    fn from(route: Route) -> Self {
        match route {
            Route::Handoff => NodeName::Handoff,
            Route::QuestionLookup => NodeName::QuestionLookup,
            Route::Answer => NodeName::Answer,
        }
    }
}

/// First match wins: `need_human`, then `needs_tool`, then `answer`.
pub fn route_after_triage(state: &ConversationState) -> Route {
    if state.need_human {
        Route::Handoff
    } else if state.needs_tool {
        Route::QuestionLookup
    } else {
        Route::Answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(need_human: bool, needs_tool: bool) -> ConversationState {
        ConversationState {
            need_human,
            needs_tool,
            ..ConversationState::from_human("x")
        }
    }

    #[test]
    fn test_route_table() {
        let cases = vec![
            (true, true, Route::Handoff),
            (true, false, Route::Handoff),
            (false, true, Route::QuestionLookup),
            (false, false, Route::Answer),
        ];

        for (need_human, needs_tool, expected) in cases {
            assert_eq!(
                route_after_triage(&state_with(need_human, needs_tool)),
                expected
            );
        }
    }

    #[test]
    fn test_node_names() {
        assert_eq!(NodeName::from(Route::QuestionLookup).as_str(), "question_lookup");
        assert_eq!(NodeName::Handoff.to_string(), "handoff");
    }
}
