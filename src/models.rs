//! Core data models for the support triage agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Messages =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "user")]
    Human,
    #[serde(alias = "ai")]
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Human => "human",
            Role::Assistant => "assistant",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

//
// ================= Conversation State =================
//

/// State threaded through every node of a turn.
///
/// `messages` is append-only. The remaining fields are rewritten by the
/// nodes of the current turn; `triage` clears the lookup fields so nothing
/// leaks from an earlier turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub need_human: bool,
    #[serde(default)]
    pub needs_tool: bool,
    #[serde(default)]
    pub question_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_error: Option<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh state holding a single human message
    pub fn from_human(content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::human(content)],
            ..Self::default()
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Last assistant reply, if any
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Merge a node's partial update into the state.
    pub fn apply(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);

        if let Some(need_human) = update.need_human {
            self.need_human = need_human;
        }
        if let Some(needs_tool) = update.needs_tool {
            self.needs_tool = needs_tool;
        }
        if let Some(question_result) = update.question_result {
            self.question_result = question_result;
        }
        if let Some(lookup_error) = update.lookup_error {
            self.lookup_error = lookup_error;
        }
    }
}

/// Partial update returned by a node.
///
/// For the optional fields, `None` leaves the current value alone and
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub need_human: Option<bool>,
    pub needs_tool: Option<bool>,
    pub question_result: Option<Option<String>>,
    pub lookup_error: Option<Option<String>>,
}

impl StateUpdate {
    pub fn append(message: Message) -> Self {
        Self {
            messages: vec![message],
            ..Self::default()
        }
    }
}

//
// ================= Interrupt =================
//

/// Designed halt of a run, waiting on a human.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interrupt {
    pub id: Uuid,
    pub node: String,
    pub reason: String,
    pub raised_at: DateTime<Utc>,
}

impl Interrupt {
    pub fn new(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            node: node.into(),
            reason: reason.into(),
            raised_at: Utc::now(),
        }
    }
}
