//! Support Triage Agent
//!
//! A conversational support front-end built around a small routing graph:
//! - Classifies each customer message (escalate? look something up?)
//! - Routes to a lookup, a direct answer, or a human handoff
//! - Keeps per-thread conversation state with one turn in flight at a time
//! - Queues handoffs for human review and resumes threads once resolved
//! - Serves the thread/run protocol over HTTP for the chat client
//!
//! Also ships a one-shot city recommender backed by Gemini.
//!
//! TURN:
//! TRIAGE → ROUTE → (LOOKUP → ANSWER | ANSWER | HANDOFF)

pub mod agent;
pub mod api;
pub mod classifier;
pub mod client;
pub mod config;
pub mod error;
pub mod escalation;
pub mod gemini;
pub mod graph;
pub mod models;
pub mod state;
pub mod tools;
pub mod travel;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use classifier::{Classifier, KeywordClassifier, Signals};
pub use graph::{build_graph, RunOutcome, SupportGraph};
