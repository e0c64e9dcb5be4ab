//! Error types for the support triage agent

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for triage operations
pub type Result<T> = std::result::Result<T, TriageError>;

#[derive(Error, Debug)]
pub enum TriageError {

    // =============================
    // Graph Errors
    // =============================

    /// Triage was reached with no message to classify.
    #[error("Conversation has no messages to triage")]
    EmptyConversation,

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    // =============================
    // Thread Lifecycle Errors
    // =============================

    #[error("Thread not found: {0}")]
    ThreadNotFound(Uuid),

    #[error("Thread {0} already has a run in flight")]
    ThreadBusy(Uuid),

    #[error("Thread {0} is waiting for human review")]
    AwaitingReview(Uuid),

    #[error("Thread {0} has no pending review")]
    NotAwaitingReview(Uuid),

    #[error("Escalation not found: {0}")]
    EscalationNotFound(Uuid),

    /// Stored escalation context no longer matches its hash.
    #[error("Escalation {0} failed integrity check")]
    IntegrityError(Uuid),

    // =============================
    // Surface Errors
    // =============================

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
