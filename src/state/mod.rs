//! Thread persistence layer
//!
//! Keeps one `ConversationState` per thread and serializes turns:
//! a thread must be claimed (idle → busy) before a run touches it.
//! Currently uses in-memory storage behind the `ThreadStore` trait.

use crate::error::TriageError;
use crate::models::{ConversationState, Interrupt};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThreadStatus {
    Idle,
    Busy,
    Interrupted { interrupt: Interrupt },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub thread_id: Uuid,
    pub status: ThreadStatus,
    pub state: ConversationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ThreadRecord {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            thread_id: Uuid::new_v4(),
            status: ThreadStatus::Idle,
            state: ConversationState::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Trait for thread persistence
#[async_trait::async_trait]
pub trait ThreadStore: Send + Sync {
    async fn create_thread(&self) -> Result<ThreadRecord>;
    async fn load_thread(&self, thread_id: Uuid) -> Result<Option<ThreadRecord>>;
    async fn list_threads(&self) -> Result<Vec<ThreadRecord>>;

    /// Move an idle thread to busy and return it.
    async fn claim(&self, thread_id: Uuid) -> Result<ThreadRecord>;

    /// Move an interrupted thread to busy, returning it with its interrupt.
    async fn claim_for_review(&self, thread_id: Uuid) -> Result<(ThreadRecord, Interrupt)>;

    /// End a claim, storing the state and the new status.
    async fn release(
        &self,
        thread_id: Uuid,
        state: ConversationState,
        status: ThreadStatus,
    ) -> Result<ThreadRecord>;
}

/// In-memory thread store for development
pub struct InMemoryThreadStore {
    threads: Arc<RwLock<HashMap<Uuid, ThreadRecord>>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryThreadStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ThreadStore for InMemoryThreadStore {

    async fn create_thread(&self) -> Result<ThreadRecord> {
        let record = ThreadRecord::new();
        let mut threads = self.threads.write().await;
        threads.insert(record.thread_id, record.clone());
        Ok(record)
    }

    async fn load_thread(&self, thread_id: Uuid) -> Result<Option<ThreadRecord>> {
        let threads = self.threads.read().await;
        Ok(threads.get(&thread_id).cloned())
    }

    async fn list_threads(&self) -> Result<Vec<ThreadRecord>> {
        let threads = self.threads.read().await;
        let mut records: Vec<ThreadRecord> = threads.values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn claim(&self, thread_id: Uuid) -> Result<ThreadRecord> {
        // Check and transition under a single write lock
        let mut threads = self.threads.write().await;
        let record = threads
            .get_mut(&thread_id)
            .ok_or(TriageError::ThreadNotFound(thread_id))?;

        match record.status {
            ThreadStatus::Idle => {}
            ThreadStatus::Busy => return Err(TriageError::ThreadBusy(thread_id)),
            ThreadStatus::Interrupted { .. } => {
                return Err(TriageError::AwaitingReview(thread_id))
            }
        }

        record.status = ThreadStatus::Busy;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn claim_for_review(&self, thread_id: Uuid) -> Result<(ThreadRecord, Interrupt)> {
        let mut threads = self.threads.write().await;
        let record = threads
            .get_mut(&thread_id)
            .ok_or(TriageError::ThreadNotFound(thread_id))?;

        let interrupt = match &record.status {
            ThreadStatus::Interrupted { interrupt } => interrupt.clone(),
            ThreadStatus::Busy => return Err(TriageError::ThreadBusy(thread_id)),
            ThreadStatus::Idle => return Err(TriageError::NotAwaitingReview(thread_id)),
        };

        record.status = ThreadStatus::Busy;
        record.updated_at = Utc::now();
        Ok((record.clone(), interrupt))
    }

    async fn release(
        &self,
        thread_id: Uuid,
        state: ConversationState,
        status: ThreadStatus,
    ) -> Result<ThreadRecord> {
        let mut threads = self.threads.write().await;
        let record = threads
            .get_mut(&thread_id)
            .ok_or(TriageError::ThreadNotFound(thread_id))?;

        record.state = state;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}
