//! Support agent
//!
//! Owns the per-turn lifecycle around the graph:
//! CLAIM THREAD → APPEND INPUT → RUN GRAPH → PERSIST → (ESCALATE?)
//!
//! A failed or dropped turn leaves the thread exactly as it was before
//! the turn.

use crate::error::TriageError;
use crate::escalation::{Escalation, EscalationQueue, HumanDisposition};
use crate::graph::{RunOutcome, SupportGraph};
use crate::models::{ConversationState, Message, Role};
use crate::state::{ThreadRecord, ThreadStatus, ThreadStore};
use crate::Result;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct SupportAgent {
    graph: SupportGraph,
    store: Arc<dyn ThreadStore>,
    escalations: EscalationQueue,
}

/// Held while a thread is claimed.
///
/// If the owning future is dropped before `disarm`, the thread is put back
/// with the state and status it had when it was claimed.
struct ClaimGuard {
    store: Arc<dyn ThreadStore>,
    thread_id: Uuid,
    restore: Option<(ConversationState, ThreadStatus)>,
}

impl ClaimGuard {
    fn new(
        store: &Arc<dyn ThreadStore>,
        thread_id: Uuid,
        state: ConversationState,
        status: ThreadStatus,
    ) -> Self {
        Self {
            store: Arc::clone(store),
            thread_id,
            restore: Some((state, status)),
        }
    }

    fn disarm(&mut self) {
        self.restore = None;
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        let Some((state, status)) = self.restore.take() else {
            return;
        };

        let thread_id = self.thread_id;
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            error!(thread_id = %thread_id, "Claim dropped outside a runtime, thread stays busy");
            return;
        };

        warn!(thread_id = %thread_id, "Claim dropped mid-turn, restoring thread");
        let store = Arc::clone(&self.store);
        handle.spawn(async move {
            if let Err(e) = store.release(thread_id, state, status).await {
                error!(thread_id = %thread_id, error = %e, "Failed to restore dropped claim");
            }
        });
    }
}

impl SupportAgent {
    pub fn new(
        graph: SupportGraph,
        store: Box<dyn ThreadStore>,
        escalations: EscalationQueue,
    ) -> Self {
        Self {
            graph,
            store: Arc::from(store),
            escalations,
        }
    }

    pub async fn create_thread(&self) -> Result<ThreadRecord> {
        let record = self.store.create_thread().await?;
        info!(thread_id = %record.thread_id, "Thread created");
        Ok(record)
    }

    pub async fn get_thread(&self, thread_id: Uuid) -> Result<ThreadRecord> {
        self.store
            .load_thread(thread_id)
            .await?
            .ok_or(TriageError::ThreadNotFound(thread_id))
    }

    pub async fn list_threads(&self) -> Result<Vec<ThreadRecord>> {
        self.store.list_threads().await
    }

    pub fn escalations(&self) -> &EscalationQueue {
        &self.escalations
    }

    /// Run one turn on a thread with the given new input messages.
    pub async fn run_turn(&self, thread_id: Uuid, input: Vec<Message>) -> Result<RunOutcome> {
        if input.is_empty() {
            return Err(TriageError::InvalidRequest(
                "run input has no messages".to_string(),
            ));
        }

        let record = self.store.claim(thread_id).await?;
        let previous = record.state.clone();
        let mut guard = ClaimGuard::new(
            &self.store,
            thread_id,
            previous.clone(),
            ThreadStatus::Idle,
        );

        let mut state = record.state;
        state.messages.extend(input);

        info!(
            thread_id = %thread_id,
            message_count = state.messages.len(),
            "Running turn"
        );

        let outcome = match self.graph.wait(state).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(thread_id = %thread_id, error = %e, "Turn failed");
                self.store
                    .release(thread_id, previous, ThreadStatus::Idle)
                    .await?;
                guard.disarm();
                return Err(e);
            }
        };

        match &outcome {
            RunOutcome::Completed { state, path } => {
                info!(thread_id = %thread_id, path = ?path, "Turn completed");
                self.store
                    .release(thread_id, state.clone(), ThreadStatus::Idle)
                    .await?;
            }
            RunOutcome::Interrupted {
                state, interrupt, ..
            } => {
                let customer_message = state
                    .messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::Human)
                    .map(|m| m.content.as_str())
                    .unwrap_or_default();

                let escalation = Escalation::from_interrupt(thread_id, interrupt, customer_message);
                if let Err(e) = self.escalations.enqueue(escalation).await {
                    self.store
                        .release(thread_id, previous, ThreadStatus::Idle)
                        .await?;
                    guard.disarm();
                    return Err(e);
                }

                warn!(
                    thread_id = %thread_id,
                    escalation_id = %interrupt.id,
                    "Turn handed off for human review"
                );

                self.store
                    .release(
                        thread_id,
                        state.clone(),
                        ThreadStatus::Interrupted {
                            interrupt: interrupt.clone(),
                        },
                    )
                    .await?;
            }
        }
        guard.disarm();

        Ok(outcome)
    }

    /// Record a reviewer's disposition and resume the thread.
    ///
    /// A non-empty reply is appended as an assistant message.
    pub async fn resolve(
        &self,
        thread_id: Uuid,
        disposition: HumanDisposition,
    ) -> Result<ThreadRecord> {
        let (record, interrupt) = self.store.claim_for_review(thread_id).await?;
        let mut guard = ClaimGuard::new(
            &self.store,
            thread_id,
            record.state.clone(),
            ThreadStatus::Interrupted {
                interrupt: interrupt.clone(),
            },
        );

        if let Err(e) = self.escalations.resolve(interrupt.id, &disposition).await {
            warn!(
                thread_id = %thread_id,
                escalation_id = %interrupt.id,
                error = %e,
                "Disposition rejected"
            );
            self.store
                .release(
                    thread_id,
                    record.state,
                    ThreadStatus::Interrupted { interrupt },
                )
                .await?;
            guard.disarm();
            return Err(e);
        }

        let mut state = record.state;
        if !disposition.reply.trim().is_empty() {
            state.messages.push(Message::assistant(disposition.reply.clone()));
        }

        info!(
            thread_id = %thread_id,
            escalation_id = %interrupt.id,
            approved = disposition.approved,
            "Escalation resolved"
        );

        let record = self
            .store
            .release(thread_id, state, ThreadStatus::Idle)
            .await?;
        guard.disarm();
        Ok(record)
    }
}
