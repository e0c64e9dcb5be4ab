//! Human-review queue for handoff interrupts
//!
//! Every handoff lands here as a pending escalation. A reviewer records a
//! disposition, which is what lets the thread resume.
//!
//! Each escalation carries a SHA256 of the context the reviewer is shown
//! (thread, reason, customer message). A disposition is only recorded
//! against an escalation whose context still matches that hash.

use crate::error::TriageError;
use crate::models::Interrupt;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A reviewer's decision on an escalation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HumanDisposition {
    pub approved: bool,
    /// Reply sent back to the customer as an assistant message
    pub reply: String,
    #[serde(default)]
    pub reviewer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscalationStatus {
    Pending,
    Resolved {
        approved: bool,
        reviewer: Option<String>,
        resolved_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escalation {
    /// Same id as the interrupt that raised it
    pub escalation_id: Uuid,
    pub thread_id: Uuid,
    pub node: String,
    pub reason: String,
    pub customer_message: String,
    pub context_hash: String,
    pub status: EscalationStatus,
    pub created_at: DateTime<Utc>,
}

impl Escalation {
    pub fn from_interrupt(thread_id: Uuid, interrupt: &Interrupt, customer_message: &str) -> Self {
        let context_hash = compute_context_hash(thread_id, &interrupt.reason, customer_message);

        Self {
            escalation_id: interrupt.id,
            thread_id,
            node: interrupt.node.clone(),
            reason: interrupt.reason.clone(),
            customer_message: customer_message.to_string(),
            context_hash,
            status: EscalationStatus::Pending,
            created_at: interrupt.raised_at,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == EscalationStatus::Pending
    }

    /// Recompute the context hash and compare it with the stored one
    pub fn verify(&self) -> bool {
        compute_context_hash(self.thread_id, &self.reason, &self.customer_message)
            == self.context_hash
    }
}

/// Escalation storage
pub struct EscalationQueue {
    records: Arc<RwLock<HashMap<Uuid, Escalation>>>,
}

impl EscalationQueue {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Queue an escalation for review
    pub async fn enqueue(&self, escalation: Escalation) -> Result<Uuid> {
        let escalation_id = escalation.escalation_id;
        let mut records = self.records.write().await;
        records.insert(escalation_id, escalation);
        Ok(escalation_id)
    }

    pub async fn get(&self, escalation_id: Uuid) -> Result<Option<Escalation>> {
        let records = self.records.read().await;
        Ok(records.get(&escalation_id).cloned())
    }

    /// Pending escalations, oldest first
    pub async fn list_pending(&self) -> Result<Vec<Escalation>> {
        let records = self.records.read().await;

        let mut items: Vec<Escalation> = records
            .values()
            .filter(|e| e.is_pending())
            .cloned()
            .collect();

        items.sort_by_key(|e| e.created_at);

        Ok(items)
    }

    /// Record a disposition against a pending escalation.
    ///
    /// Fails with `IntegrityError` if the escalation context was altered
    /// after it was queued; the record is left pending.
    pub async fn resolve(
        &self,
        escalation_id: Uuid,
        disposition: &HumanDisposition,
    ) -> Result<Escalation> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&escalation_id)
            .ok_or(TriageError::EscalationNotFound(escalation_id))?;

        if !record.verify() {
            return Err(TriageError::IntegrityError(escalation_id));
        }

        record.status = EscalationStatus::Resolved {
            approved: disposition.approved,
            reviewer: disposition.reviewer.clone(),
            resolved_at: Utc::now(),
        };

        Ok(record.clone())
    }

}

#[cfg(test)]
impl EscalationQueue {
    pub(crate) async fn overwrite_customer_message(&self, escalation_id: Uuid, text: &str) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&escalation_id) {
            record.customer_message = text.to_string();
        }
    }
}

impl Default for EscalationQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct EscalationSnapshot<'a> {
    thread_id: Uuid,
    reason: &'a str,
    customer_message: &'a str,
}

/// SHA256 over the escalation context, streamed straight into the hasher
pub fn compute_context_hash(thread_id: Uuid, reason: &str, customer_message: &str) -> String {
    let mut hasher = Sha256::new();
    let snapshot = EscalationSnapshot {
        thread_id,
        reason,
        customer_message,
    };

    if serde_json::to_writer(&mut HashWriter(&mut hasher), &snapshot).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
