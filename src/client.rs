//! HTTP client for the run server
//!
//! Used by the chat REPL. Keeps the current thread id and turns a
//! `runs/wait` response into something renderable.

use crate::error::TriageError;
use crate::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// What the chat front-end should render for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReply {
    Assistant(String),
    /// The run was handed off; render as "needs human review"
    NeedsReview(String),
    /// Completed but no assistant text could be found
    Unparsed(Value),
}

pub struct RunClient {
    client: Client,
    base_url: String,
    assistant_id: String,
    thread_id: Option<String>,
}

impl RunClient {
    pub fn new(base_url: &str, assistant_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            assistant_id: assistant_id.into(),
            thread_id: None,
        })
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    /// Forget the current thread; the next run creates a new one.
    pub fn reset_thread(&mut self) {
        self.thread_id = None;
    }

    /// Create a thread on the server unless one is already known.
    pub async fn ensure_thread(&mut self) -> Result<String> {
        if let Some(thread_id) = &self.thread_id {
            return Ok(thread_id.clone());
        }

        let url = format!("{}/threads", self.base_url);
        let data: Value = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(20))
            .json(&json!({}))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let thread_id = parse_thread_id(&data)?;
        debug!(thread_id = %thread_id, "Created thread");

        self.thread_id = Some(thread_id.clone());
        Ok(thread_id)
    }

    /// POST /threads/{thread_id}/runs/wait
    pub async fn run_wait(&self, thread_id: &str, user_text: &str) -> Result<Value> {
        let url = format!("{}/threads/{}/runs/wait", self.base_url, thread_id);

        let payload = json!({
            "assistant_id": self.assistant_id,
            "input": {
                "messages": [{"role": "human", "content": user_text}]
            },
            "config": {"configurable": {"thread_id": thread_id}},
        });

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(120))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TriageError::InvalidRequest(format!(
                "404 Not Found calling {}. Check that thread_id exists and assistant_id='{}' exists.",
                url, self.assistant_id
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TriageError::Unknown(format!(
                "Run failed with {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    /// Ensure a thread, run one turn and extract the reply.
    pub async fn send(&mut self, user_text: &str) -> Result<RunReply> {
        let thread_id = self.ensure_thread().await?;
        let data = self.run_wait(&thread_id, user_text).await?;
        Ok(extract_reply(&data))
    }

    /// GET /assistants/{assistant_id} answers 200
    pub async fn assistant_exists(&self) -> Result<bool> {
        let url = format!("{}/assistants/{}", self.base_url, self.assistant_id);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;
        Ok(response.status() == StatusCode::OK)
    }
}

/// Thread id from a create-thread response: `thread_id` or `id`
pub fn parse_thread_id(data: &Value) -> Result<String> {
    ["thread_id", "id"]
        .iter()
        .filter_map(|key| data.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            TriageError::InvalidRequest(format!(
                "Could not parse thread id from /threads response: {}",
                data
            ))
        })
}

/// Pick the reply out of the common `runs/wait` response shapes.
///
/// An interrupt wins over everything, since its last message is the
/// customer's own.
pub fn extract_reply(data: &Value) -> RunReply {
    if let Some(reason) = interrupt_reason(data) {
        return RunReply::NeedsReview(reason);
    }

    if let Some(text) = last_message_text(data) {
        return RunReply::Assistant(text);
    }

    for key in ["final", "content", "text", "answer"] {
        if let Some(v) = data.get(key).and_then(Value::as_str) {
            if !v.trim().is_empty() {
                return RunReply::Assistant(v.to_string());
            }
        }
    }

    RunReply::Unparsed(data.clone())
}

fn interrupt_reason(data: &Value) -> Option<String> {
    let first = data.get("__interrupt__")?.as_array()?.first()?;
    let reason = match first.get("value") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => first.to_string(),
    };
    Some(reason)
}

fn last_message_text(data: &Value) -> Option<String> {
    let out = ["output", "result", "state"]
        .iter()
        .filter_map(|key| data.get(*key))
        .find(|v| !v.is_null())
        .unwrap_or(data);

    let last = out.get("messages")?.as_array()?.last()?;
    match last {
        Value::Object(_) => ["content", "text"]
            .iter()
            .filter_map(|key| last.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string),
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_thread_id() {
        assert_eq!(parse_thread_id(&json!({"thread_id": "t-1"})).unwrap(), "t-1");
        assert_eq!(parse_thread_id(&json!({"id": "t-2"})).unwrap(), "t-2");
        assert!(parse_thread_id(&json!({"other": 1})).is_err());
    }

    #[test]
    fn test_extract_from_root_messages() {
        let data = json!({
            "messages": [
                {"role": "human", "content": "Where is my order?"},
                {"role": "assistant", "content": "Update: shipped"}
            ],
            "need_human": false
        });
        assert_eq!(
            extract_reply(&data),
            RunReply::Assistant("Update: shipped".to_string())
        );
    }

    #[test]
    fn test_extract_from_nested_output() {
        let data = json!({"output": {"messages": [{"text": "hello"}]}});
        assert_eq!(extract_reply(&data), RunReply::Assistant("hello".to_string()));

        let data = json!({"state": {"messages": ["plain"]}});
        assert_eq!(extract_reply(&data), RunReply::Assistant("plain".to_string()));
    }

    #[test]
    fn test_extract_from_top_level_fields() {
        let data = json!({"answer": "42", "final": "  "});
        assert_eq!(extract_reply(&data), RunReply::Assistant("42".to_string()));
    }

    #[test]
    fn test_interrupt_wins() {
        let data = json!({
            "messages": [{"role": "human", "content": "I want a refund"}],
            "__interrupt__": [{"value": "Escalate to a human agent: refund/complaint requires approval."}]
        });
        match extract_reply(&data) {
            RunReply::NeedsReview(reason) => assert!(reason.contains("requires approval")),
            other => panic!("expected review, got {:?}", other),
        }
    }

    #[test]
    fn test_unparsed() {
        let data = json!({"status": "success"});
        assert_eq!(extract_reply(&data), RunReply::Unparsed(data.clone()));
    }

    #[tokio::test]
    async fn test_client_keeps_thread_until_reset() {
        let mut client = RunClient::new("http://127.0.0.1:2024/", "agent").unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:2024");
        assert!(client.thread_id().is_none());

        // A known thread is reused without calling the server
        client.thread_id = Some("t-1".to_string());
        assert_eq!(client.ensure_thread().await.unwrap(), "t-1");

        client.reset_thread();
        assert!(client.thread_id().is_none());
    }

    /// Start the run server on an ephemeral local port
    async fn spawn_server() -> String {
        use crate::agent::SupportAgent;
        use crate::api::{create_router, ApiState};
        use crate::escalation::EscalationQueue;
        use crate::graph::SupportGraph;
        use crate::state::InMemoryThreadStore;
        use std::sync::Arc;

        let agent = SupportAgent::new(
            SupportGraph::default(),
            Box::new(InMemoryThreadStore::new()),
            EscalationQueue::new(),
        );
        let router = create_router(ApiState {
            agent: Arc::new(agent),
            assistant_id: "agent".to_string(),
            recommender: None,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_conversation_against_server() {
        let base = spawn_server().await;
        let mut client = RunClient::new(&base, "agent").unwrap();
        assert!(client.assistant_exists().await.unwrap());

        let reply = client.send("Where is my order?").await.unwrap();
        assert_eq!(
            reply,
            RunReply::Assistant("Update: Homework question is completed! Good job!".to_string())
        );

        let thread_id = client.thread_id().unwrap().to_string();
        assert_eq!(client.ensure_thread().await.unwrap(), thread_id);

        let reply = client.send("Hello, how are you?").await.unwrap();
        assert_eq!(
            reply,
            RunReply::Assistant("Got it. Homework question is now answered!".to_string())
        );
        assert_eq!(client.thread_id(), Some(thread_id.as_str()));

        let reply = client.send("I want a refund, this is a complaint").await.unwrap();
        match reply {
            RunReply::NeedsReview(reason) => {
                assert!(reason.contains("refund/complaint requires approval"))
            }
            other => panic!("expected review, got {:?}", other),
        }

        // Interrupted thread rejects further runs; a fresh thread does not
        assert!(client.send("hello?").await.is_err());
        client.reset_thread();
        assert!(matches!(
            client.send("hello?").await.unwrap(),
            RunReply::Assistant(_)
        ));
        assert_ne!(client.thread_id(), Some(thread_id.as_str()));
    }

    #[tokio::test]
    async fn test_unknown_assistant_against_server() {
        let base = spawn_server().await;
        let mut client = RunClient::new(&base, "missing").unwrap();
        assert!(!client.assistant_exists().await.unwrap());

        let thread_id = client.ensure_thread().await.unwrap();
        let err = client.run_wait(&thread_id, "hi").await.unwrap_err();
        match err {
            TriageError::InvalidRequest(msg) => {
                assert!(msg.starts_with("404 Not Found"), "{}", msg);
                assert!(msg.contains(&thread_id), "{}", msg);
                assert!(msg.contains("assistant_id='missing'"), "{}", msg);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
