//! Lookup tools for the `question_lookup` node
//!
//! A tool receives the conversation state and returns a result string.
//! Failures are reported as `TriageError::ToolError` so the graph can
//! surface them in the reply instead of aborting the turn.

use crate::error::TriageError;
use crate::models::ConversationState;
use crate::Result;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Fixed result returned by [`PlaceholderLookup`]
pub const PLACEHOLDER_RESULT: &str = "Homework question is completed! Good job!";

/// Trait for the order/shipment lookup seam
#[async_trait::async_trait]
pub trait LookupTool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn lookup(&self, state: &ConversationState) -> Result<String>;
}

/// Always succeeds with [`PLACEHOLDER_RESULT`]
pub struct PlaceholderLookup;

#[async_trait::async_trait]
impl LookupTool for PlaceholderLookup {
    fn name(&self) -> &'static str {
        "placeholder_lookup"
    }

    async fn lookup(&self, _state: &ConversationState) -> Result<String> {
        Ok(PLACEHOLDER_RESULT.to_string())
    }
}

/// HTTP-backed lookup against an order service.
///
/// POSTs `{"query": <last message>, "message_count": n}` to `<base_url>/lookup`
/// and expects a JSON body with a `result` (or `status`) string.
#[derive(Clone)]
pub struct HttpLookupTool {
    client: Client,
    base_url: String,
}

impl HttpLookupTool {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl LookupTool for HttpLookupTool {
    fn name(&self) -> &'static str {
        "http_lookup"
    }

    async fn lookup(&self, state: &ConversationState) -> Result<String> {
        let url = format!("{}/lookup", self.base_url);
        let query = state
            .last_message()
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        debug!(url = %url, "Calling lookup service");

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "query": query,
                "message_count": state.messages.len(),
            }))
            .send()
            .await
            .map_err(|e| TriageError::ToolError(format!("Lookup request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TriageError::ToolError(format!(
                "Lookup service returned {}: {}",
                status, body
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| TriageError::ToolError(format!("Invalid JSON response: {}", e)))?;

        extract_lookup_result(&body)
    }
}

fn extract_lookup_result(body: &Value) -> Result<String> {
    ["result", "status"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            TriageError::ToolError(format!("Lookup response has no result: {}", body))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::KeywordClassifier;
    use crate::graph::build_graph;
    use crate::models::Role;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_placeholder_lookup() {
        let state = ConversationState::from_human("Where is my order?");
        let result = PlaceholderLookup.lookup(&state).await.unwrap();
        assert_eq!(result, PLACEHOLDER_RESULT);
    }

    #[test]
    fn test_extract_lookup_result() {
        let body = json!({"result": "Shipped yesterday"});
        assert_eq!(extract_lookup_result(&body).unwrap(), "Shipped yesterday");

        let body = json!({"result": "  ", "status": "In transit"});
        assert_eq!(extract_lookup_result(&body).unwrap(), "In transit");

        let body = json!({"other": 1});
        assert!(matches!(
            extract_lookup_result(&body),
            Err(TriageError::ToolError(_))
        ));
    }

    #[test]
    fn test_http_tool_trims_base_url() {
        let tool = HttpLookupTool::new("http://localhost:9000/").unwrap();
        assert_eq!(tool.base_url, "http://localhost:9000");
    }

    /// Serve `router` on an ephemeral local port and return its base URL
    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_lookup_success() {
        async fn lookup(Json(body): Json<Value>) -> Json<Value> {
            Json(json!({
                "result": format!("{} ({} messages)", body["query"].as_str().unwrap_or(""), body["message_count"])
            }))
        }

        let base = spawn_stub(Router::new().route("/lookup", post(lookup))).await;
        let tool = HttpLookupTool::new(&base).unwrap();

        let state = ConversationState::from_human("order 42");
        let result = tool.lookup(&state).await.unwrap();
        assert_eq!(result, "order 42 (1 messages)");
    }

    #[tokio::test]
    async fn test_http_lookup_error_status_keeps_code() {
        async fn unavailable() -> (StatusCode, &'static str) {
            (StatusCode::SERVICE_UNAVAILABLE, "<html>maintenance</html>")
        }

        let base = spawn_stub(Router::new().route("/lookup", post(unavailable))).await;
        let tool = HttpLookupTool::new(&base).unwrap();

        let err = tool
            .lookup(&ConversationState::from_human("order status"))
            .await
            .unwrap_err();
        match err {
            TriageError::ToolError(msg) => {
                assert!(msg.contains("503"), "{}", msg);
                assert!(msg.contains("maintenance"), "{}", msg);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_lookup_failure_reaches_answer() {
        async fn unavailable() -> StatusCode {
            StatusCode::BAD_GATEWAY
        }

        let base = spawn_stub(Router::new().route("/lookup", post(unavailable))).await;
        let graph = build_graph(
            Arc::new(KeywordClassifier),
            Arc::new(HttpLookupTool::new(&base).unwrap()),
        );

        let state = graph
            .invoke(ConversationState::from_human("Where is my order?"))
            .await
            .unwrap();
        let reply = state.last_message().unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.content.starts_with("Update unavailable: "), "{}", reply.content);
        assert!(reply.content.contains("502"), "{}", reply.content);
    }

    #[tokio::test]
    async fn test_http_lookup_unreachable_service() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let graph = build_graph(
            Arc::new(KeywordClassifier),
            Arc::new(HttpLookupTool::new(&format!("http://{}", addr)).unwrap()),
        );

        let state = graph
            .invoke(ConversationState::from_human("tracking number please"))
            .await
            .unwrap();
        let reply = state.last_message().unwrap();
        assert!(
            reply.content.starts_with("Update unavailable: Lookup request failed"),
            "{}",
            reply.content
        );
    }
}
