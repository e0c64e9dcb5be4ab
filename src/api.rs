//! REST API Server for the support triage agent
//!
//! Speaks the thread/run protocol the chat client uses:
//! create a thread, submit a run and wait for its final state.
//! Also exposes the human-review queue and the city recommender.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::SupportAgent;
use crate::error::TriageError;
use crate::escalation::HumanDisposition;
use crate::graph::RunOutcome;
use crate::models::Message;
use crate::travel::{Budget, CityRecommender, TripRequest};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub assistant_id: String,
    #[serde(default)]
    pub input: RunInput,
    /// Accepted for compatibility; the thread id comes from the path.
    #[serde(default)]
    pub config: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunInput {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub budget: String,
    pub weeks: u32,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiError = (StatusCode, Json<ApiResponse>);
type ApiResult<T> = std::result::Result<T, ApiError>;

fn status_for(error: &TriageError) -> StatusCode {
    match error {
        TriageError::ThreadNotFound(_) | TriageError::EscalationNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        TriageError::ThreadBusy(_)
        | TriageError::AwaitingReview(_)
        | TriageError::NotAwaitingReview(_) => StatusCode::CONFLICT,
        TriageError::InvalidRequest(_)
        | TriageError::EmptyConversation
        | TriageError::UuidError(_) => StatusCode::BAD_REQUEST,
        TriageError::ConfigError(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<TriageError> for (StatusCode, Json<ApiResponse>) {
    fn from(error: TriageError) -> Self {
        let status = status_for(&error);
        if status.is_server_error() {
            warn!(error = %error, "Request failed");
        }
        (status, Json(ApiResponse::error(error.to_string())))
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<SupportAgent>,
    pub assistant_id: String,
    pub recommender: Option<Arc<CityRecommender>>,
}

fn parse_thread_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| TriageError::from(e).into())
}

/// Final state values plus `__interrupt__` when the run was handed off
fn run_response(outcome: &RunOutcome) -> std::result::Result<Value, TriageError> {
    let mut body = serde_json::to_value(outcome.state())?;

    if let Some(interrupt) = outcome.interrupt() {
        body["__interrupt__"] = json!([{
            "id": interrupt.id,
            "value": interrupt.reason,
            "node": interrupt.node,
        }]);
    }

    Ok(body)
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Assistant + Thread Endpoints
/// =============================

async fn get_assistant(
    State(state): State<ApiState>,
    Path(assistant_id): Path<String>,
) -> ApiResult<Json<Value>> {
    if assistant_id != state.assistant_id {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "Assistant '{}' not found",
                assistant_id
            ))),
        ));
    }

    Ok(Json(json!({
        "assistant_id": state.assistant_id,
        "graph_id": state.assistant_id,
        "name": "support-triage",
    })))
}

async fn create_thread(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let record = state.agent.create_thread().await?;
    let body = serde_json::to_value(record).map_err(TriageError::from)?;
    Ok(Json(body))
}

async fn list_threads(State(state): State<ApiState>) -> ApiResult<Json<ApiResponse>> {
    let records = state.agent.list_threads().await?;
    Ok(Json(ApiResponse::success(records)))
}

async fn get_thread(
    State(state): State<ApiState>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let thread_id = parse_thread_id(&thread_id)?;
    let record = state.agent.get_thread(thread_id).await?;
    let body = serde_json::to_value(record).map_err(TriageError::from)?;
    Ok(Json(body))
}

/// =============================
/// Run Endpoint
/// =============================

async fn run_wait(
    State(state): State<ApiState>,
    Path(thread_id): Path<String>,
    Json(req): Json<RunRequest>,
) -> ApiResult<Json<Value>> {
    let thread_id = parse_thread_id(&thread_id)?;

    if req.assistant_id != state.assistant_id {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "Assistant '{}' not found",
                req.assistant_id
            ))),
        ));
    }

    info!(
        thread_id = %thread_id,
        input_messages = req.input.messages.len(),
        "Received run request"
    );

    let outcome = state
        .agent
        .run_turn(thread_id, req.input.messages)
        .await?;

    Ok(Json(run_response(&outcome)?))
}

/// =============================
/// Human Review Endpoints
/// =============================

async fn resolve_thread(
    State(state): State<ApiState>,
    Path(thread_id): Path<String>,
    Json(disposition): Json<HumanDisposition>,
) -> ApiResult<Json<ApiResponse>> {
    let thread_id = parse_thread_id(&thread_id)?;
    let record = state.agent.resolve(thread_id, disposition).await?;
    Ok(Json(ApiResponse::success(record)))
}

async fn list_escalations(State(state): State<ApiState>) -> ApiResult<Json<ApiResponse>> {
    let pending = state.agent.escalations().list_pending().await?;
    Ok(Json(ApiResponse::success(pending)))
}

async fn get_escalation(
    State(state): State<ApiState>,
    Path(escalation_id): Path<String>,
) -> ApiResult<Json<ApiResponse>> {
    let escalation_id = Uuid::parse_str(&escalation_id).map_err(TriageError::from)?;
    let escalation = state
        .agent
        .escalations()
        .get(escalation_id)
        .await?
        .ok_or(TriageError::EscalationNotFound(escalation_id))?;

    let intact = escalation.verify();
    Ok(Json(ApiResponse::success(json!({
        "escalation": escalation,
        "intact": intact,
    }))))
}

/// =============================
/// Recommendation Endpoint
/// =============================

async fn recommend(
    State(state): State<ApiState>,
    Json(req): Json<RecommendRequest>,
) -> ApiResult<Json<ApiResponse>> {
    let recommender = state.recommender.as_ref().ok_or_else(|| {
        TriageError::ConfigError(
            "city recommender not configured (missing GOOGLE_API_KEY)".to_string(),
        )
    })?;

    let budget: Budget = req.budget.parse()?;
    let trip = TripRequest::new(budget, req.weeks)?;
    let recommendation = recommender.recommend(&trip).await?;

    Ok(Json(ApiResponse::success(recommendation)))
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/assistants/:assistant_id", get(get_assistant))
        .route("/threads", get(list_threads).post(create_thread))
        .route("/threads/:thread_id", get(get_thread))
        .route("/threads/:thread_id/runs/wait", post(run_wait))
        .route("/threads/:thread_id/resolve", post(resolve_thread))
        .route("/escalations", get(list_escalations))
        .route("/escalations/:escalation_id", get(get_escalation))
        .route("/api/recommend", post(recommend))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
