//! HTTP request handlers

use super::types::{
    CreateThreadResponse, ErrorResponse, InterviewFormatsResponse, InvokeRequest, InvokeResponse,
    ModelsResponse, ResumeRequest, SuccessResponse, ThreadListResponse, ThreadResponse,
    ToolRouteResponse,
};
use super::AppState;
use crate::agents::AgentKind;
use crate::routing::needs_tools_json;
use crate::runtime::{Invocation, RuntimeError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Threads
        .route(
            "/api/agents/:agent/threads",
            get(list_threads).post(create_thread),
        )
        .route("/api/agents/:agent/threads/:thread", get(get_thread))
        .route("/api/agents/:agent/threads/:thread/invoke", post(invoke))
        .route("/api/agents/:agent/threads/:thread/resume", post(resume))
        .route("/api/agents/:agent/threads/:thread/delete", post(delete_thread))
        // Routing predicate
        .route("/api/route/tools", post(route_tools))
        // Interview formats
        .route("/api/interview/formats", get(list_interview_formats))
        // Model info
        .route("/api/models", get(list_models))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

fn parse_agent(agent: &str) -> Result<AgentKind, AppError> {
    agent.parse().map_err(AppError::NotFound)
}

// ============================================================
// Threads
// ============================================================

async fn create_thread(Path(agent): Path<String>) -> Result<Json<CreateThreadResponse>, AppError> {
    let kind = parse_agent(&agent)?;
    let thread_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(agent = %kind, thread_id = %thread_id, "Created thread");
    Ok(Json(CreateThreadResponse { thread_id }))
}

async fn list_threads(
    State(state): State<AppState>,
    Path(agent): Path<String>,
) -> Result<Json<ThreadListResponse>, AppError> {
    let kind = parse_agent(&agent)?;
    let threads = state.runtime.list_threads(kind).await?;
    Ok(Json(ThreadListResponse { threads }))
}

async fn get_thread(
    State(state): State<AppState>,
    Path((agent, thread_id)): Path<(String, String)>,
) -> Result<Json<ThreadResponse>, AppError> {
    let kind = parse_agent(&agent)?;
    let record = state.runtime.thread(kind, &thread_id).await?;
    if record.state.is_empty() && record.pending.is_none() {
        return Err(AppError::NotFound(format!("Thread not found: {thread_id}")));
    }

    Ok(Json(ThreadResponse {
        thread_id,
        state: serde_json::to_value(&record.state).map_err(|e| AppError::Internal(e.to_string()))?,
        awaiting_input: record.pending.is_some(),
        prompt: record.pending.map(|p| p.prompt),
    }))
}

async fn invoke(
    State(state): State<AppState>,
    Path((agent, thread_id)): Path<(String, String)>,
    Json(req): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, AppError> {
    let kind = parse_agent(&agent)?;
    let outcome = state
        .runtime
        .invoke(kind, &thread_id, Invocation::Start(req.into_update()))
        .await?;
    Ok(Json(InvokeResponse { thread_id, outcome }))
}

async fn resume(
    State(state): State<AppState>,
    Path((agent, thread_id)): Path<(String, String)>,
    Json(req): Json<ResumeRequest>,
) -> Result<Json<InvokeResponse>, AppError> {
    let kind = parse_agent(&agent)?;
    let outcome = state
        .runtime
        .invoke(kind, &thread_id, Invocation::Resume(req.value))
        .await?;
    Ok(Json(InvokeResponse { thread_id, outcome }))
}

async fn delete_thread(
    State(state): State<AppState>,
    Path((agent, thread_id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse>, AppError> {
    let kind = parse_agent(&agent)?;
    if state.runtime.delete_thread(kind, &thread_id).await? {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(AppError::NotFound(format!("Thread not found: {thread_id}")))
    }
}

// ============================================================
// Routing predicate
// ============================================================

/// Evaluate the tool-call predicate over a turn list or a state record
async fn route_tools(Json(input): Json<Value>) -> Result<Json<ToolRouteResponse>, AppError> {
    let branch = needs_tools_json(&input).map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Json(ToolRouteResponse {
        route: branch.as_str(),
    }))
}

// ============================================================
// Interview formats
// ============================================================

async fn list_interview_formats(State(state): State<AppState>) -> Json<InterviewFormatsResponse> {
    let catalog = state.runtime.interview_catalog();
    Json(InterviewFormatsResponse {
        default: catalog.default_format().to_string(),
        formats: catalog.formats().clone(),
    })
}

// ============================================================
// Model Info
// ============================================================

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.llm_registry.available_model_info(),
        default: state.llm_registry.default_model_id().to_string(),
    })
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("parley ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(err: RuntimeError) -> Self {
        let message = err.to_string();
        match err {
            RuntimeError::NothingToResume => AppError::Conflict(message),
            RuntimeError::Routing(_) | RuntimeError::ToolOrdering(_) => {
                AppError::BadRequest(message)
            }
            RuntimeError::Llm(_) | RuntimeError::StructuredOutput { .. } | RuntimeError::Tool { .. } => {
                tracing::warn!(error = %message, "Collaborator failure");
                AppError::BadGateway(message)
            }
            RuntimeError::UnknownTool(_)
            | RuntimeError::Store(_)
            | RuntimeError::InvalidState(_)
            | RuntimeError::StepLimitExceeded(_)
            | RuntimeError::Serialization(_) => {
                tracing::error!(error = %message, "Invocation failed");
                AppError::Internal(message)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_error_status() {
        let status = |err: RuntimeError| AppError::from(err).into_response().status();
        assert_eq!(status(RuntimeError::NothingToResume), StatusCode::CONFLICT);
        assert_eq!(
            status(RuntimeError::StructuredOutput {
                schema: "HeadlinesSchema",
                message: "missing field".into(),
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(RuntimeError::StepLimitExceeded(25)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unknown_agent_is_not_found() {
        let err = parse_agent("weatherbot").unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
