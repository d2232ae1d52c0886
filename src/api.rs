//! REST API server for the retroplanning engine
//!
//! Exposes generation, progress tracking and the calendar view over HTTP.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catch_up::{apply_catch_up, CatchUpRequest};
use crate::config::ServerConfig;
use crate::coordinator::{ProgressReport, RetroplanCoordinator};
use crate::error::RetroplanError;
use crate::models::GenerateRetroplanRequest;

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

type ApiResult = (StatusCode, Json<ApiResponse>);

fn status_for(error: &RetroplanError) -> StatusCode {
    if error.is_validation() {
        StatusCode::BAD_REQUEST
    } else if matches!(error, RetroplanError::PlanNotFound(_)) {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn respond<T: Serialize>(result: crate::Result<T>) -> ApiResult {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                warn!(error = %e, "Request failed");
            }
            (status, Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub coordinator: Arc<RetroplanCoordinator>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Retroplan Endpoints
/// =============================

async fn generate_retroplan(
    State(state): State<ApiState>,
    Json(req): Json<GenerateRetroplanRequest>,
) -> ApiResult {
    info!(
        goal_id = ?req.goal_id,
        goal_amount = req.goal_amount,
        deadline = %req.deadline,
        "Received retroplan request"
    );

    respond(state.coordinator.generate(req).await)
}

async fn get_retroplan(State(state): State<ApiState>, Path(goal_id): Path<Uuid>) -> ApiResult {
    respond(state.coordinator.active_plan(goal_id).await)
}

async fn record_progress(
    State(state): State<ApiState>,
    Path(goal_id): Path<Uuid>,
    Json(report): Json<ProgressReport>,
) -> ApiResult {
    info!(
        goal_id = ?goal_id,
        current_week = report.current_week,
        actual_progress = report.actual_progress,
        "Received progress report"
    );

    respond(state.coordinator.record_progress(goal_id, report).await)
}

async fn get_calendar(State(state): State<ApiState>, Path(goal_id): Path<Uuid>) -> ApiResult {
    respond(state.coordinator.calendar(goal_id).await)
}

/// Stateless catch-up over a caller-supplied milestone list
async fn catch_up(Json(req): Json<CatchUpRequest>) -> ApiResult {
    respond(apply_catch_up(
        &req.milestones,
        req.current_week,
        req.actual_progress,
        &req.config,
    ))
}

/// =============================
/// Router
/// =============================

pub fn create_router(coordinator: Arc<RetroplanCoordinator>) -> Router {
    let state = ApiState { coordinator };

    Router::new()
        .route("/health", get(health))
        .route("/api/retroplans", post(generate_retroplan))
        .route("/api/retroplans/:goal_id", get(get_retroplan))
        .route("/api/retroplans/:goal_id/progress", post(record_progress))
        .route("/api/retroplans/:goal_id/calendar", get(get_calendar))
        .route("/api/catch-up", post(catch_up))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    coordinator: Arc<RetroplanCoordinator>,
    config: &ServerConfig,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(coordinator);
    let address = config.socket_address();

    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!("API Server listening on http://{}", address);

    axum::serve(listener, router).await?;

    Ok(())
}
