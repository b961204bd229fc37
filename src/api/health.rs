//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::notification::DispatcherStatsSnapshot;
use crate::server::AppState;
use crate::transport::TransportError;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseCheckResponse {
    pub success: bool,
    pub message: String,
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_seconds: u64,
    pub directory_backend: String,
    pub transport: TransportStats,
    pub dispatcher: DispatcherStatsSnapshot,
}

#[derive(Debug, Serialize)]
pub struct TransportStats {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Push dispatch service is running".to_string(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /test/firebase - whether push delivery is usable
pub async fn test_firebase(State(state): State<AppState>) -> Result<Json<FirebaseCheckResponse>> {
    if !state.transport.is_configured() {
        return Err(AppError::Transport(TransportError::NotConfigured(
            "Firebase transport is not initialized".to_string(),
        )));
    }

    Ok(Json(FirebaseCheckResponse {
        success: true,
        message: "Firebase transport is initialized".to_string(),
        project_id: state.transport.project_id().map(str::to_string),
    }))
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        uptime_seconds: state.start_time.elapsed().as_secs(),
        directory_backend: state.store.backend_name().to_string(),
        transport: TransportStats {
            configured: state.transport.is_configured(),
            project_id: state.transport.project_id().map(str::to_string),
        },
        dispatcher: state.notifications.dispatcher_stats(),
    })
}
