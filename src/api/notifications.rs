//! Notification send endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::notification::{Audience, NotificationPayload};
use crate::server::AppState;

use super::models::{
    BroadcastRequest, BroadcastResponse, SendNotificationRequest, SendNotificationResponse,
};

/// Send a notification to a single device
#[tracing::instrument(name = "http.send_notification", skip(state, request))]
pub async fn send_notification(
    State(state): State<AppState>,
    Json(request): Json<SendNotificationRequest>,
) -> Result<Json<SendNotificationResponse>> {
    let payload = NotificationPayload::with_defaults(request.title, request.body, request.data);
    let message_id = state
        .notifications
        .send_to_device(request.token, payload)
        .await?;

    tracing::info!(message_id = %message_id, "Notification sent to device");

    Ok(Json(SendNotificationResponse {
        success: true,
        message_id,
    }))
}

/// Send a notification to every user
#[tracing::instrument(name = "http.send_to_all", skip(state, request))]
pub async fn send_to_all(
    State(state): State<AppState>,
    Json(request): Json<BroadcastRequest>,
) -> Result<Json<BroadcastResponse>> {
    broadcast(&state, Audience::AllUsers, request).await
}

/// Send a notification to every user without an active subscription
#[tracing::instrument(name = "http.send_to_non_subscribed", skip(state, request))]
pub async fn send_to_non_subscribed(
    State(state): State<AppState>,
    Json(request): Json<BroadcastRequest>,
) -> Result<Json<BroadcastResponse>> {
    broadcast(&state, Audience::NonSubscribed, request).await
}

async fn broadcast(
    state: &AppState,
    audience: Audience,
    request: BroadcastRequest,
) -> Result<Json<BroadcastResponse>> {
    let payload = NotificationPayload::required(request.title, request.body, request.data)?;
    let outcome = state.notifications.broadcast(audience, &payload).await?;

    Ok(Json(BroadcastResponse::from(outcome)))
}
