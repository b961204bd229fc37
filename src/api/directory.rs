//! Read-only directory endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::Result;
use crate::server::AppState;
use crate::store::{Subscription, User, UserDevice};

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    Ok(Json(state.store.list_users().await?))
}

/// GET /api/users/{id}/devices
pub async fn list_user_devices(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<UserDevice>>> {
    Ok(Json(state.store.devices_for_user(&user_id).await?))
}

/// GET /api/users/{id}/subscriptions
pub async fn list_user_subscriptions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Subscription>>> {
    Ok(Json(state.store.subscriptions_for_user(&user_id).await?))
}
