use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::directory::{list_user_devices, list_user_subscriptions, list_users};
use super::health::{health, root, stats, test_firebase};
use super::metrics::prometheus_metrics;
use super::notifications::{send_notification, send_to_all, send_to_non_subscribed};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Stats
        .route("/", get(root))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .route("/test/firebase", get(test_firebase))
        // Notification endpoints
        .route("/send-notification", post(send_notification))
        .route("/send-notification/all", post(send_to_all))
        .route("/send-notification/non-subscribed", post(send_to_non_subscribed))
        // Directory (read-only)
        .nest(
            "/api",
            Router::new()
                .route("/users", get(list_users))
                .route("/users/{id}/devices", get(list_user_devices))
                .route("/users/{id}/subscriptions", get(list_user_subscriptions)),
        )
}
