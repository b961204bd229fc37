//! API layer - HTTP endpoint handlers organized by domain.

mod directory;
mod health;
mod metrics;
mod models;
mod notifications;
mod routes;

// Re-export all handlers for use in server/app.rs
pub use directory::{list_user_devices, list_user_subscriptions, list_users};
pub use health::{health, root, stats, test_firebase};
pub use metrics::prometheus_metrics;
pub use models::{
    BroadcastRequest, BroadcastResponse, SendNotificationRequest, SendNotificationResponse,
};
pub use notifications::{send_notification, send_to_all, send_to_non_subscribed};
pub use routes::api_routes;
