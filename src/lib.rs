// Shared components
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Domain layer (business logic)
pub mod notification;
pub mod store;
pub mod transport;

// Application layer
pub mod api;
pub mod server;

// Supporting modules
pub mod tasks;
