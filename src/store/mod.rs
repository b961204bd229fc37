//! Directory store: users, their devices, and their subscriptions.
//!
//! # Backends
//!
//! - `MemoryDirectoryStore`: in-process tables, used when no database is
//!   configured and in tests
//! - `PostgresDirectoryStore`: reads the `Users`, `User_Devices` and
//!   `Subscriptions` tables through sqlx
//!
//! The dispatch pipeline only reads from the store.

mod memory;
mod models;
mod pool;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DatabaseConfig;

pub use memory::{MemoryDirectoryStore, MemoryStoreStats};
pub use models::{Subscription, User, UserDevice};
pub use pool::PostgresPool;
pub use postgres::PostgresDirectoryStore;

/// Errors raised by directory queries.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the user directory.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Identifier of the backend for logging
    fn backend_name(&self) -> &'static str;

    /// Every user id
    async fn list_user_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Ids of users without an active subscription
    async fn list_non_subscribed_user_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Raw device tokens owned by any of `user_ids`, unfiltered.
    async fn list_device_tokens(&self, user_ids: &[String]) -> Result<Vec<String>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn devices_for_user(&self, user_id: &str) -> Result<Vec<UserDevice>, StoreError>;

    async fn subscriptions_for_user(&self, user_id: &str)
        -> Result<Vec<Subscription>, StoreError>;
}

/// Create the directory store for the given configuration.
///
/// Falls back to an empty in-memory store when no URL is configured.
pub async fn create_directory_store(
    config: &DatabaseConfig,
) -> Result<Arc<dyn DirectoryStore>, StoreError> {
    match config.url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            let pool = PostgresPool::new(config).await?;
            tracing::info!(
                backend = "postgres",
                url = %pool.database_url_masked(),
                "Creating PostgreSQL directory store"
            );
            Ok(Arc::new(PostgresDirectoryStore::new(pool)))
        }
        _ => {
            tracing::warn!(
                "No database URL configured, using an empty in-memory directory store"
            );
            Ok(Arc::new(MemoryDirectoryStore::new()))
        }
    }
}
