//! PostgreSQL-backed directory store.
//!
//! Table structure:
//! - `"Users"` - one row per user
//! - `"User_Devices"` - device rows carrying `fcm_token`, keyed by `user_id`
//! - `"Subscriptions"` - subscription rows, `is_subscribed` marks an active one

use async_trait::async_trait;

use super::{DirectoryStore, PostgresPool, StoreError, Subscription, User, UserDevice};

pub struct PostgresDirectoryStore {
    pool: PostgresPool,
}

impl PostgresDirectoryStore {
    pub fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryStore for PostgresDirectoryStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn list_user_ids(&self) -> Result<Vec<String>, StoreError> {
        let ids: Vec<String> = sqlx::query_scalar(r#"SELECT id::text FROM "Users" ORDER BY id"#)
            .fetch_all(self.pool.pool())
            .await?;
        Ok(ids)
    }

    async fn list_non_subscribed_user_ids(&self) -> Result<Vec<String>, StoreError> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT u.id::text
            FROM "Users" u
            WHERE NOT EXISTS (
                SELECT 1 FROM "Subscriptions" s
                WHERE s.user_id = u.id AND s.is_subscribed
            )
            ORDER BY u.id
            "#,
        )
        .fetch_all(self.pool.pool())
        .await?;
        Ok(ids)
    }

    async fn list_device_tokens(&self, user_ids: &[String]) -> Result<Vec<String>, StoreError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let tokens: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT COALESCE(fcm_token, '')
            FROM "User_Devices"
            WHERE user_id::text = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(user_ids)
        .fetch_all(self.pool.pool())
        .await?;
        Ok(tokens)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id::text AS id,
                   COALESCE(push_notifications_enabled, false) AS push_notifications_enabled,
                   created_at,
                   updated_at
            FROM "Users"
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool.pool())
        .await?;
        Ok(users)
    }

    async fn devices_for_user(&self, user_id: &str) -> Result<Vec<UserDevice>, StoreError> {
        let devices = sqlx::query_as::<_, UserDevice>(
            r#"
            SELECT id::text AS id,
                   user_id::text AS user_id,
                   platform,
                   fcm_token,
                   created_at,
                   updated_at
            FROM "User_Devices"
            WHERE user_id::text = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.pool())
        .await?;
        Ok(devices)
    }

    async fn subscriptions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Subscription>, StoreError> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id::text AS id,
                   user_id::text AS user_id,
                   entitlement_id,
                   device_id::text AS device_id,
                   COALESCE(is_subscribed, false) AS is_subscribed,
                   renews_at,
                   canceled_at,
                   expires_at,
                   created_at,
                   updated_at
            FROM "Subscriptions"
            WHERE user_id::text = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.pool())
        .await?;
        Ok(subscriptions)
    }
}
