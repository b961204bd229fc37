//! In-memory directory store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use super::{DirectoryStore, StoreError, Subscription, User, UserDevice};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    devices: Vec<UserDevice>,
    subscriptions: Vec<Subscription>,
}

/// Query counters, mostly useful to assert which reads a workflow issued.
#[derive(Debug, Default)]
struct QueryCounters {
    user_queries: AtomicU64,
    token_queries: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryStoreStats {
    pub users: usize,
    pub devices: usize,
    pub subscriptions: usize,
    pub user_queries: u64,
    pub token_queries: u64,
}

/// Directory held in process memory. Rows keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryDirectoryStore {
    tables: RwLock<Tables>,
    counters: QueryCounters,
}

impl MemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.push(user);
    }

    pub async fn insert_device(&self, device: UserDevice) {
        self.tables.write().await.devices.push(device);
    }

    pub async fn insert_subscription(&self, subscription: Subscription) {
        self.tables.write().await.subscriptions.push(subscription);
    }

    pub async fn stats(&self) -> MemoryStoreStats {
        let tables = self.tables.read().await;
        MemoryStoreStats {
            users: tables.users.len(),
            devices: tables.devices.len(),
            subscriptions: tables.subscriptions.len(),
            user_queries: self.counters.user_queries.load(Ordering::Relaxed),
            token_queries: self.counters.token_queries.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl DirectoryStore for MemoryDirectoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn list_user_ids(&self) -> Result<Vec<String>, StoreError> {
        self.counters.user_queries.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.read().await;
        Ok(tables.users.iter().map(|u| u.id.clone()).collect())
    }

    async fn list_non_subscribed_user_ids(&self) -> Result<Vec<String>, StoreError> {
        self.counters.user_queries.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.read().await;

        let subscribed: HashSet<&str> = tables
            .subscriptions
            .iter()
            .filter(|s| s.is_subscribed)
            .map(|s| s.user_id.as_str())
            .collect();

        Ok(tables
            .users
            .iter()
            .filter(|u| !subscribed.contains(u.id.as_str()))
            .map(|u| u.id.clone())
            .collect())
    }

    async fn list_device_tokens(&self, user_ids: &[String]) -> Result<Vec<String>, StoreError> {
        self.counters.token_queries.fetch_add(1, Ordering::Relaxed);
        let wanted: HashSet<&str> = user_ids.iter().map(String::as_str).collect();
        let tables = self.tables.read().await;

        Ok(tables
            .devices
            .iter()
            .filter(|d| wanted.contains(d.user_id.as_str()))
            .map(|d| d.fcm_token.clone().unwrap_or_default())
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn devices_for_user(&self, user_id: &str) -> Result<Vec<UserDevice>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .devices
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn subscriptions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Subscription>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> MemoryDirectoryStore {
        let store = MemoryDirectoryStore::new();
        store.insert_user(User::new("u1")).await;
        store.insert_user(User::new("u2")).await;
        store.insert_user(User::new("u3")).await;
        store
            .insert_device(UserDevice::new("d1", "u1", "iOS", "tok-1"))
            .await;
        store
            .insert_device(UserDevice::new("d2", "u2", "Android", "tok-2"))
            .await;
        store
            .insert_device(UserDevice::new("d3", "u2", "Android", "tok-3"))
            .await;
        store
            .insert_subscription(Subscription::new("s1", "u1", true))
            .await;
        store
            .insert_subscription(Subscription::new("s2", "u2", false))
            .await;
        store
    }

    #[tokio::test]
    async fn test_non_subscribed_excludes_active_subscribers() {
        let store = seeded().await;
        let ids = store.list_non_subscribed_user_ids().await.unwrap();
        assert_eq!(ids, vec!["u2".to_string(), "u3".to_string()]);
    }

    #[tokio::test]
    async fn test_device_tokens_for_users() {
        let store = seeded().await;
        let tokens = store
            .list_device_tokens(&["u2".to_string(), "u3".to_string()])
            .await
            .unwrap();
        assert_eq!(tokens, vec!["tok-2".to_string(), "tok-3".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_token_reads_as_empty() {
        let store = MemoryDirectoryStore::new();
        store.insert_user(User::new("u1")).await;
        let mut device = UserDevice::new("d1", "u1", "iOS", "ignored");
        device.fcm_token = None;
        store.insert_device(device).await;

        let tokens = store.list_device_tokens(&["u1".to_string()]).await.unwrap();
        assert_eq!(tokens, vec![String::new()]);
    }

    #[tokio::test]
    async fn test_per_user_reads_and_stats() {
        let store = seeded().await;
        assert_eq!(store.devices_for_user("u2").await.unwrap().len(), 2);
        assert_eq!(store.subscriptions_for_user("u1").await.unwrap().len(), 1);
        assert!(store.devices_for_user("missing").await.unwrap().is_empty());

        store.list_user_ids().await.unwrap();
        let stats = store.stats().await;
        assert_eq!(stats.users, 3);
        assert_eq!(stats.devices, 3);
        assert_eq!(stats.user_queries, 1);
        assert_eq!(stats.token_queries, 0);
    }
}
