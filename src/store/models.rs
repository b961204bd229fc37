//! Rows of the directory tables.
//!
//! Identifiers are kept as opaque strings; the PostgreSQL adapter casts them
//! to text on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of `Users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub push_notifications_enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            push_notifications_enabled: false,
            created_at: Some(Utc::now()),
            updated_at: None,
        }
    }
}

/// A row of `User_Devices`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserDevice {
    pub id: String,
    pub user_id: String,
    /// "iOS", "Android", ...
    pub platform: String,
    pub fcm_token: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserDevice {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        platform: impl Into<String>,
        fcm_token: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            platform: platform.into(),
            fcm_token: Some(fcm_token.into()),
            created_at: Some(Utc::now()),
            updated_at: None,
        }
    }
}

/// A row of `Subscriptions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    /// RevenueCat entitlement ("pro", "premium", ...)
    pub entitlement_id: Option<String>,
    pub device_id: Option<String>,
    pub is_subscribed: bool,
    pub renews_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, is_subscribed: bool) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            entitlement_id: None,
            device_id: None,
            is_subscribed,
            renews_at: None,
            canceled_at: None,
            expires_at: None,
            created_at: Some(Utc::now()),
            updated_at: None,
        }
    }
}
