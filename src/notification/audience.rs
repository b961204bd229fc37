//! Audience resolution: targeting intent to device tokens.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::DirectoryStore;

use super::{DeviceToken, DispatchError};

/// Who a notification is meant for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "token", rename_all = "snake_case")]
pub enum Audience {
    /// One device, addressed by token
    Device(String),
    /// Every user in the directory
    AllUsers,
    /// Users without an active subscription
    NonSubscribed,
}

impl Audience {
    /// Label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Audience::Device(_) => "device",
            Audience::AllUsers => "all_users",
            Audience::NonSubscribed => "non_subscribed",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tokens an audience resolved to.
///
/// An empty token list means there is nothing to send, which is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAudience {
    pub audience: Audience,
    /// Users matched by the directory query; `None` for a single device
    pub matched_users: Option<usize>,
    pub tokens: Vec<DeviceToken>,
}

impl ResolvedAudience {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Why there is nobody to send to, or `None` when tokens exist
    pub fn empty_reason(&self) -> Option<&'static str> {
        if !self.tokens.is_empty() {
            return None;
        }
        match (self.matched_users, &self.audience) {
            (Some(0), Audience::NonSubscribed) => Some("No non-subscribed users found"),
            (Some(0), _) => Some("No users found to send notifications to"),
            _ => Some("No valid device tokens found"),
        }
    }
}

/// Keep usable tokens, in store order, without de-duplicating.
pub fn filter_tokens<I>(raw: I) -> Vec<DeviceToken>
where
    I: IntoIterator<Item = String>,
{
    raw.into_iter()
        .filter_map(|token| DeviceToken::parse(token).ok())
        .collect()
}

/// Turns an [`Audience`] into device tokens using the directory store.
#[derive(Clone)]
pub struct AudienceResolver {
    store: Arc<dyn DirectoryStore>,
}

impl AudienceResolver {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(name = "audience.resolve", skip(self), fields(audience = %audience))]
    pub async fn resolve(&self, audience: Audience) -> Result<ResolvedAudience, DispatchError> {
        let user_ids = match &audience {
            Audience::Device(raw) => {
                let token = DeviceToken::parse(raw.as_str())?;
                return Ok(ResolvedAudience {
                    audience,
                    matched_users: None,
                    tokens: vec![token],
                });
            }
            Audience::AllUsers => self.store.list_user_ids().await?,
            Audience::NonSubscribed => self.store.list_non_subscribed_user_ids().await?,
        };

        if user_ids.is_empty() {
            tracing::debug!("No users matched, skipping token lookup");
            return Ok(ResolvedAudience {
                audience,
                matched_users: Some(0),
                tokens: Vec::new(),
            });
        }

        let raw_tokens = self.store.list_device_tokens(&user_ids).await?;
        let raw_count = raw_tokens.len();
        let tokens = filter_tokens(raw_tokens);

        tracing::debug!(
            users = user_ids.len(),
            raw_tokens = raw_count,
            tokens = tokens.len(),
            "Audience resolved"
        );

        Ok(ResolvedAudience {
            audience,
            matched_users: Some(user_ids.len()),
            tokens,
        })
    }
}
