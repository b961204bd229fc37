use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::DispatchError;

/// Title used by the single-device path when the caller omits one
pub const DEFAULT_TITLE: &str = "Notification";

/// Body used by the single-device path when the caller omits one
pub const DEFAULT_BODY: &str = "You have a new notification";

/// Opaque delivery destination issued by the push provider.
///
/// A token is never empty or whitespace-only once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceToken(String);

impl DeviceToken {
    /// Validate a raw token, rejecting empty and whitespace-only values.
    pub fn parse(raw: impl Into<String>) -> Result<Self, DispatchError> {
        let raw = raw.into();
        if Self::is_usable(&raw) {
            Ok(Self(raw))
        } else {
            Err(DispatchError::Validation(
                "Device token is required".to_string(),
            ))
        }
    }

    /// Whether a raw value can be delivered to at all.
    pub fn is_usable(raw: &str) -> bool {
        !raw.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Content delivered to devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
        }
    }

    /// Attach a data entry, replacing any previous value for the key
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Payload for the single-device path, where title and body fall back to
    /// fixed defaults when absent or empty.
    pub fn with_defaults(
        title: Option<String>,
        body: Option<String>,
        data: Option<BTreeMap<String, String>>,
    ) -> Self {
        Self {
            title: non_empty(title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: non_empty(body).unwrap_or_else(|| DEFAULT_BODY.to_string()),
            data: data.unwrap_or_default(),
        }
    }

    /// Payload for the broadcast path, where title and body are both required.
    pub fn required(
        title: Option<String>,
        body: Option<String>,
        data: Option<BTreeMap<String, String>>,
    ) -> Result<Self, DispatchError> {
        match (non_empty(title), non_empty(body)) {
            (Some(title), Some(body)) => Ok(Self {
                title,
                body,
                data: data.unwrap_or_default(),
            }),
            _ => Err(DispatchError::Validation(
                "Title and body are required".to_string(),
            )),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Outcome of delivering to one token, as reported by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered { message_id: String },
    Failed { error: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Per-token entry of a [`DispatchResult`]; `index` is the token's position
/// in the submitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenResponse {
    fn new(index: usize, outcome: DeliveryOutcome) -> Self {
        match outcome {
            DeliveryOutcome::Delivered { message_id } => Self {
                index,
                success: true,
                message_id: Some(message_id),
                error: None,
            },
            DeliveryOutcome::Failed { error } => Self {
                index,
                success: false,
                message_id: None,
                error: Some(error),
            },
        }
    }
}

/// Aggregated result of a multicast.
///
/// `success_count + failure_count == responses.len()`, and `responses[i]`
/// belongs to the i-th submitted token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub responses: Vec<TokenResponse>,
}

impl DispatchResult {
    /// Result for a batch with no recipients
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a result from outcomes listed in submission order
    pub fn from_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
        let responses: Vec<TokenResponse> = outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| TokenResponse::new(index, outcome))
            .collect();
        let success_count = responses.iter().filter(|r| r.success).count();
        let failure_count = responses.len() - success_count;

        Self {
            success_count,
            failure_count,
            responses,
        }
    }

    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}
