//! Request and response bodies for the notification endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::notification::{BroadcastOutcome, TokenResponse};

/// Body of `POST /send-notification`
#[derive(Debug, Default, Deserialize)]
pub struct SendNotificationRequest {
    pub token: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<BTreeMap<String, String>>,
}

/// Body of the broadcast endpoints
#[derive(Debug, Default, Deserialize)]
pub struct BroadcastRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationResponse {
    pub success: bool,
    pub message_id: String,
}

/// Broadcast result. Either `message` (nobody to send to) or the counts with
/// per-token responses are present.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub sent_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<TokenResponse>>,
}

impl From<BroadcastOutcome> for BroadcastResponse {
    fn from(outcome: BroadcastOutcome) -> Self {
        match outcome {
            BroadcastOutcome::NoRecipients { message } => Self {
                success: true,
                message: Some(message),
                sent_count: 0,
                failed_count: None,
                total_tokens: None,
                responses: None,
            },
            BroadcastOutcome::Dispatched {
                total_tokens,
                result,
            } => Self {
                success: true,
                message: None,
                sent_count: result.success_count,
                failed_count: Some(result.failure_count),
                total_tokens: Some(total_tokens),
                responses: Some(result.responses),
            },
        }
    }
}
