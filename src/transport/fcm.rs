//! Firebase Cloud Messaging (HTTP v1) transport.
//!
//! Authenticates with a service account through the OAuth2 JWT-bearer flow
//! and caches the access token until shortly before it expires. The v1 API
//! accepts one token per request, so a multicast fans out into concurrent
//! single sends whose outcomes are collected back in submission order.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::config::FcmConfig;
use crate::notification::{DeliveryOutcome, DeviceToken, NotificationPayload};

use super::{MulticastResponse, NotificationTransport, ServiceAccountKey, TransportError};

const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Refresh the access token this many seconds before it expires
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    message: FcmMessageContent<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessageContent<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    #[serde(skip_serializing_if = "is_empty_data")]
    data: &'a BTreeMap<String, String>,
}

fn is_empty_data(data: &&BTreeMap<String, String>) -> bool {
    data.is_empty()
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct FcmSendResponse {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FcmErrorEnvelope {
    error: FcmErrorBody,
}

#[derive(Debug, Deserialize)]
struct FcmErrorBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct FcmTransport {
    project_id: String,
    credentials: Arc<ServiceAccountKey>,
    endpoint: String,
    max_concurrent_sends: usize,
    token_cache: Mutex<Option<CachedToken>>,
    http_client: reqwest::Client,
}

impl FcmTransport {
    pub fn new(config: &FcmConfig, credentials: ServiceAccountKey) -> Self {
        let project_id = config
            .project_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| credentials.project_id.clone());

        Self {
            project_id,
            credentials: Arc::new(credentials),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            max_concurrent_sends: config.max_concurrent_sends.max(1),
            token_cache: Mutex::new(None),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project_id
    }

    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.endpoint, self.project_id
        )
    }

    fn cached_token(&self) -> Option<String> {
        let cache = self
            .token_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        cache.as_ref().and_then(|cached| {
            let now = Utc::now().timestamp();
            (cached.expires_at > now + TOKEN_REFRESH_MARGIN_SECS)
                .then(|| cached.access_token.clone())
        })
    }

    /// Get an OAuth2 access token, exchanging a fresh assertion when needed.
    async fn access_token(&self) -> Result<String, TransportError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let now = Utc::now();
        let claims = JwtClaims {
            iss: &self.credentials.client_email,
            sub: &self.credentials.client_email,
            scope: MESSAGING_SCOPE,
            aud: &self.credentials.token_uri,
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };

        let encoding_key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| TransportError::Auth(format!("Failed to parse private key: {}", e)))?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.credentials.private_key_id.clone();

        let assertion = encode(&header, &claims, &encoding_key)
            .map_err(|e| TransportError::Auth(format!("Failed to encode JWT: {}", e)))?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Auth(format!(
                "Token request failed with status {}: {}",
                status, body
            )));
        }

        let token_response: GoogleTokenResponse = response.json().await.map_err(|e| {
            TransportError::MalformedResponse(format!("Failed to parse token response: {}", e))
        })?;

        let expires_at = Utc::now().timestamp() + token_response.expires_in;
        *self
            .token_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(CachedToken {
            access_token: token_response.access_token.clone(),
            expires_at,
        });

        tracing::debug!(expires_at, "Refreshed FCM access token");
        Ok(token_response.access_token)
    }

    /// One HTTP v1 send; `Err` covers both transport and API rejections.
    async fn post_message(
        &self,
        access_token: &str,
        payload: &NotificationPayload,
        token: &DeviceToken,
    ) -> Result<String, TransportError> {
        let message = FcmMessage {
            message: FcmMessageContent {
                token: token.as_str(),
                notification: FcmNotification {
                    title: &payload.title,
                    body: &payload.body,
                },
                data: &payload.data,
            },
        };

        let response = self
            .http_client
            .post(self.send_url())
            .bearer_auth(access_token)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: FcmSendResponse = response.json().await.map_err(|e| {
                TransportError::MalformedResponse(format!("Failed to parse FCM response: {}", e))
            })?;
            return Ok(body
                .name
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        Err(TransportError::Api {
            status: status.as_u16(),
            message: describe_api_error(&text),
        })
    }
}

/// Prefer the structured `status: message` of an FCM error body.
fn describe_api_error(body: &str) -> String {
    match serde_json::from_str::<FcmErrorEnvelope>(body) {
        Ok(envelope) => match (envelope.error.status, envelope.error.message) {
            (Some(status), Some(message)) => format!("{}: {}", status, message),
            (None, Some(message)) => message,
            (Some(status), None) => status,
            (None, None) => body.to_string(),
        },
        Err(_) if body.is_empty() => "Unknown error".to_string(),
        Err(_) => body.to_string(),
    }
}

#[async_trait]
impl NotificationTransport for FcmTransport {
    fn project_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }

    async fn send(
        &self,
        payload: &NotificationPayload,
        token: &DeviceToken,
    ) -> Result<String, TransportError> {
        let access_token = self.access_token().await?;
        self.post_message(&access_token, payload, token).await
    }

    async fn send_multicast(
        &self,
        payload: &NotificationPayload,
        tokens: &[DeviceToken],
    ) -> Result<MulticastResponse, TransportError> {
        if tokens.is_empty() {
            return Ok(MulticastResponse::default());
        }

        // Failing to authenticate fails the whole batch
        let access_token = self.access_token().await?;

        let sends: Vec<_> = tokens
            .iter()
            .map(|token| {
                let access_token = access_token.as_str();
                async move {
                    match self.post_message(access_token, payload, token).await {
                        Ok(message_id) => DeliveryOutcome::Delivered { message_id },
                        Err(e) => {
                            tracing::debug!(error = %e, "FCM rejected token");
                            DeliveryOutcome::Failed {
                                error: e.to_string(),
                            }
                        }
                    }
                }
            })
            .collect();

        let outcomes: Vec<DeliveryOutcome> = stream::iter(sends)
            .buffered(self.max_concurrent_sends)
            .collect()
            .await;

        Ok(MulticastResponse::from_outcomes(outcomes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ServiceAccountKey {
        ServiceAccountKey {
            project_id: "key-project".to_string(),
            private_key: "not-a-real-key".to_string(),
            client_email: "push@key-project.iam.gserviceaccount.com".to_string(),
            private_key_id: None,
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        }
    }

    #[test]
    fn test_project_id_from_key_or_override() {
        let transport = FcmTransport::new(&FcmConfig::default(), key());
        assert_eq!(transport.project(), "key-project");
        assert_eq!(
            transport.send_url(),
            "https://fcm.googleapis.com/v1/projects/key-project/messages:send"
        );

        let config = FcmConfig {
            project_id: Some("override".to_string()),
            endpoint: "http://localhost:9099/".to_string(),
            ..FcmConfig::default()
        };
        let transport = FcmTransport::new(&config, key());
        assert_eq!(
            transport.send_url(),
            "http://localhost:9099/v1/projects/override/messages:send"
        );
    }

    #[test]
    fn test_cached_token_respects_refresh_margin() {
        let transport = FcmTransport::new(&FcmConfig::default(), key());
        assert!(transport.cached_token().is_none());

        *transport.token_cache.lock().unwrap() = Some(CachedToken {
            access_token: "fresh".to_string(),
            expires_at: Utc::now().timestamp() + 3600,
        });
        assert_eq!(transport.cached_token().as_deref(), Some("fresh"));

        *transport.token_cache.lock().unwrap() = Some(CachedToken {
            access_token: "stale".to_string(),
            expires_at: Utc::now().timestamp() + 30,
        });
        assert!(transport.cached_token().is_none());
    }

    #[tokio::test]
    async fn test_bad_private_key_is_total_failure() {
        let transport = FcmTransport::new(&FcmConfig::default(), key());
        let payload = NotificationPayload::new("t", "b");
        let tokens = vec![DeviceToken::parse("abc").unwrap()];

        let err = transport
            .send_multicast(&payload, &tokens)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Auth(_)));
    }

    #[test]
    fn test_message_serialization() {
        let payload = NotificationPayload::new("Hi", "There").with_data("type", "promo");
        let message = FcmMessage {
            message: FcmMessageContent {
                token: "abc",
                notification: FcmNotification {
                    title: &payload.title,
                    body: &payload.body,
                },
                data: &payload.data,
            },
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["message"]["token"], "abc");
        assert_eq!(json["message"]["notification"]["title"], "Hi");
        assert_eq!(json["message"]["data"]["type"], "promo");
    }

    #[test]
    fn test_describe_api_error() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#;
        assert_eq!(
            describe_api_error(body),
            "NOT_FOUND: Requested entity was not found."
        );
        assert_eq!(describe_api_error(""), "Unknown error");
        assert_eq!(describe_api_error("gateway timeout"), "gateway timeout");
    }
}
