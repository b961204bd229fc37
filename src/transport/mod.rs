//! Push delivery transports.
//!
//! A transport accepts one payload and either a single token or a batch of
//! tokens. For batches it reports one outcome per token, in submission order;
//! per-token rejections are data, only a failure of the call as a whole is an
//! error.

pub mod credentials;
mod fcm;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::FcmConfig;
use crate::notification::{DeliveryOutcome, DeviceToken, NotificationPayload};

pub use credentials::{
    CredentialChain, CredentialError, CredentialSource, FileSource, InlineJsonSource,
    ServiceAccountKey,
};
pub use fcm::FcmTransport;

/// Errors that abort a send entirely.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport not configured: {0}")]
    NotConfigured(String),

    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Push API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Malformed transport response: {0}")]
    MalformedResponse(String),
}

/// Outcomes of a multicast, one per submitted token in submission order
#[derive(Debug, Clone, Default)]
pub struct MulticastResponse {
    pub success_count: usize,
    pub failure_count: usize,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl MulticastResponse {
    pub fn from_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
        let success_count = outcomes.iter().filter(|o| o.is_delivered()).count();
        Self {
            success_count,
            failure_count: outcomes.len() - success_count,
            outcomes,
        }
    }
}

/// Sends notifications to device tokens.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Provider project the transport delivers through, if known
    fn project_id(&self) -> Option<&str>;

    /// Whether sends can succeed at all
    fn is_configured(&self) -> bool {
        true
    }

    /// Deliver to one token, returning the provider's message id.
    async fn send(
        &self,
        payload: &NotificationPayload,
        token: &DeviceToken,
    ) -> Result<String, TransportError>;

    /// Deliver to every token in `tokens`.
    async fn send_multicast(
        &self,
        payload: &NotificationPayload,
        tokens: &[DeviceToken],
    ) -> Result<MulticastResponse, TransportError>;
}

/// Transport used when no credentials could be resolved; every send fails.
pub struct UnconfiguredTransport {
    reason: String,
}

impl UnconfiguredTransport {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl NotificationTransport for UnconfiguredTransport {
    fn project_id(&self) -> Option<&str> {
        None
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn send(
        &self,
        _payload: &NotificationPayload,
        _token: &DeviceToken,
    ) -> Result<String, TransportError> {
        Err(TransportError::NotConfigured(self.reason.clone()))
    }

    async fn send_multicast(
        &self,
        _payload: &NotificationPayload,
        _tokens: &[DeviceToken],
    ) -> Result<MulticastResponse, TransportError> {
        Err(TransportError::NotConfigured(self.reason.clone()))
    }
}

/// Build the push transport from configuration.
///
/// Credential resolution failures do not stop the service; they yield an
/// [`UnconfiguredTransport`] and a warning.
pub fn create_transport(config: &FcmConfig) -> Arc<dyn NotificationTransport> {
    let chain = CredentialChain::from_config(config);

    match chain.resolve() {
        Ok((key, source)) => {
            let transport = FcmTransport::new(config, key);
            tracing::info!(
                source = %source,
                project_id = %transport.project(),
                "FCM transport initialized"
            );
            Arc::new(transport)
        }
        Err(e) => {
            tracing::warn!(error = %e, "FCM credentials unavailable, push delivery disabled");
            Arc::new(UnconfiguredTransport::new(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_transport_fails_every_send() {
        let transport = UnconfiguredTransport::new("no credentials");
        let payload = NotificationPayload::new("t", "b");
        let token = DeviceToken::parse("abc").unwrap();

        assert!(!transport.is_configured());
        assert!(transport.project_id().is_none());
        tokio_test::assert_err!(transport.send(&payload, &token).await);
        let err = transport
            .send_multicast(&payload, &[token])
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConfigured(_)));
    }

    #[test]
    fn test_multicast_response_counts() {
        let response = MulticastResponse::from_outcomes(vec![
            DeliveryOutcome::Delivered {
                message_id: "1".to_string(),
            },
            DeliveryOutcome::Failed {
                error: "bad".to_string(),
            },
        ]);
        assert_eq!(response.success_count, 1);
        assert_eq!(response.failure_count, 1);
    }

    #[test]
    fn test_create_transport_without_credentials_is_unconfigured() {
        let config = FcmConfig {
            default_credentials_path: "/nonexistent/service-account.json".to_string(),
            ..FcmConfig::default()
        };
        let transport = create_transport(&config);
        assert!(!transport.is_configured());
    }
}
