use std::sync::Arc;

use crate::metrics::DispatchMetrics;
use crate::store::DirectoryStore;
use crate::transport::NotificationTransport;

use super::{
    Audience, AudienceResolver, DispatchError, DispatchResult, DispatcherStatsSnapshot,
    FanoutDispatcher, NotificationPayload,
};

/// What a broadcast did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// The audience resolved to no tokens; the transport was not called
    NoRecipients { message: String },
    /// Tokens were handed to the transport
    Dispatched {
        total_tokens: usize,
        result: DispatchResult,
    },
}

impl BroadcastOutcome {
    pub fn sent_count(&self) -> usize {
        match self {
            BroadcastOutcome::NoRecipients { .. } => 0,
            BroadcastOutcome::Dispatched { result, .. } => result.success_count,
        }
    }
}

/// Resolves audiences and dispatches to them.
#[derive(Clone)]
pub struct NotificationService {
    resolver: AudienceResolver,
    dispatcher: Arc<FanoutDispatcher>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn DirectoryStore>, transport: Arc<dyn NotificationTransport>) -> Self {
        Self {
            resolver: AudienceResolver::new(store),
            dispatcher: Arc::new(FanoutDispatcher::new(transport)),
        }
    }

    pub fn dispatcher(&self) -> &FanoutDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_stats(&self) -> DispatcherStatsSnapshot {
        self.dispatcher.stats()
    }

    /// Send to one device. Missing title or body fall back to defaults.
    #[tracing::instrument(name = "service.send_to_device", skip_all)]
    pub async fn send_to_device(
        &self,
        token: Option<String>,
        payload: NotificationPayload,
    ) -> Result<String, DispatchError> {
        let resolved = self
            .resolver
            .resolve(Audience::Device(token.unwrap_or_default()))
            .await?;

        // Device resolution yields exactly one token
        let Some(token) = resolved.tokens.first() else {
            return Err(DispatchError::Validation(
                "Device token is required".to_string(),
            ));
        };

        DispatchMetrics::record_request(resolved.audience.label());
        self.dispatcher.send_single(&payload, token).await
    }

    /// Resolve a user audience and multicast to every token it yields.
    #[tracing::instrument(name = "service.broadcast", skip(self, payload), fields(audience = %audience))]
    pub async fn broadcast(
        &self,
        audience: Audience,
        payload: &NotificationPayload,
    ) -> Result<BroadcastOutcome, DispatchError> {
        let resolved = self.resolver.resolve(audience).await?;
        DispatchMetrics::record_request(resolved.audience.label());

        if let Some(reason) = resolved.empty_reason() {
            tracing::info!(reason, "Nothing to send");
            return Ok(BroadcastOutcome::NoRecipients {
                message: reason.to_string(),
            });
        }

        let result = self
            .dispatcher
            .send_multicast(payload, &resolved.tokens)
            .await?;

        Ok(BroadcastOutcome::Dispatched {
            total_tokens: resolved.tokens.len(),
            result,
        })
    }
}
