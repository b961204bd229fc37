use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::metrics::DispatchMetrics;
use crate::transport::{NotificationTransport, TransportError};

use super::{DeviceToken, DispatchError, DispatchResult, NotificationPayload};

/// Statistics for the fanout dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Single-device sends attempted
    pub single_sends: AtomicU64,
    /// Multicasts handed to the transport
    pub multicasts: AtomicU64,
    /// Tokens reported delivered
    pub tokens_delivered: AtomicU64,
    /// Tokens reported failed
    pub tokens_failed: AtomicU64,
    /// Calls that failed as a whole
    pub transport_errors: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            single_sends: self.single_sends.load(Ordering::Relaxed),
            multicasts: self.multicasts.load(Ordering::Relaxed),
            tokens_delivered: self.tokens_delivered.load(Ordering::Relaxed),
            tokens_failed: self.tokens_failed.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub single_sends: u64,
    pub multicasts: u64,
    pub tokens_delivered: u64,
    pub tokens_failed: u64,
    pub transport_errors: u64,
}

/// Sends one notification to one or many tokens and aggregates the outcome.
///
/// Batches go to the transport in a single call. Per-token failures are
/// reported in the result; only a failed call is an error. Nothing is retried.
pub struct FanoutDispatcher {
    transport: Arc<dyn NotificationTransport>,
    stats: DispatcherStats,
}

impl FanoutDispatcher {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self {
            transport,
            stats: DispatcherStats::default(),
        }
    }

    pub fn transport(&self) -> &Arc<dyn NotificationTransport> {
        &self.transport
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Send to a single device, returning the transport's message id.
    #[tracing::instrument(name = "dispatcher.send_single", skip_all)]
    pub async fn send_single(
        &self,
        payload: &NotificationPayload,
        token: &DeviceToken,
    ) -> Result<String, DispatchError> {
        self.stats.single_sends.fetch_add(1, Ordering::Relaxed);

        match self.transport.send(payload, token).await {
            Ok(message_id) => {
                self.record_outcome(1, 0);
                tracing::debug!(message_id = %message_id, "Notification sent");
                Ok(message_id)
            }
            Err(e) => {
                self.record_transport_error(&e);
                Err(e.into())
            }
        }
    }

    /// Send to every token in one transport call.
    ///
    /// An empty batch returns an empty result without calling the transport.
    #[tracing::instrument(
        name = "dispatcher.send_multicast",
        skip_all,
        fields(token_count = tokens.len())
    )]
    pub async fn send_multicast(
        &self,
        payload: &NotificationPayload,
        tokens: &[DeviceToken],
    ) -> Result<DispatchResult, DispatchError> {
        if tokens.is_empty() {
            return Ok(DispatchResult::empty());
        }

        self.stats.multicasts.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        let response = match self.transport.send_multicast(payload, tokens).await {
            Ok(response) => response,
            Err(e) => {
                self.record_transport_error(&e);
                return Err(e.into());
            }
        };
        DispatchMetrics::record_latency(start.elapsed());

        if response.outcomes.len() != tokens.len() {
            let e = TransportError::MalformedResponse(format!(
                "expected {} outcomes, got {}",
                tokens.len(),
                response.outcomes.len()
            ));
            self.record_transport_error(&e);
            return Err(e.into());
        }

        let reported = (response.success_count, response.failure_count);
        let result = DispatchResult::from_outcomes(response.outcomes);
        if reported != (result.success_count, result.failure_count) {
            tracing::warn!(
                reported_success = reported.0,
                reported_failure = reported.1,
                success_count = result.success_count,
                failure_count = result.failure_count,
                "Transport counts disagree with per-token outcomes, using outcomes"
            );
        }

        self.record_outcome(result.success_count, result.failure_count);
        tracing::info!(
            token_count = tokens.len(),
            success_count = result.success_count,
            failure_count = result.failure_count,
            "Multicast completed"
        );

        Ok(result)
    }

    fn record_outcome(&self, delivered: usize, failed: usize) {
        self.stats
            .tokens_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.stats
            .tokens_failed
            .fetch_add(failed as u64, Ordering::Relaxed);
        DispatchMetrics::record_delivered(delivered as u64);
        DispatchMetrics::record_failed(failed as u64);
    }

    fn record_transport_error(&self, error: &TransportError) {
        self.stats.transport_errors.fetch_add(1, Ordering::Relaxed);
        DispatchMetrics::record_transport_error();
        tracing::warn!(error = %error, "Transport call failed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::notification::DeliveryOutcome;
    use crate::transport::MulticastResponse;

    /// Transport that rejects tokens starting with "bad" and records calls
    #[derive(Default)]
    struct ScriptedTransport {
        calls: AtomicUsize,
        batches: Mutex<Vec<Vec<String>>>,
        fail_call: bool,
        drop_last_outcome: bool,
    }

    #[async_trait]
    impl NotificationTransport for ScriptedTransport {
        fn project_id(&self) -> Option<&str> {
            Some("test")
        }

        async fn send(
            &self,
            _payload: &NotificationPayload,
            token: &DeviceToken,
        ) -> Result<String, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_call {
                return Err(TransportError::Auth("invalid credentials".to_string()));
            }
            Ok(format!("msg-{}", token))
        }

        async fn send_multicast(
            &self,
            _payload: &NotificationPayload,
            tokens: &[DeviceToken],
        ) -> Result<MulticastResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batches
                .lock()
                .unwrap()
                .push(tokens.iter().map(|t| t.to_string()).collect());
            if self.fail_call {
                return Err(TransportError::Auth("invalid credentials".to_string()));
            }
            let mut outcomes: Vec<DeliveryOutcome> = tokens
                .iter()
                .map(|t| {
                    if t.as_str().starts_with("bad") {
                        DeliveryOutcome::Failed {
                            error: "registration-token-not-registered".to_string(),
                        }
                    } else {
                        DeliveryOutcome::Delivered {
                            message_id: format!("msg-{}", t),
                        }
                    }
                })
                .collect();
            if self.drop_last_outcome {
                outcomes.pop();
            }
            Ok(MulticastResponse::from_outcomes(outcomes))
        }
    }

    fn tokens(raw: &[&str]) -> Vec<DeviceToken> {
        raw.iter().map(|t| DeviceToken::parse(*t).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_empty_batch_skips_transport() {
        let transport = Arc::new(ScriptedTransport::default());
        let dispatcher = FanoutDispatcher::new(transport.clone());

        let result = dispatcher
            .send_multicast(&NotificationPayload::new("t", "b"), &[])
            .await
            .unwrap();

        assert_eq!(result, DispatchResult::empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported_not_raised() {
        let transport = Arc::new(ScriptedTransport::default());
        let dispatcher = FanoutDispatcher::new(transport.clone());
        let batch = tokens(&["t1", "bad-2", "t3"]);

        let result = dispatcher
            .send_multicast(&NotificationPayload::new("Hi", "There"), &batch)
            .await
            .unwrap();

        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.total(), batch.len());
        assert!(!result.responses[1].success);
        assert_eq!(result.responses[2].message_id.as_deref(), Some("msg-t3"));
        // One call carrying the whole batch
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            transport.batches.lock().unwrap()[0],
            vec!["t1", "bad-2", "t3"]
        );

        let stats = dispatcher.stats();
        assert_eq!(stats.multicasts, 1);
        assert_eq!(stats.tokens_delivered, 2);
        assert_eq!(stats.tokens_failed, 1);
    }

    #[tokio::test]
    async fn test_counts_always_match_batch_size() {
        let transport = Arc::new(ScriptedTransport::default());
        let dispatcher = FanoutDispatcher::new(transport);
        let payload = NotificationPayload::new("t", "b");

        for size in [1usize, 2, 7, 50] {
            let raw: Vec<String> = (0..size)
                .map(|i| if i % 3 == 0 { format!("bad-{}", i) } else { format!("t{}", i) })
                .collect();
            let batch: Vec<DeviceToken> = raw
                .iter()
                .map(|t| DeviceToken::parse(t.as_str()).unwrap())
                .collect();

            let result = dispatcher.send_multicast(&payload, &batch).await.unwrap();
            assert_eq!(result.success_count + result.failure_count, size);
            assert_eq!(result.responses.len(), size);
            for (i, response) in result.responses.iter().enumerate() {
                assert_eq!(response.index, i);
                assert_eq!(response.success, !raw[i].starts_with("bad"));
            }
        }
    }

    #[tokio::test]
    async fn test_total_failure_propagates() {
        let transport = Arc::new(ScriptedTransport {
            fail_call: true,
            ..Default::default()
        });
        let dispatcher = FanoutDispatcher::new(transport);

        let err = dispatcher
            .send_multicast(&NotificationPayload::new("t", "b"), &tokens(&["t1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));

        let err = dispatcher
            .send_single(&NotificationPayload::new("t", "b"), &tokens(&["t1"])[0])
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
        assert_eq!(dispatcher.stats().transport_errors, 2);
    }

    #[tokio::test]
    async fn test_short_response_is_rejected() {
        let transport = Arc::new(ScriptedTransport {
            drop_last_outcome: true,
            ..Default::default()
        });
        let dispatcher = FanoutDispatcher::new(transport);

        let err = dispatcher
            .send_multicast(&NotificationPayload::new("t", "b"), &tokens(&["t1", "t2"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Transport(TransportError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_send_single_returns_message_id() {
        let transport = Arc::new(ScriptedTransport::default());
        let dispatcher = FanoutDispatcher::new(transport);

        let message_id = dispatcher
            .send_single(&NotificationPayload::new("t", "b"), &tokens(&["abc"])[0])
            .await
            .unwrap();
        assert_eq!(message_id, "msg-abc");
    }
}
