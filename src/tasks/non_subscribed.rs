use async_trait::async_trait;

use crate::notification::{Audience, BroadcastOutcome, NotificationPayload, NotificationService};

use super::{ScheduledTask, TaskError};

/// The fixed "upgrade to premium" campaign payload.
pub fn upgrade_payload() -> NotificationPayload {
    NotificationPayload::new(
        "Upgrade to Premium",
        "Unlock premium features and get the most out of the app!",
    )
    .with_data("type", "subscription_prompt")
    .with_data("action", "upgrade")
}

/// Periodically prompts users without an active subscription to upgrade.
pub struct NonSubscribedNotifier {
    service: NotificationService,
    payload: NotificationPayload,
}

impl NonSubscribedNotifier {
    pub fn new(service: NotificationService) -> Self {
        Self {
            service,
            payload: upgrade_payload(),
        }
    }
}

#[async_trait]
impl ScheduledTask for NonSubscribedNotifier {
    fn name(&self) -> &'static str {
        "non_subscribed_notifier"
    }

    async fn run_once(&self) -> Result<(), TaskError> {
        match self
            .service
            .broadcast(Audience::NonSubscribed, &self.payload)
            .await?
        {
            BroadcastOutcome::NoRecipients { message } => {
                tracing::info!(reason = %message, "Upgrade campaign skipped");
            }
            BroadcastOutcome::Dispatched {
                total_tokens,
                result,
            } => {
                tracing::info!(
                    total_tokens,
                    success_count = result.success_count,
                    failure_count = result.failure_count,
                    "Upgrade campaign sent"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;
    use crate::notification::{DeliveryOutcome, DeviceToken};
    use crate::store::{MemoryDirectoryStore, Subscription, User, UserDevice};
    use crate::transport::{MulticastResponse, NotificationTransport, TransportError};

    #[derive(Default)]
    struct CapturingTransport {
        batches: Mutex<Vec<(NotificationPayload, Vec<String>)>>,
    }

    #[async_trait]
    impl NotificationTransport for CapturingTransport {
        fn project_id(&self) -> Option<&str> {
            None
        }

        async fn send(
            &self,
            _payload: &NotificationPayload,
            _token: &DeviceToken,
        ) -> Result<String, TransportError> {
            Ok("msg".to_string())
        }

        async fn send_multicast(
            &self,
            payload: &NotificationPayload,
            tokens: &[DeviceToken],
        ) -> Result<MulticastResponse, TransportError> {
            self.batches.lock().unwrap().push((
                payload.clone(),
                tokens.iter().map(|t| t.to_string()).collect(),
            ));
            Ok(MulticastResponse::from_outcomes(
                tokens
                    .iter()
                    .map(|_| DeliveryOutcome::Delivered {
                        message_id: "msg".to_string(),
                    })
                    .collect(),
            ))
        }
    }

    #[tokio::test]
    async fn test_campaign_targets_only_non_subscribed() {
        let store = Arc::new(MemoryDirectoryStore::new());
        store.insert_user(User::new("paid")).await;
        store.insert_user(User::new("free")).await;
        store
            .insert_device(UserDevice::new("d1", "paid", "iOS", "paid-token"))
            .await;
        store
            .insert_device(UserDevice::new("d2", "free", "iOS", "free-token"))
            .await;
        store
            .insert_subscription(Subscription::new("s1", "paid", true))
            .await;

        let transport = Arc::new(CapturingTransport::default());
        let notifier = NonSubscribedNotifier::new(NotificationService::new(store, transport.clone()));

        notifier.run_once().await.unwrap();

        let batches = transport.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let (payload, tokens) = &batches[0];
        assert_eq!(tokens, &vec!["free-token".to_string()]);
        assert_eq!(payload.title, "Upgrade to Premium");
        assert_eq!(
            payload.data.get("type").map(String::as_str),
            Some("subscription_prompt")
        );
        assert_eq!(payload.data.get("action").map(String::as_str), Some("upgrade"));
    }

    #[tokio::test]
    async fn test_empty_audience_is_not_an_error() {
        let transport = Arc::new(CapturingTransport::default());
        let notifier = NonSubscribedNotifier::new(NotificationService::new(
            Arc::new(MemoryDirectoryStore::new()),
            transport.clone(),
        ));

        notifier.run_once().await.unwrap();
        assert!(transport.batches.lock().unwrap().is_empty());
    }
}
