use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::notification::NotificationService;
use crate::store::DirectoryStore;
use crate::transport::NotificationTransport;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn DirectoryStore>,
    pub transport: Arc<dyn NotificationTransport>,
    pub notifications: NotificationService,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the pipeline around an explicitly constructed store and transport.
    pub fn new(
        settings: Settings,
        store: Arc<dyn DirectoryStore>,
        transport: Arc<dyn NotificationTransport>,
    ) -> Self {
        let notifications = NotificationService::new(store.clone(), transport.clone());

        Self {
            settings: Arc::new(settings),
            store,
            transport,
            notifications,
            start_time: Instant::now(),
        }
    }
}
