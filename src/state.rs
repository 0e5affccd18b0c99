use std::sync::Arc;

use chrono::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::auth::sessions::SessionStore;
use crate::engine::notify::NotificationTransport;
use crate::models::notification::Notification;
use crate::observability::metrics::Metrics;
use crate::store::identities::IdentityStore;
use crate::store::loads::LoadStore;
use crate::store::notifications::NotificationStore;
use crate::store::ratings::RatingStore;

pub struct AppState {
    pub identities: IdentityStore,
    pub loads: LoadStore,
    pub ratings: RatingStore,
    pub notifications: NotificationStore,
    pub sessions: SessionStore,
    pub notification_tx: mpsc::Sender<Notification>,
    pub notification_events_tx: broadcast::Sender<Notification>,
    pub transport: Arc<dyn NotificationTransport>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        notification_queue_size: usize,
        event_buffer_size: usize,
        session_ttl: Duration,
        transport: Arc<dyn NotificationTransport>,
    ) -> (Self, mpsc::Receiver<Notification>) {
        let (notification_tx, notification_rx) = mpsc::channel(notification_queue_size);
        let (notification_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        (
            Self {
                identities: IdentityStore::new(),
                loads: LoadStore::new(),
                ratings: RatingStore::new(),
                notifications: NotificationStore::new(),
                sessions: SessionStore::new(session_ttl),
                notification_tx,
                notification_events_tx,
                transport,
                metrics: Metrics::new(),
            },
            notification_rx,
        )
    }
}
