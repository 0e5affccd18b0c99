use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::notification::{Notification, NotificationType};
use crate::state::AppState;

/// Outbound delivery channel (e-mail) for notifications. Best effort: errors
/// are logged by the worker and never reach the operation that raised them.
pub trait NotificationTransport: Send + Sync {
    fn deliver(&self, recipient: &str, notification: &Notification) -> Result<(), TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("recipient rejected: {0}")]
    Rejected(String),
}

/// Transport that only writes the outgoing mail to the log.
pub struct LogTransport;

impl NotificationTransport for LogTransport {
    fn deliver(&self, recipient: &str, notification: &Notification) -> Result<(), TransportError> {
        info!(
            recipient,
            kind = notification.kind.as_str(),
            title = %notification.title,
            "email notification sent"
        );
        Ok(())
    }
}

/// Queue a notification without waiting. A full or closed queue drops it with
/// a warning; the caller's operation has already committed either way.
pub fn dispatch(
    state: &AppState,
    user_id: Uuid,
    kind: NotificationType,
    title: impl Into<String>,
    message: impl Into<String>,
    load_id: Option<Uuid>,
) {
    let notification = Notification::new(user_id, kind, title, message, load_id);

    match state.notification_tx.try_send(notification) {
        Ok(()) => state.metrics.notifications_in_queue.inc(),
        Err(TrySendError::Full(dropped)) | Err(TrySendError::Closed(dropped)) => {
            state
                .metrics
                .notifications_total
                .with_label_values(&["dropped"])
                .inc();
            warn!(
                user_id = %dropped.user_id,
                kind = dropped.kind.as_str(),
                "notification queue unavailable; dropping notification"
            );
        }
    }
}

pub async fn run_notification_worker(
    state: Arc<AppState>,
    mut notification_rx: mpsc::Receiver<Notification>,
) {
    info!("notification worker started");

    while let Some(notification) = notification_rx.recv().await {
        state.metrics.notifications_in_queue.dec();
        deliver(&state, notification);
    }

    warn!("notification worker stopped: queue channel closed");
}

fn deliver(state: &AppState, notification: Notification) {
    state.notifications.insert(notification.clone());
    state
        .metrics
        .notifications_total
        .with_label_values(&["stored"])
        .inc();
    let _ = state.notification_events_tx.send(notification.clone());

    let Some(recipient) = state.identities.email_of(notification.user_id) else {
        debug!(user_id = %notification.user_id, "no email on file; skipping transport");
        return;
    };

    if let Err(err) = state.transport.deliver(&recipient, &notification) {
        state
            .metrics
            .notifications_total
            .with_label_values(&["transport_error"])
            .inc();
        warn!(
            error = %err,
            user_id = %notification.user_id,
            kind = notification.kind.as_str(),
            load_id = ?notification.load_id,
            "notification transport failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{
        LogTransport, NotificationTransport, TransportError, dispatch, run_notification_worker,
    };
    use crate::models::customer::Customer;
    use crate::models::identity::Role;
    use crate::models::notification::{Notification, NotificationType};
    use crate::state::AppState;

    struct FailingTransport {
        attempts: AtomicUsize,
    }

    impl NotificationTransport for FailingTransport {
        fn deliver(&self, _: &str, _: &Notification) -> Result<(), TransportError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Unavailable("smtp down".into()))
        }
    }

    #[test]
    fn dispatch_never_blocks_on_full_queue() {
        let (state, mut rx) = AppState::new(1, 16, Duration::hours(1), Arc::new(LogTransport));
        let user = Uuid::new_v4();

        dispatch(&state, user, NotificationType::NewRating, "a", "first", None);
        dispatch(&state, user, NotificationType::NewRating, "b", "second", None);

        assert_eq!(rx.try_recv().unwrap().message, "first");
        assert!(rx.try_recv().is_err());
        let text = state.metrics.encode().unwrap();
        assert!(text.contains("outcome=\"dropped\"} 1"));
    }

    #[tokio::test]
    async fn transport_failure_still_stores_in_app_record() {
        let transport = Arc::new(FailingTransport {
            attempts: AtomicUsize::new(0),
        });
        let (state, rx) = AppState::new(8, 16, Duration::hours(1), transport.clone());
        let state = Arc::new(state);
        let customer = state
            .identities
            .insert_customer(Customer {
                id: Uuid::new_v4(),
                name: "Ravi".into(),
                email: "ravi@example.com".into(),
                password_hash: String::new(),
                phone: "9000000002".into(),
                role: Role::Customer,
                average_rating: 0.0,
                total_ratings: 0,
                created_at: Utc::now(),
            })
            .unwrap();

        tokio::spawn(run_notification_worker(state.clone(), rx));
        dispatch(&state, customer.id, NotificationType::LoadCompleted, "t", "m", None);

        let failed = "notifications_total{outcome=\"transport_error\"} 1";
        for _ in 0..100 {
            if state.metrics.encode().unwrap().contains(failed) {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        }

        assert!(state.metrics.encode().unwrap().contains(failed));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(state.notifications.unread_count(customer.id), 1);
    }

    #[tokio::test]
    async fn stored_notifications_are_published_to_subscribers() {
        let (state, rx) = AppState::new(8, 16, Duration::hours(1), Arc::new(LogTransport));
        let state = Arc::new(state);
        let user = Uuid::new_v4();

        let mut events = state.notification_events_tx.subscribe();
        tokio::spawn(run_notification_worker(state.clone(), rx));

        dispatch(&state, user, NotificationType::LoadAssigned, "t", "m", None);
        let published = events.recv().await.unwrap();
        assert_eq!(published.user_id, user);
        assert_eq!(state.notifications.unread_count(user), 1);
    }
}
