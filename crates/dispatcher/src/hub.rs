//! In-process notification fan-out.
//!
//! Dashboards subscribe per user id and receive [`RequestEvent`]s over
//! channels; the hub never sees transport connections. The SSE (or
//! websocket) layer drains the receiver and owns delivery from there.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use database::{user, Database};
use workshop_core::{NotifyError, RequestEvent, SupervisorNotifier};

/// Per-user subscriber registry.
///
/// A user may hold several subscriptions at once (one per open dashboard
/// tab). Senders whose receiver was dropped are pruned on the next publish.
#[derive(Debug, Default)]
pub struct NotificationHub {
    subscribers: Mutex<HashMap<i64, Vec<mpsc::UnboundedSender<RequestEvent>>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription for a user and get the event stream.
    pub async fn subscribe(&self, user_id: i64) -> mpsc::UnboundedReceiver<RequestEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .await
            .entry(user_id)
            .or_default()
            .push(tx);
        debug!("Dashboard subscription added for user {}", user_id);
        rx
    }

    /// Deliver an event to every subscription of the given users. Returns
    /// how many subscriptions received it.
    pub async fn publish_to(&self, user_ids: &[i64], event: &RequestEvent) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        let mut delivered = 0;

        for user_id in user_ids {
            if let Some(channels) = subscribers.get_mut(user_id) {
                channels.retain(|tx| tx.send(event.clone()).is_ok());
                delivered += channels.len();
                if channels.is_empty() {
                    subscribers.remove(user_id);
                }
            }
        }

        delivered
    }

    /// Number of live subscriptions across all users.
    pub async fn connection_count(&self) -> usize {
        self.subscribers.lock().await.values().map(Vec::len).sum()
    }
}

/// [`SupervisorNotifier`] that fans an event out to every active supervisor
/// and admin through a [`NotificationHub`].
#[derive(Clone)]
pub struct HubNotifier {
    hub: Arc<NotificationHub>,
    db: Database,
}

impl HubNotifier {
    pub fn new(hub: Arc<NotificationHub>, db: Database) -> Self {
        Self { hub, db }
    }

    /// The shared hub, for the transport layer to register subscriptions on.
    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }
}

#[async_trait]
impl SupervisorNotifier for HubNotifier {
    async fn publish(&self, event: RequestEvent) -> Result<(), NotifyError> {
        let supervisors = user::list_supervisors(self.db.pool())
            .await
            .map_err(|e| NotifyError::PublishFailed(e.to_string()))?;
        let ids: Vec<i64> = supervisors.iter().map(|u| u.id).collect();

        let delivered = self.hub.publish_to(&ids, &event).await;
        if delivered == 0 {
            warn!(
                "No dashboard subscriptions for event {:?} (request #{})",
                event.kind, event.request_id
            );
        }

        Ok(())
    }
}
