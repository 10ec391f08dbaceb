use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use shame_types::events::GatewayEvent;

/// Routes notifications to connected clients.
///
/// Delivery is fire-and-forget: events for users without a live
/// connection, or whose connection has gone away, are dropped.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// Per-user targeted send channels: user_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a per-user targeted channel. Returns (conn_id, receiver).
    /// A newer connection for the same user replaces the older one.
    pub async fn register_user_channel(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.user_channels.write().await.insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Unregister a per-user targeted channel, but only if conn_id matches.
    pub async fn unregister_user_channel(&self, user_id: Uuid, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(&user_id) {
            if *stored_conn_id == conn_id {
                channels.remove(&user_id);
            }
        }
    }

    /// Send a targeted event to a specific user. Returns whether it was
    /// handed to a live connection.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) -> bool {
        let channels = self.inner.user_channels.read().await;
        match channels.get(&user_id) {
            Some((_, tx)) => tx.send(event).is_ok(),
            None => {
                debug!("{} is offline, dropping notification", user_id);
                false
            }
        }
    }

    /// Fan an event out to several users. Returns how many were delivered.
    pub async fn send_to_users(&self, user_ids: &[Uuid], event: GatewayEvent) -> usize {
        let channels = self.inner.user_channels.read().await;
        user_ids
            .iter()
            .filter_map(|uid| channels.get(uid))
            .filter(|(_, tx)| tx.send(event.clone()).is_ok())
            .count()
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.user_channels.read().await.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shamed() -> GatewayEvent {
        GatewayEvent::Shamed {
            from_user_id: Uuid::nil(),
            from_display_name: "Alice".into(),
            feed_item_id: Uuid::nil(),
        }
    }

    #[tokio::test]
    async fn targeted_delivery() {
        let dispatcher = Dispatcher::new();
        let bob = Uuid::new_v4();
        let (_conn, mut rx) = dispatcher.register_user_channel(bob).await;

        assert!(dispatcher.send_to_user(bob, shamed()).await);
        assert_eq!(rx.recv().await, Some(shamed()));

        assert!(!dispatcher.send_to_user(Uuid::new_v4(), shamed()).await);
    }

    #[tokio::test]
    async fn fan_out_skips_offline_users() {
        let dispatcher = Dispatcher::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let offline = Uuid::new_v4();
        let (_, mut rx_a) = dispatcher.register_user_channel(a).await;
        let (_, mut rx_b) = dispatcher.register_user_channel(b).await;

        let delivered = dispatcher.send_to_users(&[a, b, offline], shamed()).await;
        assert_eq!(delivered, 2);
        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());
    }

    #[tokio::test]
    async fn stale_connection_does_not_unregister_newer_one() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let (old_conn, _old_rx) = dispatcher.register_user_channel(user).await;
        let (_new_conn, mut new_rx) = dispatcher.register_user_channel(user).await;

        dispatcher.unregister_user_channel(user, old_conn).await;
        assert!(dispatcher.is_online(user).await);
        assert!(dispatcher.send_to_user(user, shamed()).await);
        assert!(new_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn dropped_receiver_is_swallowed() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let (_, rx) = dispatcher.register_user_channel(user).await;
        drop(rx);
        assert!(!dispatcher.send_to_user(user, shamed()).await);
    }
}
