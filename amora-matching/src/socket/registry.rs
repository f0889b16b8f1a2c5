use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::frames::ServerFrame;

#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub conn_id: Uuid,
    tx: mpsc::UnboundedSender<ServerFrame>,
}

/// Registry of online users: at most one live connection per user id.
///
/// This is the only shared mutable in-process state in the service, so every
/// operation is a single atomic map call. `unregister` is keyed by connection
/// id, which keeps a connection that was replaced during a reconnect from
/// evicting its successor.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection for `user_id`, evicting any previous one.
    /// Dropping the old handle closes its outbound channel, which ends the
    /// stale connection's socket loop and closes that socket.
    pub fn register(&self, user_id: Uuid, tx: mpsc::UnboundedSender<ServerFrame>) -> Uuid {
        let conn_id = Uuid::new_v4();
        if let Some(old) = self
            .connections
            .insert(user_id, ConnectionHandle { conn_id, tx })
        {
            tracing::debug!(
                user_id = %user_id,
                old_conn = %old.conn_id,
                "replaced existing live connection"
            );
        }
        conn_id
    }

    /// Remove the registration only while it still belongs to `conn_id`.
    pub fn unregister(&self, user_id: Uuid, conn_id: Uuid) {
        self.connections
            .remove_if(&user_id, |_, handle| handle.conn_id == conn_id);
    }

    /// Push a frame to a user's live connection. Returns false when the user
    /// is offline or the connection is already gone.
    pub fn send_to(&self, user_id: Uuid, frame: ServerFrame) -> bool {
        match self.connections.get(&user_id) {
            Some(handle) => handle.tx.send(frame).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> ServerFrame {
        ServerFrame::Error {
            code: "TEST",
            message: "test".into(),
        }
    }

    #[test]
    fn send_to_reaches_registered_user() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.register(user, tx);
        assert!(registry.send_to(user, frame()));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn send_to_offline_user_is_false() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.send_to(Uuid::new_v4(), frame()));
    }

    #[test]
    fn reconnect_evicts_previous_connection() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();

        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let old_conn = registry.register(user, old_tx);

        let (new_tx, mut new_rx) = mpsc::unbounded_channel();
        registry.register(user, new_tx);

        // The old channel is closed once its handle left the registry.
        assert!(registry.send_to(user, frame()));
        assert!(new_rx.try_recv().is_ok());
        assert!(matches!(
            old_rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));

        // A stale unregister from the evicted connection must not remove
        // the replacement.
        registry.unregister(user, old_conn);
        assert!(registry.send_to(user, frame()));
    }

    #[test]
    fn unregister_with_matching_conn_id_removes() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();

        let conn = registry.register(user, tx);
        registry.unregister(user, conn);
        assert!(!registry.send_to(user, frame()));
    }
}
