use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::Config;

/// Read-side refresh notification: the group whose cached view is stale.
#[derive(Clone, Debug)]
pub struct GroupEvent {
    pub group_id: i64,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
    /// Application configuration
    pub config: Arc<Config>,
    /// Group change notification sender
    group_tx: broadcast::Sender<GroupEvent>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let (group_tx, _) = broadcast::channel(1000);

        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            group_tx,
        }
    }

    /// Tell any read-side listeners that a group's cached view is stale
    pub fn notify_group_changed(&self, group_id: i64) {
        // Ignore send errors (no receivers is fine)
        let _ = self.group_tx.send(GroupEvent { group_id });
    }

    /// Subscribe to group change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<GroupEvent> {
        self.group_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_group_event_broadcast() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let state = AppState::new(db, Config::default());

        let mut rx = state.subscribe();
        state.notify_group_changed(42);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.group_id, 42);
    }

    #[test]
    fn test_notify_without_subscribers() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let state = AppState::new(db, Config::default());

        // Must not panic when nobody is listening
        state.notify_group_changed(1);
    }
}
