//! Session store
//!
//! One [`Session`] per client instance. Components get a cloned
//! [`SessionStore`] handle instead of reaching for a global, and the only
//! ways to change it are [`SessionStore::login`] and [`SessionStore::logout`].

use std::sync::Arc;

use iris_common::events::{EventBus, IrisEvent};
use iris_common::time;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

/// Logged-in user as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<User>,
    /// Bearer token for history and logout, when the server issued one
    pub token: Option<String>,
}

/// Cloneable handle over the client's single session
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Session>>,
    events: EventBus,
}

impl SessionStore {
    pub fn new(events: EventBus) -> Self {
        let (tx, _) = watch::channel(Session::default());
        Self {
            tx: Arc::new(tx),
            events,
        }
    }

    pub fn login(&self, user: User, token: Option<String>) {
        info!(username = %user.username, "Session started");
        let username = user.username.clone();
        self.tx.send_replace(Session {
            is_authenticated: true,
            user: Some(user),
            token,
        });
        self.events.emit(IrisEvent::SessionChanged {
            authenticated: true,
            username: Some(username),
            timestamp: time::now(),
        });
    }

    pub fn logout(&self) {
        let previous = self.tx.send_replace(Session::default());
        if let Some(user) = previous.user {
            info!(username = %user.username, "Session ended");
        }
        self.events.emit(IrisEvent::SessionChanged {
            authenticated: false,
            username: None,
            timestamp: time::now(),
        });
    }

    /// Copy of the current session
    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().token.clone()
    }

    /// Watch for session changes
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
        }
    }

    #[test]
    fn test_new_store_is_logged_out() {
        let store = SessionStore::new(EventBus::new(8));
        assert_eq!(store.snapshot(), Session::default());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_login_then_logout() {
        let store = SessionStore::new(EventBus::new(8));
        let mut rx = store.events().subscribe();

        store.login(user(), Some("tok".to_string()));
        let session = store.snapshot();
        assert!(session.is_authenticated);
        assert_eq!(session.user, Some(user()));
        assert_eq!(store.token().as_deref(), Some("tok"));

        store.logout();
        assert_eq!(store.snapshot(), Session::default());

        match rx.try_recv().unwrap() {
            IrisEvent::SessionChanged { authenticated, username, .. } => {
                assert!(authenticated);
                assert_eq!(username.as_deref(), Some("testuser"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(
            rx.try_recv().unwrap(),
            IrisEvent::SessionChanged { authenticated: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_clones_share_one_session() {
        let store = SessionStore::new(EventBus::new(8));
        let other = store.clone();
        let mut watcher = other.subscribe();

        store.login(user(), None);
        watcher.changed().await.unwrap();
        assert!(watcher.borrow().is_authenticated);
        assert!(other.is_authenticated());
    }
}
