//! Bearer-token session registry
//!
//! Tokens are opaque UUIDs handed out by a completed login and kept in
//! memory only; a restart logs everybody out.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Logged-in user attached to a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Shared token table
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionInfo>>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Issue a new token for a user
    pub async fn create(&self, user_id: i64, username: &str, email: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let info = SessionInfo {
            user_id,
            username: username.to_string(),
            email: email.to_string(),
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions.write().await.insert(token.clone(), info);
        token
    }

    /// Look up a live token; expired entries are dropped on sight
    pub async fn lookup(&self, token: &str) -> Option<SessionInfo> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(info) if info.expires_at > now => return Some(info.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.sessions.write().await.remove(token);
        None
    }

    /// Revoke a token; returns whether it existed
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Drop every expired token, returning how many were removed
    pub async fn prune_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, info| info.expires_at > now);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
