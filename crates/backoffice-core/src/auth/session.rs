use tracing::{debug, warn};

use super::store::{SessionStore, TOKEN_KEY, USER_KEY};
use crate::models::UserProfile;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    Authenticated,
    /// Logout has started and cleanup is in flight
    LoggingOut,
}

/// Published to subscribers after every session change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub user: Option<UserProfile>,
}

impl SessionSnapshot {
    pub fn anonymous() -> Self {
        Self {
            phase: SessionPhase::Anonymous,
            user: None,
        }
    }
}

/// In-memory credentials. `user` is only ever set alongside a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
}

impl SessionState {
    /// Read the persisted session, treating anything unreadable as absent.
    pub fn load(store: &dyn SessionStore) -> Self {
        let token = match store.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        };

        let raw_user = match store.get(USER_KEY) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to read stored user");
                None
            }
        };

        let user = raw_user.and_then(|raw| match serde_json::from_str::<UserProfile>(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Discarding corrupt stored user profile");
                Self::discard(store, USER_KEY);
                None
            }
        });

        // A profile without a token cannot be used
        let user = match (&token, user) {
            (Some(_), user) => user,
            (None, Some(_)) => {
                debug!("Discarding stored user profile with no token");
                Self::discard(store, USER_KEY);
                None
            }
            (None, None) => None,
        };

        debug!(has_token = token.is_some(), has_user = user.is_some(), "Session loaded");
        Self { token, user }
    }

    fn discard(store: &dyn SessionStore, key: &str) {
        if let Err(e) = store.remove(key) {
            warn!(error = %e, key, "Failed to remove stored entry");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}
