//! The session manager: credentials, authenticated requests, the inactivity
//! watchdog and single-flight logout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::hooks::{Navigator, Notice, Notifier, Route};
use super::session::{SessionPhase, SessionSnapshot, SessionState};
use super::store::{SessionStore, StoreError, TOKEN_KEY, USER_KEY};
use super::watchdog::{ActivityKind, InactivityWatchdog};
use crate::api::request::{build_headers, resolve_url, RequestOptions};
use crate::api::ApiError;
use crate::config::SessionSettings;
use crate::models::{LoginResponse, UserProfile};

/// Shown when the login endpoint rejects credentials without a message
const DEFAULT_LOGIN_ERROR: &str = "Login failed";

/// Shown when the login endpoint accepts credentials without a message
const DEFAULT_LOGIN_GREETING: &str = "Signed in successfully.";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to persist session: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to serialize user profile: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Cannot store a user profile without a token")]
    UserWithoutToken,
}

/// What ended a session. Each reason has its own notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    SignedOut,
    Expired,
    Inactivity,
}

impl LogoutReason {
    pub fn notice(self) -> Notice {
        match self {
            LogoutReason::SignedOut => Notice::SignedOut,
            LogoutReason::Expired => Notice::SessionExpired,
            LogoutReason::Inactivity => Notice::Inactivity,
        }
    }
}

struct Inner {
    client: Client,
    settings: SessionSettings,
    store: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    state: RwLock<SessionState>,
    /// One-shot guard, set before the first await of a logout
    logout_started: AtomicBool,
    watchdog: Mutex<InactivityWatchdog>,
    snapshot: watch::Sender<SessionSnapshot>,
}

/// Owner of the signed-in session.
/// Clone is cheap; all clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Restore the persisted session and arm the watchdog if signed in.
    /// Must be called from within a Tokio runtime.
    pub fn initialize(
        settings: SessionSettings,
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;
        let state = SessionState::load(store.as_ref());
        let authenticated = state.is_authenticated();
        let (snapshot, _) = watch::channel(SessionSnapshot::anonymous());

        let manager = Self {
            inner: Arc::new(Inner {
                client,
                watchdog: Mutex::new(InactivityWatchdog::new(settings.inactivity_window)),
                settings,
                store,
                notifier,
                navigator,
                state: RwLock::new(state),
                logout_started: AtomicBool::new(false),
                snapshot,
            }),
        };

        if authenticated {
            manager.arm_watchdog();
        }
        manager.publish();

        info!(authenticated, "Session initialized");
        Ok(manager)
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn token(&self) -> Option<String> {
        self.read_state().token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read_state().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_state().is_authenticated()
    }

    pub fn phase(&self) -> SessionPhase {
        let authenticated = self.is_authenticated();
        Self::phase_of(authenticated, self.inner.logout_started.load(Ordering::Acquire))
    }

    /// Receive a snapshot after every session change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    pub fn watchdog_armed(&self) -> bool {
        self.watchdog().is_armed()
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.watchdog().last_activity()
    }

    /// Store the token, then update memory.
    ///
    /// Gaining a token starts a fresh session: the logout guard is reset and
    /// the watchdog armed. Losing it clears the profile and disarms the
    /// watchdog.
    pub fn set_token(&self, token: Option<String>) -> Result<(), SessionError> {
        match token.as_deref() {
            Some(token) => self.inner.store.set(TOKEN_KEY, token)?,
            None => {
                // Profile first: if that fails, both entries are still in place
                self.inner.store.remove(USER_KEY)?;
                if let Err(e) = self.inner.store.remove(TOKEN_KEY) {
                    // Storage has already lost the profile; keep memory in step
                    self.write_state().user = None;
                    self.publish();
                    return Err(e.into());
                }
            }
        }

        let (had_token, has_token) = {
            let mut state = self.write_state();
            let had_token = state.token.is_some();
            state.token = token;
            if state.token.is_none() {
                state.user = None;
            }
            (had_token, state.token.is_some())
        };

        match (had_token, has_token) {
            (false, true) => {
                self.inner.logout_started.store(false, Ordering::Release);
                self.arm_watchdog();
            }
            (true, false) => self.watchdog().disarm(),
            _ => {}
        }

        debug!(had_token, has_token, "Token updated");
        self.publish();
        Ok(())
    }

    /// Store the profile, then update memory. Used after a profile edit.
    pub fn set_user(&self, user: Option<UserProfile>) -> Result<(), SessionError> {
        match user {
            Some(ref user) => {
                if !self.is_authenticated() {
                    return Err(SessionError::UserWithoutToken);
                }
                let raw = serde_json::to_string(user)?;
                self.inner.store.set(USER_KEY, &raw)?;
            }
            None => self.inner.store.remove(USER_KEY)?,
        }

        debug!(user_id = ?user.as_ref().map(|u| u.id), "User updated");
        self.write_state().user = user;
        self.publish();
        Ok(())
    }

    /// Forward a user interaction signal to the watchdog.
    /// Returns false when no session is being watched.
    pub fn record_activity(&self, kind: ActivityKind) -> bool {
        self.watchdog().touch(kind)
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Send a request with the session's credentials.
    ///
    /// HTTP error statuses are returned as responses. A 401 ends the session
    /// first. Only transport failures come back as errors, after a network
    /// notice.
    pub async fn authenticated_request(
        &self,
        target: &str,
        options: RequestOptions,
    ) -> Result<Response, ApiError> {
        let token = self.token();
        let method = options.method.clone();

        let response = match self.send(target, options, token.as_deref()).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_network() {
                    error!(error = %e, %method, target, "Request failed");
                    self.inner.notifier.notify(Notice::NetworkError);
                }
                return Err(e);
            }
        };

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(%method, target, "Request rejected with 401");
            // A 401 for a token that is no longer current belongs to an older session
            if token.is_some() && token == self.token() {
                self.end_session(LogoutReason::Expired).await;
            } else {
                debug!(target, "Ignoring 401 for a stale or anonymous request");
            }
        }

        Ok(response)
    }

    async fn send(
        &self,
        target: &str,
        options: RequestOptions,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = resolve_url(&self.inner.settings.base_url, target)?;
        let headers = build_headers(token, &options.body, &options.headers)?;
        let response = options
            .into_request(&self.inner.client, url, headers)
            .send()
            .await?;
        Ok(response)
    }

    // =========================================================================
    // Login / logout
    // =========================================================================

    /// Exchange credentials for a token and start a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let options = RequestOptions::post().json(body);
        let login_path = self.inner.settings.login_path.clone();

        let response = match self.send(&login_path, options, None).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_network() {
                    error!(error = %e, "Login request failed");
                    self.inner.notifier.notify(Notice::NetworkError);
                }
                return Err(e);
            }
        };

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| DEFAULT_LOGIN_ERROR.to_string());
            warn!(%status, "Login rejected");
            return Err(ApiError::LoginRejected {
                status: status.as_u16(),
                message,
            });
        }

        let login: LoginResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("login response: {}", e)))?;

        self.set_token(Some(login.token))?;
        if let Err(e) = self.set_user(Some(login.user.clone())) {
            warn!(error = %e, "Failed to store user profile, discarding new session");
            if let Err(rollback) = self.set_token(None) {
                warn!(error = %rollback, "Failed to discard partial session");
            }
            return Err(e.into());
        }

        info!(user_id = login.user.id, "Login successful");
        self.inner.navigator.navigate(Route::Dashboard);
        self.inner.notifier.notify(Notice::SignedIn(
            login.message.unwrap_or_else(|| DEFAULT_LOGIN_GREETING.to_string()),
        ));

        Ok(login.user)
    }

    /// Explicit sign-out. Returns false if a logout already ran or nobody is
    /// signed in.
    pub async fn logout(&self) -> bool {
        self.end_session(LogoutReason::SignedOut).await
    }

    /// Run the logout sequence at most once per session.
    ///
    /// The guard is taken before any await, so concurrent triggers (explicit
    /// sign-out, 401s, the watchdog) collapse into one backend call, one
    /// cleanup, one navigation and one notice.
    pub async fn end_session(&self, reason: LogoutReason) -> bool {
        if !self.is_authenticated() {
            debug!(?reason, "No session to end");
            return false;
        }

        if self
            .inner
            .logout_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(?reason, "Logout already in progress");
            return false;
        }

        info!(?reason, "Ending session");
        self.publish();

        self.invalidate_remote_session().await;
        self.clear_local();

        self.inner.navigator.navigate(Route::Login);
        self.inner.notifier.notify(reason.notice());
        true
    }

    /// Best-effort backend logout; never blocks local cleanup.
    async fn invalidate_remote_session(&self) {
        let token = self.token();
        let timeout = self.inner.settings.logout_timeout;
        let logout_path = self.inner.settings.logout_path.clone();

        let call = self.send(&logout_path, RequestOptions::post(), token.as_deref());
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(response)) if response.status().is_success() => {
                debug!("Backend session invalidated");
            }
            Ok(Ok(response)) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(%status, body = %body, "Logout endpoint returned an error");
            }
            Ok(Err(e)) => warn!(error = %e, "Logout request failed"),
            Err(_) => warn!(timeout_ms = timeout.as_millis() as u64, "Logout request timed out"),
        }
    }

    /// Drop token and profile from memory and storage. Memory is always
    /// cleared even when storage fails.
    fn clear_local(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.inner.store.remove(key) {
                warn!(error = %e, key, "Failed to clear stored session entry");
            }
        }

        {
            let mut state = self.write_state();
            state.token = None;
            state.user = None;
        }

        self.watchdog().disarm();
        self.publish();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn arm_watchdog(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.watchdog().arm(move || async move {
            if let Some(inner) = weak.upgrade() {
                let manager = SessionManager { inner };
                manager.end_session(LogoutReason::Inactivity).await;
            }
        });
    }

    fn publish(&self) {
        let snapshot = {
            let state = self.read_state();
            SessionSnapshot {
                phase: Self::phase_of(
                    state.is_authenticated(),
                    self.inner.logout_started.load(Ordering::Acquire),
                ),
                user: state.user.clone(),
            }
        };
        self.inner.snapshot.send_replace(snapshot);
    }

    fn phase_of(authenticated: bool, logout_started: bool) -> SessionPhase {
        match (authenticated, logout_started) {
            (false, _) => SessionPhase::Anonymous,
            (true, true) => SessionPhase::LoggingOut,
            (true, false) => SessionPhase::Authenticated,
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn watchdog(&self) -> MutexGuard<'_, InactivityWatchdog> {
        self.inner.watchdog.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hooks::{ChannelHooks, UiEvent};
    use crate::auth::store::MemoryStore;
    use reqwest::Url;
    use std::io;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Memory store whose removal of one key always fails
    struct StuckEntryStore {
        entries: MemoryStore,
        stuck_key: &'static str,
    }

    impl SessionStore for StuckEntryStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.entries.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.entries.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            if key == self.stuck_key {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into());
            }
            self.entries.remove(key)
        }
    }

    fn unreachable_settings() -> SessionSettings {
        // Nothing listens on port 1, so the logout call fails fast
        let base = Url::parse("http://127.0.0.1:1").expect("url");
        SessionSettings::new(base).with_logout_timeout(Duration::from_secs(2))
    }

    fn manager_with(
        store: Arc<dyn SessionStore>,
    ) -> (SessionManager, UnboundedReceiver<UiEvent>) {
        let (hooks, rx) = ChannelHooks::new();
        let hooks = Arc::new(hooks);
        let manager = SessionManager::initialize(
            unreachable_settings(),
            store,
            hooks.clone(),
            hooks,
        )
        .expect("initialize");
        (manager, rx)
    }

    fn sample_user() -> UserProfile {
        UserProfile {
            id: 4,
            name: "Dewi".to_string(),
            email: "dewi@asdenim.id".to_string(),
            role: None,
        }
    }

    fn drain(rx: &mut UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_token_survives_reinitialize() {
        let store = Arc::new(MemoryStore::new());
        let (manager, _rx) = manager_with(store.clone());
        manager.set_token(Some("t1".to_string())).expect("set token");
        drop(manager);

        let (reloaded, _rx) = manager_with(store.clone());
        assert_eq!(reloaded.token().as_deref(), Some("t1"));
        assert_eq!(reloaded.phase(), SessionPhase::Authenticated);
        assert!(reloaded.watchdog_armed());

        reloaded.set_token(None).expect("clear token");
        drop(reloaded);

        let (reloaded, _rx) = manager_with(store);
        assert_eq!(reloaded.token(), None);
        assert_eq!(reloaded.phase(), SessionPhase::Anonymous);
        assert!(!reloaded.watchdog_armed());
    }

    #[tokio::test]
    async fn test_set_user_requires_token() {
        let (manager, _rx) = manager_with(Arc::new(MemoryStore::new()));
        assert!(matches!(
            manager.set_user(Some(sample_user())),
            Err(SessionError::UserWithoutToken)
        ));

        manager.set_token(Some("t1".to_string())).expect("set token");
        manager.set_user(Some(sample_user())).expect("set user");
        assert_eq!(manager.user().map(|u| u.id), Some(4));
        assert_eq!(manager.subscribe().borrow().user.as_ref().map(|u| u.id), Some(4));
    }

    #[tokio::test]
    async fn test_clearing_token_clears_user() {
        let store = Arc::new(MemoryStore::new());
        let (manager, _rx) = manager_with(store.clone());
        manager.set_token(Some("t1".to_string())).expect("set token");
        manager.set_user(Some(sample_user())).expect("set user");

        manager.set_token(None).expect("clear token");
        assert!(manager.user().is_none());
        assert_eq!(store.get(USER_KEY).expect("get"), None);
        assert!(!manager.watchdog_armed());
    }

    #[tokio::test]
    async fn test_failed_profile_removal_keeps_session_intact() {
        let store = Arc::new(StuckEntryStore {
            entries: MemoryStore::new(),
            stuck_key: USER_KEY,
        });
        let (manager, _rx) = manager_with(store.clone());
        manager.set_token(Some("t1".to_string())).expect("set token");
        manager.set_user(Some(sample_user())).expect("set user");

        assert!(manager.set_token(None).is_err());
        assert_eq!(manager.token().as_deref(), Some("t1"));
        assert_eq!(store.get(TOKEN_KEY).expect("get").as_deref(), Some("t1"));
        assert!(manager.user().is_some());
        assert!(store.get(USER_KEY).expect("get").is_some());
        assert_eq!(manager.phase(), SessionPhase::Authenticated);
        assert!(manager.watchdog_armed());
    }

    #[tokio::test]
    async fn test_failed_token_removal_drops_profile_in_memory_too() {
        let store = Arc::new(StuckEntryStore {
            entries: MemoryStore::new(),
            stuck_key: TOKEN_KEY,
        });
        let (manager, _rx) = manager_with(store.clone());
        manager.set_token(Some("t1".to_string())).expect("set token");
        manager.set_user(Some(sample_user())).expect("set user");

        assert!(manager.set_token(None).is_err());
        assert_eq!(manager.token(), store.get(TOKEN_KEY).expect("get"));
        assert!(manager.user().is_none());
        assert_eq!(store.get(USER_KEY).expect("get"), None);
        assert!(manager.subscribe().borrow().user.is_none());
    }

    #[tokio::test]
    async fn test_logout_when_anonymous_is_noop() {
        let (manager, mut rx) = manager_with(Arc::new(MemoryStore::new()));
        assert!(!manager.logout().await);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_logout_completes_when_backend_unreachable() {
        let store = Arc::new(MemoryStore::new());
        let (manager, mut rx) = manager_with(store.clone());
        manager.set_token(Some("t1".to_string())).expect("set token");
        manager.set_user(Some(sample_user())).expect("set user");

        assert!(manager.logout().await);
        assert!(!manager.logout().await);

        assert_eq!(manager.token(), None);
        assert_eq!(store.get(TOKEN_KEY).expect("get"), None);
        assert_eq!(
            drain(&mut rx),
            vec![UiEvent::Navigate(Route::Login), UiEvent::Notice(Notice::SignedOut)]
        );
    }

    #[tokio::test]
    async fn test_new_login_resets_guard() {
        let (manager, mut rx) = manager_with(Arc::new(MemoryStore::new()));
        manager.set_token(Some("t1".to_string())).expect("set token");
        assert!(manager.logout().await);

        manager.set_token(Some("t2".to_string())).expect("set token");
        assert_eq!(manager.phase(), SessionPhase::Authenticated);
        assert!(manager.end_session(LogoutReason::Expired).await);

        let notices: Vec<UiEvent> = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, UiEvent::Notice(_)))
            .collect();
        assert_eq!(
            notices,
            vec![UiEvent::Notice(Notice::SignedOut), UiEvent::Notice(Notice::SessionExpired)]
        );
    }

    #[tokio::test]
    async fn test_network_error_is_notified_and_returned() {
        let (manager, mut rx) = manager_with(Arc::new(MemoryStore::new()));
        let result = manager
            .authenticated_request("/api/admin/product", RequestOptions::get())
            .await;
        assert!(matches!(result, Err(ApiError::Network(_))));
        assert_eq!(drain(&mut rx), vec![UiEvent::Notice(Notice::NetworkError)]);
    }
}
