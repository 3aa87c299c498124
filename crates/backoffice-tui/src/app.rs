//! Application state management for the back office console.
//!
//! `App` owns the session manager and the admin API, the login form, the
//! sidebar selection and the last fetched body. Session notices and
//! navigation arrive from the core over a `ChannelHooks` channel; fetches
//! run as background tasks and report back over an mpsc channel.

use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use backoffice_core::api::{AdminApi, ApiError};
use backoffice_core::auth::{ChannelHooks, Notice, NoticeLevel, Route, SessionManager, UiEvent};
use backoffice_core::models::Resource;
use backoffice_core::Config;

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background fetch channel
const CHANNEL_BUFFER_SIZE: usize = 16;

/// Maximum length for email input
const MAX_EMAIL_LENGTH: usize = 100;

/// Maximum length for password input
const MAX_PASSWORD_LENGTH: usize = 128;

/// Lines to scroll on page up/down
pub const PAGE_SCROLL_SIZE: u16 = 10;

// ============================================================================
// UI State Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    LoggingIn,
    ConfirmingQuit,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

/// Sidebar entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavItem {
    Dashboard,
    Resource(Resource),
    SalesReport,
}

impl NavItem {
    pub fn all() -> Vec<NavItem> {
        let mut items = vec![NavItem::Dashboard];
        items.extend(Resource::ALL.iter().copied().map(NavItem::Resource));
        items.push(NavItem::SalesReport);
        items
    }

    pub fn title(&self) -> &'static str {
        match self {
            NavItem::Dashboard => "Dashboard",
            NavItem::Resource(resource) => resource.title(),
            NavItem::SalesReport => "Sales report",
        }
    }
}

/// Status bar message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub level: NoticeLevel,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: NoticeLevel::Info,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: NoticeLevel::Error,
        }
    }
}

impl From<&Notice> for StatusMessage {
    fn from(notice: &Notice) -> Self {
        Self {
            text: notice.message(),
            level: notice.level(),
        }
    }
}

/// Result of a background fetch
#[derive(Debug)]
pub struct FetchResult {
    pub item: NavItem,
    pub outcome: Result<String, String>,
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub config: Config,
    pub session: SessionManager,
    pub api: AdminApi,
    pub state: AppState,

    ui_rx: mpsc::UnboundedReceiver<UiEvent>,
    fetch_tx: mpsc::Sender<FetchResult>,
    fetch_rx: mpsc::Receiver<FetchResult>,

    // Navigation
    pub nav_items: Vec<NavItem>,
    pub nav_selection: usize,

    // Content pane
    pub content_item: Option<NavItem>,
    pub content: Option<String>,
    pub content_scroll: u16,
    pub loading: bool,

    // Login form
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    pub status_message: Option<StatusMessage>,
}

impl App {
    /// Create the application and restore any stored session.
    /// Must be called from within the Tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        let settings = config.session_settings()?;
        let store = config.open_store()?;
        let (hooks, ui_rx) = ChannelHooks::new();
        let session = SessionManager::initialize(
            settings,
            store,
            Arc::new(hooks.clone()),
            Arc::new(hooks),
        )?;
        let api = AdminApi::new(session.clone());
        let (fetch_tx, fetch_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let login_email = config.last_email.clone().unwrap_or_default();
        let login_focus = if login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
        let state = if session.is_authenticated() {
            AppState::Normal
        } else {
            AppState::LoggingIn
        };
        debug!(?state, "App created");

        Ok(Self {
            config,
            session,
            api,
            state,
            ui_rx,
            fetch_tx,
            fetch_rx,
            nav_items: NavItem::all(),
            nav_selection: 0,
            content_item: None,
            content: None,
            content_scroll: 0,
            loading: false,
            login_email,
            login_password: String::new(),
            login_focus,
            login_error: None,
            status_message: None,
        })
    }

    pub fn selected_item(&self) -> NavItem {
        self.nav_items
            .get(self.nav_selection)
            .copied()
            .unwrap_or(NavItem::Dashboard)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn can_add_email_char(&self, c: char) -> bool {
        !c.is_control() && !c.is_whitespace() && self.login_email.len() < MAX_EMAIL_LENGTH
    }

    pub fn can_add_password_char(&self, c: char) -> bool {
        !c.is_control() && self.login_password.len() < MAX_PASSWORD_LENGTH
    }

    /// Submit the login form. On success the session manager navigates to
    /// the dashboard, which closes the overlay on the next tick.
    pub async fn attempt_login(&mut self) {
        let email = self.login_email.trim().to_string();
        if email.is_empty() || self.login_password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return;
        }

        self.login_error = None;
        match self.session.login(&email, &self.login_password).await {
            Ok(user) => {
                info!(user = %user.display_name(), "Signed in");
                self.login_password.clear();
                self.config.last_email = Some(email);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
            }
            Err(ApiError::LoginRejected { message, .. }) => {
                self.login_error = Some(message);
            }
            Err(ApiError::Network(_)) => {
                self.login_error = Some(Notice::NetworkError.message());
            }
            Err(e) => {
                self.login_error = Some(e.to_string());
            }
        }
    }

    pub async fn sign_out(&mut self) {
        if !self.session.logout().await {
            debug!("Sign out ignored, no session in progress");
        }
    }

    fn open_login(&mut self) {
        if self.state == AppState::Quitting {
            return;
        }
        self.state = AppState::LoggingIn;
        self.content = None;
        self.content_item = None;
        self.content_scroll = 0;
        self.loading = false;
        self.login_password.clear();
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
    }

    // =========================================================================
    // Fetching
    // =========================================================================

    /// Fetch the selected sidebar entry in a background task
    pub fn fetch_selected(&mut self) {
        let item = self.selected_item();
        let api = self.api.clone();
        let tx = self.fetch_tx.clone();

        self.loading = true;
        self.content_item = Some(item);
        self.status_message = Some(StatusMessage::info(format!("Loading {}...", item.title())));

        tokio::spawn(async move {
            let outcome = fetch_item(&api, item)
                .await
                .and_then(|value| serde_json::to_string_pretty(&value).map_err(Into::into))
                .map_err(|e| format!("{:#}", e));
            // Receiver gone means the app is shutting down
            let _ = tx.send(FetchResult { item, outcome }).await;
        });
    }

    fn apply_fetch_result(&mut self, result: FetchResult) {
        // Ignore results for an entry the user has already moved away from
        if self.content_item != Some(result.item) {
            return;
        }
        self.loading = false;

        match result.outcome {
            Ok(body) => {
                self.content = Some(body);
                self.content_scroll = 0;
                self.status_message = None;
            }
            Err(error) => {
                warn!(item = result.item.title(), %error, "Fetch failed");
                self.content = None;
                // A session notice explains failures caused by sign-out
                if self.session.is_authenticated() {
                    self.status_message = Some(StatusMessage::error(error));
                }
            }
        }
    }

    pub fn scroll_content(&mut self, delta: i32) {
        let next = i32::from(self.content_scroll) + delta;
        self.content_scroll = next.clamp(0, i32::from(u16::MAX)) as u16;
    }

    // =========================================================================
    // Background events
    // =========================================================================

    fn handle_ui_event(&mut self, event: UiEvent) {
        debug!(?event, "UI event");
        match event {
            UiEvent::Notice(notice) => {
                self.status_message = Some(StatusMessage::from(&notice));
            }
            UiEvent::Navigate(Route::Login) => self.open_login(),
            UiEvent::Navigate(Route::Dashboard) => {
                self.state = AppState::Normal;
                self.login_error = None;
                self.nav_selection = 0;
                self.fetch_selected();
            }
        }
    }

    /// Drain session events and finished fetches
    pub fn check_background_tasks(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.handle_ui_event(event);
        }
        while let Ok(result) = self.fetch_rx.try_recv() {
            self.apply_fetch_result(result);
        }
    }
}

async fn fetch_item(api: &AdminApi, item: NavItem) -> Result<Value> {
    match item {
        NavItem::Dashboard => {
            let dashboard = api.dashboard().await?;
            Ok(json!({
                "summary": dashboard.summary,
                "recent_orders": dashboard.recent_orders,
                "sales": dashboard.sales,
                "orders": dashboard.orders,
            }))
        }
        NavItem::Resource(resource) => api.list(resource).await,
        NavItem::SalesReport => api.sales_report(None).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nav_items_cover_every_resource() {
        let items = NavItem::all();
        assert_eq!(items.len(), Resource::ALL.len() + 2);
        assert_eq!(items.first(), Some(&NavItem::Dashboard));
        assert_eq!(items.last(), Some(&NavItem::SalesReport));
    }

    #[test]
    fn test_status_from_notice() {
        let status = StatusMessage::from(&Notice::SessionExpired);
        assert_eq!(status.level, NoticeLevel::Error);
        assert_eq!(status.text, "Your session has expired. Please sign in again.");
    }
}
