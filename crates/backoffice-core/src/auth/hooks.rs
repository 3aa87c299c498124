//! Callbacks the session manager drives: user notices and navigation.

use tokio::sync::mpsc;
use tracing::{error, info};

/// User-visible notice raised by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Login succeeded, with the backend's greeting if it sent one
    SignedIn(String),
    /// Explicit sign-out
    SignedOut,
    /// The backend rejected the token
    SessionExpired,
    /// The inactivity watchdog fired
    Inactivity,
    /// A request never got a response
    NetworkError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::SignedIn(message) => message.clone(),
            Notice::SignedOut => "You have been signed out.".to_string(),
            Notice::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            Notice::Inactivity => "You were signed out after a period of inactivity.".to_string(),
            Notice::NetworkError => "A network error occurred. Please try again.".to_string(),
        }
    }

    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::SignedIn(_) | Notice::SignedOut => NoticeLevel::Success,
            Notice::Inactivity => NoticeLevel::Info,
            Notice::SessionExpired | Notice::NetworkError => NoticeLevel::Error,
        }
    }
}

/// Screens the session manager can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Hooks for headless use: notices and navigation only reach the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHooks;

impl Notifier for TracingHooks {
    fn notify(&self, notice: Notice) {
        match notice.level() {
            NoticeLevel::Error => error!(message = %notice.message(), "Session notice"),
            _ => info!(message = %notice.message(), "Session notice"),
        }
    }
}

impl Navigator for TracingHooks {
    fn navigate(&self, route: Route) {
        info!(?route, "Navigate");
    }
}

/// Event delivered to a UI loop by `ChannelHooks`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Notice(Notice),
    Navigate(Route),
}

/// Forwards notices and navigation to a UI event loop over a channel.
#[derive(Debug, Clone)]
pub struct ChannelHooks {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelHooks {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: UiEvent) {
        // Receiver gone means the UI is shutting down
        let _ = self.tx.send(event);
    }
}

impl Notifier for ChannelHooks {
    fn notify(&self, notice: Notice) {
        self.send(UiEvent::Notice(notice));
    }
}

impl Navigator for ChannelHooks {
    fn navigate(&self, route: Route) {
        self.send(UiEvent::Navigate(route));
    }
}
