//! Authentication module: the signed-in session and everything around it.
//!
//! This module provides:
//! - `SessionManager`: Token state, authenticated requests, single-flight logout
//! - `InactivityWatchdog`: Forced sign-out after a quiet period (15 minutes by default)
//! - `SessionStore`: Where the token and profile are persisted (memory, files, keychain)
//! - `Notifier` / `Navigator`: Hooks through which the UI learns about session changes

pub mod hooks;
pub mod manager;
pub mod session;
pub mod store;
pub mod watchdog;

pub use hooks::{
    ChannelHooks, Navigator, Notice, NoticeLevel, Notifier, Route, TracingHooks, UiEvent,
};
pub use manager::{LogoutReason, SessionError, SessionManager};
pub use session::{SessionPhase, SessionSnapshot, SessionState};
pub use store::{FileStore, KeyringStore, MemoryStore, SessionStore, StoreError};
pub use watchdog::{ActivityKind, InactivityWatchdog, DEFAULT_INACTIVITY_WINDOW};
