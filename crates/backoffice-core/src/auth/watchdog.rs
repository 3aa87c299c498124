//! Inactivity watchdog: an owned, cancellable deadline timer.
//!
//! While armed, a single Tokio task waits for the inactivity window to pass.
//! Every activity signal pushes the deadline back to now + window. When the
//! deadline is reached the timeout callback runs on its own task, so it may
//! disarm this watchdog without cancelling itself.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Default inactivity window before a forced sign-out
pub const DEFAULT_INACTIVITY_WINDOW: Duration = Duration::from_secs(15 * 60);

/// User interaction signals that count as activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Click,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 5] = [
        ActivityKind::Click,
        ActivityKind::PointerMove,
        ActivityKind::KeyPress,
        ActivityKind::Scroll,
        ActivityKind::TouchStart,
    ];
}

struct Armed {
    reset: Arc<Notify>,
    handle: JoinHandle<()>,
}

pub struct InactivityWatchdog {
    window: Duration,
    armed: Option<Armed>,
    last_activity: Option<DateTime<Utc>>,
}

impl InactivityWatchdog {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed: None,
            last_activity: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start (or restart) the deadline. Any previous timer is cancelled.
    /// Must be called from within a Tokio runtime.
    pub fn arm<F, Fut>(&mut self, on_timeout: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.disarm();

        let reset = Arc::new(Notify::new());
        let signal = Arc::clone(&reset);
        let window = self.window;

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(window) => break,
                    _ = signal.notified() => continue,
                }
            }
            debug!(window_secs = window.as_secs(), "Inactivity window elapsed");
            tokio::spawn(on_timeout());
        });

        self.armed = Some(Armed { reset, handle });
        self.last_activity = Some(Utc::now());
        debug!(window_secs = self.window.as_secs(), "Inactivity watchdog armed");
    }

    /// Record an activity signal. Returns false when disarmed, in which case
    /// the signal is ignored.
    pub fn touch(&mut self, kind: ActivityKind) -> bool {
        match self.armed {
            Some(ref armed) if !armed.handle.is_finished() => {
                armed.reset.notify_one();
                self.last_activity = Some(Utc::now());
                trace!(?kind, "Activity recorded");
                true
            }
            _ => false,
        }
    }

    /// Cancel the pending deadline, if any
    pub fn disarm(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.handle.abort();
            debug!("Inactivity watchdog disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
            .as_ref()
            .map(|armed| !armed.handle.is_finished())
            .unwrap_or(false)
    }

    /// Time of the last recorded activity (or of arming)
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_activity
    }
}

impl Drop for InactivityWatchdog {
    fn drop(&mut self) {
        self.disarm();
    }
}
