//! Toast notifications for success and error messages.
//!
//! A store sends at most one notification per [NOTIFICATION_WINDOW] so that a
//! burst of operations, e.g. creating several budgets in a row, shows a single
//! toast.

use std::time::{Duration, Instant};

use serde::Serialize;

/// The minimum time between two notifications of the same store.
pub const NOTIFICATION_WINDOW: Duration = Duration::from_secs(5);

/// Notification types for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// An operation succeeded.
    Success,
    /// An operation failed.
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Success or error.
    pub kind: NotificationKind,
    /// The text to show.
    pub message: String,
}

impl Notification {
    /// Create a new success notification.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    /// Create a new error notification.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }
}

/// Lets a notification through only if the previous one was at least
/// `window` ago.
///
/// The window applies to every notification of the owner regardless of the
/// message.
#[derive(Debug, Clone)]
pub struct NotificationGate {
    window: Duration,
    last_sent: Option<Instant>,
}

impl Default for NotificationGate {
    fn default() -> Self {
        Self::new(NOTIFICATION_WINDOW)
    }
}

impl NotificationGate {
    /// A gate with the given debounce `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent: None,
        }
    }

    /// Whether a notification may be sent at `now`. Records `now` as the last
    /// send time when it may.
    pub fn try_pass(&mut self, now: Instant) -> bool {
        let allowed = self
            .last_sent
            .is_none_or(|last| now.saturating_duration_since(last) >= self.window);

        if allowed {
            self.last_sent = Some(now);
        }

        allowed
    }
}
