//! User-facing notifications
//!
//! A submit ends in exactly one [`Notification`]. [`BannerBoard`] keeps the
//! banner lifecycle: one banner at a time, a new banner replaces the old one,
//! and each banner dismisses itself after a fixed interval unless it was
//! replaced or closed first.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default auto-dismiss interval
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(5);

/// Banner style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Failure,
}

/// Message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    /// Success banner
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    /// Failure banner
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Failure,
            message: message.into(),
        }
    }

    /// Check if this reports success
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.kind == NotificationKind::Success
    }
}

/// Sink for notifications
pub trait Notifier: Send + Sync {
    /// Present `notification`, replacing whatever was shown before
    fn show(&self, notification: Notification);
}

#[derive(Debug, Default)]
struct Board {
    current: Option<(u64, Notification)>,
    generation: u64,
    shown: usize,
}

/// Single-slot banner with auto-dismiss
///
/// Clones share the same slot. The dismiss timer is a tokio task, so
/// auto-dismiss only happens when [`Notifier::show`] is called inside a
/// runtime; outside one the banner stays until replaced or closed.
#[derive(Debug, Clone)]
pub struct BannerBoard {
    board: Arc<Mutex<Board>>,
    dismiss_after: Option<Duration>,
}

impl BannerBoard {
    /// Board dismissing banners after `dismiss_after`
    #[must_use]
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            board: Arc::default(),
            dismiss_after: Some(dismiss_after),
        }
    }

    /// Board whose banners stay until replaced or closed
    #[must_use]
    pub fn persistent() -> Self {
        Self {
            board: Arc::default(),
            dismiss_after: None,
        }
    }

    /// Banner on display
    #[must_use]
    pub fn current(&self) -> Option<Notification> {
        self.board.lock().current.as_ref().map(|(_, n)| n.clone())
    }

    /// Dismiss the banner on display; false if there was none
    pub fn close(&self) -> bool {
        self.board.lock().current.take().is_some()
    }

    /// Number of banners shown so far
    #[must_use]
    pub fn shown(&self) -> usize {
        self.board.lock().shown
    }
}

impl Default for BannerBoard {
    fn default() -> Self {
        Self::new(DEFAULT_DISMISS_AFTER)
    }
}

impl Notifier for BannerBoard {
    fn show(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => tracing::info!("{}", notification.message),
            NotificationKind::Failure => tracing::error!("{}", notification.message),
        }
        let id = {
            let mut board = self.board.lock();
            board.generation += 1;
            board.shown += 1;
            board.current = Some((board.generation, notification));
            board.generation
        };

        let Some(after) = self.dismiss_after else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime, banner {} will not auto-dismiss", id);
            return;
        };
        let board = Arc::clone(&self.board);
        handle.spawn(async move {
            tokio::time::sleep(after).await;
            let mut board = board.lock();
            // A newer banner has its own timer
            if matches!(board.current, Some((shown, _)) if shown == id) {
                board.current = None;
            }
        });
    }
}
