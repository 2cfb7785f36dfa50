//! Non-fatal notification channel.
//!
//! Failures that the user should see but that never abort anything (remote
//! errors, CSV decode errors, rollbacks) are published here. Every
//! notification is also logged, so nothing is lost when no one subscribes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{DecodeError, RemoteError};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// What a notification is about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationKind {
    /// The remote label store did not acknowledge a label change.
    LabelUpdateFailed { job_id: String, label: String },
    /// An optimistic label change was reverted.
    RolledBack { job_id: String },
    /// A CSV file could not be read; the collection was left unchanged.
    DecodeFailed,
    /// Any other remote operation failed.
    RemoteFailed { operation: String },
    /// Informational message, e.g. a finished import.
    Status,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: Level,
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: Level, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            level,
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn label_update_failed(job_id: &str, label: &str, error: &RemoteError) -> Self {
        Self::new(
            Level::Error,
            NotificationKind::LabelUpdateFailed {
                job_id: job_id.to_string(),
                label: label.to_string(),
            },
            format!("Could not save label '{}' for job {}: {}", label, job_id, error),
        )
    }

    pub fn rolled_back(job_id: &str) -> Self {
        Self::new(
            Level::Warning,
            NotificationKind::RolledBack {
                job_id: job_id.to_string(),
            },
            format!("Reverted label change for job {}", job_id),
        )
    }

    pub fn decode_failed(error: &DecodeError) -> Self {
        Self::new(Level::Error, NotificationKind::DecodeFailed, error.to_string())
    }

    pub fn remote_failed(error: &RemoteError) -> Self {
        Self::new(
            Level::Error,
            NotificationKind::RemoteFailed {
                operation: error.operation().to_string(),
            },
            error.to_string(),
        )
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self::new(Level::Info, NotificationKind::Status, message)
    }
}

/// Broadcasts notifications to any number of subscribers.
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<broadcast::Sender<Notification>>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Logs the notification and sends it to all current subscribers.
    pub fn send(&self, notification: Notification) {
        match notification.level {
            Level::Info => log::info!("{}", notification.message),
            Level::Warning => log::warn!("{}", notification.message),
            Level::Error => log::error!("{}", notification.message),
        }
        // No active receivers is fine
        let _ = self.sender.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}
