//! User-facing notifications (toasts). Only remote-call outcomes end up here;
//! field validation errors stay on the form.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

const MAX_RETAINED: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
    pub at: DateTime<Utc>,
}

/// Shared, bounded log of recent notifications; newest last.
#[derive(Clone, Default)]
pub struct Notifier {
    recent: Arc<RwLock<VecDeque<Notification>>>,
}

impl Notifier {
    pub async fn info(&self, title: &str, description: impl Into<String>) {
        self.push(NotificationKind::Info, title, description.into())
            .await;
    }

    pub async fn success(&self, title: &str, description: impl Into<String>) {
        self.push(NotificationKind::Success, title, description.into())
            .await;
    }

    pub async fn error(&self, title: &str, description: impl Into<String>) {
        self.push(NotificationKind::Error, title, description.into())
            .await;
    }

    pub async fn recent(&self) -> Vec<Notification> {
        self.recent.read().await.iter().cloned().collect()
    }

    /// Holds the log exclusively, stalling every notification until dropped.
    #[cfg(test)]
    pub async fn lock_for_test(&self) -> tokio::sync::RwLockWriteGuard<'_, VecDeque<Notification>> {
        self.recent.write().await
    }

    async fn push(&self, kind: NotificationKind, title: &str, description: String) {
        match kind {
            NotificationKind::Error => warn!("{title}: {description}"),
            _ => info!("{title}: {description}"),
        }

        let mut recent = self.recent.write().await;
        if recent.len() == MAX_RETAINED {
            recent.pop_front();
        }
        recent.push_back(Notification {
            kind,
            title: title.to_string(),
            description,
            at: Utc::now(),
        });
    }
}
