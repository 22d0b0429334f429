//! Notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DealerId, NotificationId, Role, UserId};

/// Visual severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Info => "info",
            NotificationType::Success => "success",
            NotificationType::Warning => "warning",
            NotificationType::Error => "error",
        }
    }
}

/// One notification addressed to one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Who a batch is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipients {
    /// Specific users
    Users(Vec<UserId>),
    /// Every active user holding any of the roles
    Roles(Vec<Role>),
    /// Every active user of a dealer organisation
    Dealer(DealerId),
}

/// Same title and message for a set of recipients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationBatch {
    pub recipients: Recipients,
    /// Usually the acting user, who does not need to hear about their own action
    pub exclude: Option<UserId>,
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
    pub link: Option<String>,
}

impl NotificationBatch {
    /// Materializes one notification per recipient
    pub fn to_notifications(&self, recipients: &[UserId], now: DateTime<Utc>) -> Vec<Notification> {
        recipients
            .iter()
            .map(|user_id| Notification {
                id: NotificationId::new_v7(),
                user_id: *user_id,
                title: self.title.clone(),
                message: self.message.clone(),
                kind: self.kind,
                link: self.link.clone(),
                is_read: false,
                created_at: now,
            })
            .collect()
    }
}
