use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of message a driver notification carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    StatusUpdate,
    AdminAction,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::StatusUpdate => "status_update",
            NotificationKind::AdminAction => "admin_action",
        }
    }
}

/// A notification intent addressed to the driver holding a PO number.
/// Delivery (SMS, push, etc.) is a downstream concern; this records what
/// should be said and to whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub id: i64,
    pub po_number: String,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
