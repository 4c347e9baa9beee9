//! Request DTOs for notification endpoints.

use serde::Deserialize;
use uuid::Uuid;

use crate::models::NotificationType;
use crate::store::NotificationFilter;

/// Query string of the inbox listing
#[derive(Debug, Default, Deserialize)]
pub struct NotificationListQuery {
    #[serde(default, rename = "type")]
    pub notification_type: Option<NotificationType>,
    #[serde(default)]
    pub is_read: Option<bool>,
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl NotificationListQuery {
    pub fn filter(&self) -> NotificationFilter {
        NotificationFilter {
            user_id: None,
            notification_type: self.notification_type,
            is_read: self.is_read,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub ids: Vec<Uuid>,
}
