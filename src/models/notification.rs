//! In-app notifications delivered to an agency (optionally one user in it).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    CooperationChange,
    SkuUpdate,
    System,
}

text_enum!(NotificationType {
    CooperationChange => "cooperation_change",
    SkuUpdate => "sku_update",
    System => "system",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub agency_id: Uuid,
    /// `None` addresses the whole agency
    pub user_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub content: String,
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<Uuid>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Notification before it is stored
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub agency_id: Uuid,
    pub user_id: Option<Uuid>,
    pub notification_type: NotificationType,
    pub title: String,
    pub content: String,
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<Uuid>,
}

impl NewNotification {
    pub fn cooperation(agency_id: Uuid, title: &str, content: String, relation_id: Uuid) -> Self {
        Self {
            agency_id,
            user_id: None,
            notification_type: NotificationType::CooperationChange,
            title: title.to_string(),
            content,
            related_entity_type: Some("cooperation".to_string()),
            related_entity_id: Some(relation_id),
        }
    }

    pub fn sku_update(agency_id: Uuid, title: &str, content: String, sku_id: Uuid) -> Self {
        Self {
            agency_id,
            user_id: None,
            notification_type: NotificationType::SkuUpdate,
            title: title.to_string(),
            content,
            related_entity_type: Some("sku".to_string()),
            related_entity_id: Some(sku_id),
        }
    }

    pub fn into_notification(self, now: DateTime<Utc>) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            agency_id: self.agency_id,
            user_id: self.user_id,
            notification_type: self.notification_type,
            title: self.title,
            content: self.content,
            related_entity_type: self.related_entity_type,
            related_entity_id: self.related_entity_id,
            is_read: false,
            read_at: None,
            created_at: now,
        }
    }
}
