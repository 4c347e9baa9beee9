//! Audit log entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub agency_id: Uuid,
    pub user_id: Uuid,
    /// Dotted action name, e.g. `sku.copy_from_public`
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub before_data: Option<serde_json::Value>,
    pub after_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
