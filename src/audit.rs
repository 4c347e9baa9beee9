//! Audit recorder.
//!
//! Fire-and-forget: a failed write is logged and dropped, never surfaced to
//! the operation that triggered it.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::identity::Identity;
use crate::models::AuditLogEntry;
use crate::store::AuditStore;

/// JSON snapshot for `before_data` / `after_data`
pub fn snapshot<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

/// Record one audit entry for a mutation performed by `actor`.
pub async fn record<S: AuditStore>(
    store: &S,
    actor: &Identity,
    action: &str,
    entity_type: &str,
    entity_id: Uuid,
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
) {
    let entry = AuditLogEntry {
        id: Uuid::new_v4(),
        agency_id: actor.agency_id,
        user_id: actor.user_id,
        action: action.to_string(),
        entity_type: entity_type.to_string(),
        entity_id,
        before_data: before,
        after_data: after,
        created_at: Utc::now(),
    };

    if let Err(e) = store.insert_audit(entry).await {
        tracing::warn!(action, %entity_id, error = %e, "Failed to write audit entry");
    }
}
