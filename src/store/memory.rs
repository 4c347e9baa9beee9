//! Process-local store.
//!
//! All tables sit behind one `RwLock`, so every trait method is atomic with
//! respect to every other. Rows are kept in insertion order, which gives the
//! stable tie-break the listing contracts ask for.

use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AuditStore, CooperationFilter, CooperationStore, FactorStore, ImportTaskStore,
    NotificationFilter, NotificationStore, Pagination, PublicSkuFilter, SkuFilter, SkuStore,
};
use crate::error::{AppError, Result};
use crate::models::{
    AuditLogEntry, CooperationRelation, CooperationStatus, ImportStatus, ImportTask,
    Notification, OwnerType, PricingFactor, Sku,
};

#[derive(Default)]
struct Tables {
    skus: Vec<Sku>,
    factors: Vec<PricingFactor>,
    cooperations: Vec<CooperationRelation>,
    notifications: Vec<Notification>,
    audit: Vec<AuditLogEntry>,
    import_tasks: Vec<ImportTask>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SkuStore for MemoryStore {
    async fn insert_sku(&self, sku: Sku) -> Result<Sku> {
        let mut tables = self.tables.write().await;
        tables.skus.push(sku.clone());
        Ok(sku)
    }

    async fn get_sku(&self, agency_id: Uuid, id: Uuid) -> Result<Option<Sku>> {
        let tables = self.tables.read().await;
        Ok(tables
            .skus
            .iter()
            .find(|s| s.id == id && s.agency_id == agency_id)
            .cloned())
    }

    async fn get_public_sku(&self, id: Uuid) -> Result<Option<Sku>> {
        let tables = self.tables.read().await;
        Ok(tables
            .skus
            .iter()
            .find(|s| s.id == id && (s.is_public || s.owner_type == OwnerType::Public))
            .cloned())
    }

    async fn update_sku(&self, sku: &Sku) -> Result<Option<Sku>> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables
            .skus
            .iter_mut()
            .find(|s| s.id == sku.id && s.agency_id == sku.agency_id)
        else {
            return Ok(None);
        };

        let mut next = sku.clone();
        next.sku_type = stored.sku_type;
        next.created_at = stored.created_at;
        next.owner_type = stored.owner_type;
        next.is_public = stored.is_public;
        next.public_status = stored.public_status;
        next.visibility_scope = stored.visibility_scope;
        next.partner_whitelist = stored.partner_whitelist.clone();
        next.source_org_id = stored.source_org_id;
        next.source_sku_id = stored.source_sku_id;
        next.applied_factor_id = stored.applied_factor_id;
        *stored = next.clone();
        Ok(Some(next))
    }

    async fn update_sku_visibility(&self, sku: &Sku) -> Result<Option<Sku>> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables
            .skus
            .iter_mut()
            .find(|s| s.id == sku.id && s.agency_id == sku.agency_id)
        else {
            return Ok(None);
        };

        stored.owner_type = sku.owner_type;
        stored.is_public = sku.is_public;
        stored.public_status = sku.public_status;
        stored.visibility_scope = sku.visibility_scope;
        stored.partner_whitelist = sku.partner_whitelist.clone();
        stored.updated_at = sku.updated_at;
        Ok(Some(stored.clone()))
    }

    async fn delete_sku(&self, agency_id: Uuid, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.skus.len();
        tables
            .skus
            .retain(|s| !(s.id == id && s.agency_id == agency_id));
        Ok(tables.skus.len() != before)
    }

    async fn list_skus(
        &self,
        agency_id: Uuid,
        filter: &SkuFilter,
        page: Pagination,
    ) -> Result<Vec<Sku>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Sku> = tables
            .skus
            .iter()
            .rev()
            .filter(|s| s.agency_id == agency_id && filter.matches(s))
            .collect();
        rows.sort_by_key(|s| Reverse(s.updated_at));
        Ok(page.apply(rows.into_iter().cloned()))
    }

    async fn list_public_skus(
        &self,
        filter: &PublicSkuFilter,
        page: Pagination,
    ) -> Result<Vec<Sku>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Sku> = tables
            .skus
            .iter()
            .rev()
            .filter(|s| filter.matches(s))
            .collect();
        rows.sort_by_key(|s| Reverse(s.updated_at));
        Ok(page.apply(rows.into_iter().cloned()))
    }

    async fn list_derived_skus(&self, source_sku_id: Uuid) -> Result<Vec<Sku>> {
        let tables = self.tables.read().await;
        Ok(tables
            .skus
            .iter()
            .filter(|s| s.source_sku_id == Some(source_sku_id))
            .cloned()
            .collect())
    }

    async fn claim_published_sku<F>(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        build_copy: F,
    ) -> Result<Option<Sku>>
    where
        F: FnOnce(&Sku) -> Sku + Send,
    {
        let mut tables = self.tables.write().await;
        let Some(origin) = tables.skus.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if !origin.is_claimable() {
            return Ok(None);
        }

        let copy = build_copy(origin);
        origin.mark_removed(now);
        tables.skus.push(copy.clone());
        Ok(Some(copy))
    }
}

impl FactorStore for MemoryStore {
    async fn insert_factor(&self, factor: PricingFactor) -> Result<PricingFactor> {
        let mut tables = self.tables.write().await;
        tables.factors.push(factor.clone());
        Ok(factor)
    }

    async fn get_factor(&self, agency_id: Uuid, id: Uuid) -> Result<Option<PricingFactor>> {
        let tables = self.tables.read().await;
        Ok(tables
            .factors
            .iter()
            .find(|f| f.id == id && f.agency_id == agency_id)
            .cloned())
    }

    async fn update_factor(&self, factor: &PricingFactor) -> Result<Option<PricingFactor>> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables
            .factors
            .iter_mut()
            .find(|f| f.id == factor.id && f.agency_id == factor.agency_id)
        else {
            return Ok(None);
        };

        let mut next = factor.clone();
        next.created_at = stored.created_at;
        *stored = next.clone();
        Ok(Some(next))
    }

    async fn delete_factor(&self, agency_id: Uuid, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.factors.len();
        tables
            .factors
            .retain(|f| !(f.id == id && f.agency_id == agency_id));
        Ok(tables.factors.len() != before)
    }

    async fn list_factors(&self, agency_id: Uuid) -> Result<Vec<PricingFactor>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<PricingFactor> = tables
            .factors
            .iter()
            .filter(|f| f.agency_id == agency_id)
            .cloned()
            .collect();
        rows.sort_by_key(|f| Reverse(f.priority));
        Ok(rows)
    }
}

impl CooperationStore for MemoryStore {
    async fn insert_cooperation(
        &self,
        relation: CooperationRelation,
    ) -> Result<CooperationRelation> {
        let mut tables = self.tables.write().await;
        let now = relation.created_at;
        for stale in tables.cooperations.iter_mut().filter(|r| {
            r.from_agency_id == relation.from_agency_id
                && r.to_agency_id == relation.to_agency_id
                && r.status == CooperationStatus::Pending
                && r.expired_at.is_some_and(|at| at <= now)
        }) {
            stale.status = CooperationStatus::Expired;
            stale.updated_at = now;
        }

        let duplicate = tables.cooperations.iter().any(|r| {
            r.from_agency_id == relation.from_agency_id
                && r.to_agency_id == relation.to_agency_id
                && r.status.is_active()
        });
        if duplicate {
            return Err(AppError::validation(
                "a pending or approved cooperation already exists for this pair",
            ));
        }

        tables.cooperations.push(relation.clone());
        Ok(relation)
    }

    async fn get_cooperation(&self, id: Uuid) -> Result<Option<CooperationRelation>> {
        let tables = self.tables.read().await;
        Ok(tables.cooperations.iter().find(|r| r.id == id).cloned())
    }

    async fn transition_cooperation(
        &self,
        relation: &CooperationRelation,
        expected: CooperationStatus,
    ) -> Result<Option<CooperationRelation>> {
        let mut tables = self.tables.write().await;
        match tables
            .cooperations
            .iter_mut()
            .find(|r| r.id == relation.id && r.status == expected)
        {
            Some(stored) => {
                *stored = relation.clone();
                Ok(Some(relation.clone()))
            }
            None => Ok(None),
        }
    }

    async fn latest_cooperation(
        &self,
        from_agency_id: Uuid,
        to_agency_id: Uuid,
    ) -> Result<Option<CooperationRelation>> {
        let tables = self.tables.read().await;
        // max_by_key keeps the last maximum, so equal timestamps resolve to the newest insert
        Ok(tables
            .cooperations
            .iter()
            .filter(|r| r.from_agency_id == from_agency_id && r.to_agency_id == to_agency_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn list_cooperations(
        &self,
        agency_id: Uuid,
        filter: &CooperationFilter,
        page: Pagination,
    ) -> Result<Vec<CooperationRelation>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&CooperationRelation> = tables
            .cooperations
            .iter()
            .rev()
            .filter(|r| r.visible_to(agency_id, filter.role))
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .collect();
        rows.sort_by_key(|r| Reverse(r.created_at));
        Ok(page.apply(rows.into_iter().cloned()))
    }

    async fn expire_pending_cooperations(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let mut expired = 0;
        for relation in tables.cooperations.iter_mut() {
            let due = relation.expired_at.is_some_and(|at| at <= now);
            if relation.status == CooperationStatus::Pending && due {
                relation.status = CooperationStatus::Expired;
                relation.updated_at = now;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: Notification) -> Result<Notification> {
        let mut tables = self.tables.write().await;
        tables.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        agency_id: Uuid,
        filter: &NotificationFilter,
        page: Pagination,
    ) -> Result<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Notification> = tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.agency_id == agency_id && filter.matches(n))
            .collect();
        rows.sort_by_key(|n| Reverse(n.created_at));
        Ok(page.apply(rows.into_iter().cloned()))
    }

    async fn mark_notifications_read(
        &self,
        agency_id: Uuid,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let mut updated = 0;
        for n in tables.notifications.iter_mut() {
            if n.agency_id == agency_id && !n.is_read && ids.contains(&n.id) {
                n.is_read = true;
                n.read_at = Some(now);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn count_unread_notifications(
        &self,
        agency_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<u64> {
        let tables = self.tables.read().await;
        let filter = NotificationFilter {
            user_id,
            is_read: Some(false),
            ..Default::default()
        };
        Ok(tables
            .notifications
            .iter()
            .filter(|n| n.agency_id == agency_id && filter.matches(n))
            .count() as u64)
    }
}

impl AuditStore for MemoryStore {
    async fn insert_audit(&self, entry: AuditLogEntry) -> Result<()> {
        self.tables.write().await.audit.push(entry);
        Ok(())
    }

    async fn list_audit(
        &self,
        agency_id: Uuid,
        entity_id: Option<Uuid>,
    ) -> Result<Vec<AuditLogEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .audit
            .iter()
            .filter(|e| e.agency_id == agency_id)
            .filter(|e| entity_id.map_or(true, |id| e.entity_id == id))
            .cloned()
            .collect())
    }
}

impl ImportTaskStore for MemoryStore {
    async fn insert_import_task(&self, task: ImportTask) -> Result<ImportTask> {
        let mut tables = self.tables.write().await;
        tables.import_tasks.push(task.clone());
        Ok(task)
    }

    async fn get_import_task(&self, agency_id: Uuid, id: Uuid) -> Result<Option<ImportTask>> {
        let tables = self.tables.read().await;
        Ok(tables
            .import_tasks
            .iter()
            .find(|t| t.id == id && t.agency_id == agency_id)
            .cloned())
    }

    async fn transition_import_task(
        &self,
        task: &ImportTask,
        expected: ImportStatus,
    ) -> Result<Option<ImportTask>> {
        let mut tables = self.tables.write().await;
        match tables
            .import_tasks
            .iter_mut()
            .find(|t| t.id == task.id && t.agency_id == task.agency_id && t.status == expected)
        {
            Some(stored) => {
                *stored = task.clone();
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn list_import_tasks(
        &self,
        agency_id: Uuid,
        status: Option<ImportStatus>,
        page: Pagination,
    ) -> Result<Vec<ImportTask>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&ImportTask> = tables
            .import_tasks
            .iter()
            .rev()
            .filter(|t| t.agency_id == agency_id)
            .filter(|t| status.map_or(true, |s| t.status == s))
            .collect();
        rows.sort_by_key(|t| Reverse(t.created_at));
        Ok(page.apply(rows.into_iter().cloned()))
    }
}
