//! [`MemoryStore`] wrapper that fails selected calls, for exercising the
//! best-effort paths of the services.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    AuditStore, CooperationFilter, CooperationStore, FactorStore, ImportTaskStore, MemoryStore,
    NotificationFilter, NotificationStore, Pagination, PublicSkuFilter, SkuFilter, SkuStore,
};
use crate::error::{AppError, Result};
use crate::models::{
    AuditLogEntry, CooperationRelation, CooperationStatus, ImportStatus, ImportTask, Notification,
    PricingFactor, Sku,
};

#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    /// `list_derived_skus` errors
    pub fail_derived_lookup: bool,
    /// `transition_import_task` errors when called with this expected status
    pub fail_import_transition_from: Option<ImportStatus>,
    /// `transition_import_task` reports a lost race (no write) for this expected status
    pub miss_import_transition_from: Option<ImportStatus>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn injected(what: &str) -> AppError {
    AppError::Internal(format!("injected failure: {}", what))
}

impl SkuStore for FaultyStore {
    async fn insert_sku(&self, sku: Sku) -> Result<Sku> {
        self.inner.insert_sku(sku).await
    }

    async fn get_sku(&self, agency_id: Uuid, id: Uuid) -> Result<Option<Sku>> {
        self.inner.get_sku(agency_id, id).await
    }

    async fn get_public_sku(&self, id: Uuid) -> Result<Option<Sku>> {
        self.inner.get_public_sku(id).await
    }

    async fn update_sku(&self, sku: &Sku) -> Result<Option<Sku>> {
        self.inner.update_sku(sku).await
    }

    async fn update_sku_visibility(&self, sku: &Sku) -> Result<Option<Sku>> {
        self.inner.update_sku_visibility(sku).await
    }

    async fn delete_sku(&self, agency_id: Uuid, id: Uuid) -> Result<bool> {
        self.inner.delete_sku(agency_id, id).await
    }

    async fn list_skus(
        &self,
        agency_id: Uuid,
        filter: &SkuFilter,
        page: Pagination,
    ) -> Result<Vec<Sku>> {
        self.inner.list_skus(agency_id, filter, page).await
    }

    async fn list_public_skus(
        &self,
        filter: &PublicSkuFilter,
        page: Pagination,
    ) -> Result<Vec<Sku>> {
        self.inner.list_public_skus(filter, page).await
    }

    async fn list_derived_skus(&self, source_sku_id: Uuid) -> Result<Vec<Sku>> {
        if self.fail_derived_lookup {
            return Err(injected("list_derived_skus"));
        }
        self.inner.list_derived_skus(source_sku_id).await
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
        self.inner.claim_published_sku(id, now, build_copy).await
    }
}

impl FactorStore for FaultyStore {
    async fn insert_factor(&self, factor: PricingFactor) -> Result<PricingFactor> {
        self.inner.insert_factor(factor).await
    }

    async fn get_factor(&self, agency_id: Uuid, id: Uuid) -> Result<Option<PricingFactor>> {
        self.inner.get_factor(agency_id, id).await
    }

    async fn update_factor(&self, factor: &PricingFactor) -> Result<Option<PricingFactor>> {
        self.inner.update_factor(factor).await
    }

    async fn delete_factor(&self, agency_id: Uuid, id: Uuid) -> Result<bool> {
        self.inner.delete_factor(agency_id, id).await
    }

    async fn list_factors(&self, agency_id: Uuid) -> Result<Vec<PricingFactor>> {
        self.inner.list_factors(agency_id).await
    }
}

impl CooperationStore for FaultyStore {
    async fn insert_cooperation(&self, relation: CooperationRelation) -> Result<CooperationRelation> {
        self.inner.insert_cooperation(relation).await
    }

    async fn get_cooperation(&self, id: Uuid) -> Result<Option<CooperationRelation>> {
        self.inner.get_cooperation(id).await
    }

    async fn transition_cooperation(
        &self,
        relation: &CooperationRelation,
        expected: CooperationStatus,
    ) -> Result<Option<CooperationRelation>> {
        self.inner.transition_cooperation(relation, expected).await
    }

    async fn latest_cooperation(
        &self,
        from_agency_id: Uuid,
        to_agency_id: Uuid,
    ) -> Result<Option<CooperationRelation>> {
        self.inner.latest_cooperation(from_agency_id, to_agency_id).await
    }

    async fn list_cooperations(
        &self,
        agency_id: Uuid,
        filter: &CooperationFilter,
        page: Pagination,
    ) -> Result<Vec<CooperationRelation>> {
        self.inner.list_cooperations(agency_id, filter, page).await
    }

    async fn expire_pending_cooperations(&self, now: DateTime<Utc>) -> Result<u64> {
        self.inner.expire_pending_cooperations(now).await
    }
}

impl NotificationStore for FaultyStore {
    async fn insert_notification(&self, notification: Notification) -> Result<Notification> {
        self.inner.insert_notification(notification).await
    }

    async fn list_notifications(
        &self,
        agency_id: Uuid,
        filter: &NotificationFilter,
        page: Pagination,
    ) -> Result<Vec<Notification>> {
        self.inner.list_notifications(agency_id, filter, page).await
    }

    async fn mark_notifications_read(
        &self,
        agency_id: Uuid,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64> {
        self.inner.mark_notifications_read(agency_id, ids, now).await
    }

    async fn count_unread_notifications(
        &self,
        agency_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<u64> {
        self.inner.count_unread_notifications(agency_id, user_id).await
    }
}

impl AuditStore for FaultyStore {
    async fn insert_audit(&self, entry: AuditLogEntry) -> Result<()> {
        self.inner.insert_audit(entry).await
    }

    async fn list_audit(
        &self,
        agency_id: Uuid,
        entity_id: Option<Uuid>,
    ) -> Result<Vec<AuditLogEntry>> {
        self.inner.list_audit(agency_id, entity_id).await
    }
}

impl ImportTaskStore for FaultyStore {
    async fn insert_import_task(&self, task: ImportTask) -> Result<ImportTask> {
        self.inner.insert_import_task(task).await
    }

    async fn get_import_task(&self, agency_id: Uuid, id: Uuid) -> Result<Option<ImportTask>> {
        self.inner.get_import_task(agency_id, id).await
    }

    async fn transition_import_task(
        &self,
        task: &ImportTask,
        expected: ImportStatus,
    ) -> Result<Option<ImportTask>> {
        if self.fail_import_transition_from == Some(expected) {
            return Err(injected("transition_import_task"));
        }
        if self.miss_import_transition_from == Some(expected) {
            return Ok(None);
        }
        self.inner.transition_import_task(task, expected).await
    }

    async fn list_import_tasks(
        &self,
        agency_id: Uuid,
        status: Option<ImportStatus>,
        page: Pagination,
    ) -> Result<Vec<ImportTask>> {
        self.inner.list_import_tasks(agency_id, status, page).await
    }
}
