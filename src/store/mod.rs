//! Persistence contract.
//!
//! Every tenant-owned read takes an `agency_id` and must filter on it. The
//! only unscoped reads are the public-library lookups and the provenance
//! fan-out used by the transfer engine.
//!
//! Two implementations: [`PgStore`] (Postgres via sqlx) and [`MemoryStore`]
//! (process-local, used by tests and by the binary when no database is set).

use chrono::{DateTime, Utc};
use std::future::Future;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AuditLogEntry, Category, CooperationRelation, CooperationRole, CooperationStatus, ImportStatus,
    ImportTask, Notification, NotificationType, OwnerType, PricingFactor, Sku, SkuStatus, SkuType,
};

#[cfg(test)]
pub mod faulty;
pub mod memory;
pub mod postgres;

#[cfg(test)]
pub use faulty::FaultyStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Skip/limit pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { skip: 0, limit: 50 }
    }
}

impl Pagination {
    /// Build from optional query values, clamping `limit` to `1..=max_limit`
    pub fn new(skip: Option<i64>, limit: Option<i64>, max_limit: i64) -> Self {
        let defaults = Self::default();
        Self {
            skip: skip.unwrap_or(defaults.skip).max(0),
            limit: limit.unwrap_or(defaults.limit).clamp(1, max_limit.max(1)),
        }
    }

    pub fn apply<T>(&self, items: impl Iterator<Item = T>) -> Vec<T> {
        items
            .skip(self.skip as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// Private catalog listing filter
#[derive(Debug, Clone, Default)]
pub struct SkuFilter {
    pub sku_type: Option<SkuType>,
    pub city: Option<String>,
    /// Overlap: at least one tag in common
    pub tags: Vec<String>,
    pub status: Option<SkuStatus>,
    pub owner_type: Option<OwnerType>,
    /// Case-insensitive substring of `sku_name`
    pub keyword: Option<String>,
}

impl SkuFilter {
    pub fn matches(&self, sku: &Sku) -> bool {
        self.sku_type.map_or(true, |t| sku.sku_type == t)
            && self
                .city
                .as_deref()
                .map_or(true, |c| sku.destination_city.as_deref() == Some(c))
            && (self.tags.is_empty() || sku.shares_tag_with(&self.tags))
            && self.status.map_or(true, |s| sku.status == s)
            && self.owner_type.map_or(true, |o| sku.owner_type == o)
            && keyword_matches(self.keyword.as_deref(), &sku.sku_name)
    }
}

/// Public library browse filter
#[derive(Debug, Clone, Default)]
pub struct PublicSkuFilter {
    pub city: Option<String>,
    pub category: Option<Category>,
    pub tags: Vec<String>,
    pub keyword: Option<String>,
}

impl PublicSkuFilter {
    pub fn matches(&self, sku: &Sku) -> bool {
        sku.is_publicly_listed()
            && self
                .city
                .as_deref()
                .map_or(true, |c| sku.destination_city.as_deref() == Some(c))
            && self.category.map_or(true, |c| sku.category == c)
            && (self.tags.is_empty() || sku.shares_tag_with(&self.tags))
            && keyword_matches(self.keyword.as_deref(), &sku.sku_name)
    }
}

fn keyword_matches(keyword: Option<&str>, name: &str) -> bool {
    match keyword {
        Some(k) => name.to_lowercase().contains(&k.to_lowercase()),
        None => true,
    }
}

#[derive(Debug, Clone, Default)]
pub struct CooperationFilter {
    pub role: Option<CooperationRole>,
    pub status: Option<CooperationStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    /// Include notifications addressed to this user plus agency-wide ones
    pub user_id: Option<Uuid>,
    pub notification_type: Option<NotificationType>,
    pub is_read: Option<bool>,
}

impl NotificationFilter {
    pub fn matches(&self, n: &Notification) -> bool {
        self.user_id
            .map_or(true, |u| n.user_id.is_none() || n.user_id == Some(u))
            && self
                .notification_type
                .map_or(true, |t| n.notification_type == t)
            && self.is_read.map_or(true, |r| n.is_read == r)
    }
}

pub trait SkuStore: Send + Sync {
    fn insert_sku(&self, sku: Sku) -> impl Future<Output = Result<Sku>> + Send;

    fn get_sku(
        &self,
        agency_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Sku>>> + Send;

    /// Unscoped lookup of an entry flagged public (new or legacy flag),
    /// whatever its `public_status`.
    fn get_public_sku(&self, id: Uuid) -> impl Future<Output = Result<Option<Sku>>> + Send;

    /// Replace the descriptive and pricing columns of the row owned by
    /// `sku.agency_id`. `sku_type`, `created_at`, the publication columns
    /// and the provenance columns are never rewritten here; the stored
    /// values come back in the result.
    fn update_sku(&self, sku: &Sku) -> impl Future<Output = Result<Option<Sku>>> + Send;

    /// Write only the publication columns (`owner_type`, `is_public`,
    /// `public_status`, `visibility_scope`, `partner_whitelist`) and
    /// `updated_at` of the row owned by `sku.agency_id`.
    fn update_sku_visibility(
        &self,
        sku: &Sku,
    ) -> impl Future<Output = Result<Option<Sku>>> + Send;

    fn delete_sku(&self, agency_id: Uuid, id: Uuid) -> impl Future<Output = Result<bool>> + Send;

    /// Newest-updated first
    fn list_skus(
        &self,
        agency_id: Uuid,
        filter: &SkuFilter,
        page: Pagination,
    ) -> impl Future<Output = Result<Vec<Sku>>> + Send;

    /// Newest-updated first; never returns `public_status = removed`
    fn list_public_skus(
        &self,
        filter: &PublicSkuFilter,
        page: Pagination,
    ) -> impl Future<Output = Result<Vec<Sku>>> + Send;

    /// Every entry whose `source_sku_id` is `source_sku_id`, across agencies
    fn list_derived_skus(
        &self,
        source_sku_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Sku>>> + Send;

    /// Compare-and-swap `published -> removed` on entry `id` and insert the
    /// copy produced by `build_copy` from the claimed row, in one transaction.
    ///
    /// Returns `None` if the entry is not (or no longer) published; at most
    /// one concurrent caller observes `Some`.
    fn claim_published_sku<F>(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        build_copy: F,
    ) -> impl Future<Output = Result<Option<Sku>>> + Send
    where
        F: FnOnce(&Sku) -> Sku + Send;
}

pub trait FactorStore: Send + Sync {
    fn insert_factor(
        &self,
        factor: PricingFactor,
    ) -> impl Future<Output = Result<PricingFactor>> + Send;

    fn get_factor(
        &self,
        agency_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<PricingFactor>>> + Send;

    fn update_factor(
        &self,
        factor: &PricingFactor,
    ) -> impl Future<Output = Result<Option<PricingFactor>>> + Send;

    fn delete_factor(&self, agency_id: Uuid, id: Uuid)
        -> impl Future<Output = Result<bool>> + Send;

    /// Priority descending; equal priorities keep creation order
    fn list_factors(
        &self,
        agency_id: Uuid,
    ) -> impl Future<Output = Result<Vec<PricingFactor>>> + Send;
}

pub trait CooperationStore: Send + Sync {
    /// Pending relations of the same ordered pair whose `expired_at` is at
    /// or before `relation.created_at` are moved to expired first, in the
    /// same atomic step. Then fails with `AppError::Validation` when a
    /// pending or approved relation still exists for the pair.
    fn insert_cooperation(
        &self,
        relation: CooperationRelation,
    ) -> impl Future<Output = Result<CooperationRelation>> + Send;

    fn get_cooperation(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<CooperationRelation>>> + Send;

    /// Write `relation` only if the stored status still equals `expected`
    fn transition_cooperation(
        &self,
        relation: &CooperationRelation,
        expected: CooperationStatus,
    ) -> impl Future<Output = Result<Option<CooperationRelation>>> + Send;

    /// Most recently created relation for the ordered pair
    fn latest_cooperation(
        &self,
        from_agency_id: Uuid,
        to_agency_id: Uuid,
    ) -> impl Future<Output = Result<Option<CooperationRelation>>> + Send;

    /// Newest first
    fn list_cooperations(
        &self,
        agency_id: Uuid,
        filter: &CooperationFilter,
        page: Pagination,
    ) -> impl Future<Output = Result<Vec<CooperationRelation>>> + Send;

    /// Move pending relations with `expired_at <= now` to expired
    fn expire_pending_cooperations(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64>> + Send;
}

pub trait NotificationStore: Send + Sync {
    fn insert_notification(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<Notification>> + Send;

    /// Newest first
    fn list_notifications(
        &self,
        agency_id: Uuid,
        filter: &NotificationFilter,
        page: Pagination,
    ) -> impl Future<Output = Result<Vec<Notification>>> + Send;

    /// Returns how many unread notifications were flipped
    fn mark_notifications_read(
        &self,
        agency_id: Uuid,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64>> + Send;

    fn count_unread_notifications(
        &self,
        agency_id: Uuid,
        user_id: Option<Uuid>,
    ) -> impl Future<Output = Result<u64>> + Send;
}

pub trait AuditStore: Send + Sync {
    fn insert_audit(&self, entry: AuditLogEntry) -> impl Future<Output = Result<()>> + Send;

    /// Oldest first
    fn list_audit(
        &self,
        agency_id: Uuid,
        entity_id: Option<Uuid>,
    ) -> impl Future<Output = Result<Vec<AuditLogEntry>>> + Send;
}

pub trait ImportTaskStore: Send + Sync {
    fn insert_import_task(
        &self,
        task: ImportTask,
    ) -> impl Future<Output = Result<ImportTask>> + Send;

    fn get_import_task(
        &self,
        agency_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<ImportTask>>> + Send;

    /// Write `task` only if the stored status still equals `expected`
    fn transition_import_task(
        &self,
        task: &ImportTask,
        expected: ImportStatus,
    ) -> impl Future<Output = Result<Option<ImportTask>>> + Send;

    /// Newest first
    fn list_import_tasks(
        &self,
        agency_id: Uuid,
        status: Option<ImportStatus>,
        page: Pagination,
    ) -> impl Future<Output = Result<Vec<ImportTask>>> + Send;
}

/// Everything the services need from persistence
pub trait Store:
    SkuStore + FactorStore + CooperationStore + NotificationStore + AuditStore + ImportTaskStore + 'static
{
}

impl<T> Store for T where
    T: SkuStore
        + FactorStore
        + CooperationStore
        + NotificationStore
        + AuditStore
        + ImportTaskStore
        + 'static
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps() {
        let page = Pagination::new(Some(-5), Some(10_000), 200);
        assert_eq!(page, Pagination { skip: 0, limit: 200 });

        let page = Pagination::new(None, Some(0), 200);
        assert_eq!(page.limit, 1);

        assert_eq!(Pagination::new(None, None, 200), Pagination::default());
    }

    #[test]
    fn test_pagination_apply() {
        let page = Pagination { skip: 2, limit: 2 };
        assert_eq!(page.apply(1..=10), vec![3, 4]);
    }
}
