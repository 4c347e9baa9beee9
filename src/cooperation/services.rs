//! Cooperation relationship manager.
//!
//! `from_agency_id` asks, `to_agency_id` decides. Every "not found / wrong
//! state / not yours" outcome is `Ok(None)`; the only hard failure is a
//! duplicate live request for the same ordered pair.

use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::audit;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::models::{CooperationRelation, CooperationStatus, NewNotification};
use crate::notifications;
use crate::store::{CooperationFilter, Pagination, Store};

pub const TITLE_REQUESTED: &str = "New cooperation request";
pub const TITLE_APPROVED: &str = "Cooperation request approved";
pub const TITLE_REJECTED: &str = "Cooperation request rejected";
pub const TITLE_TERMINATED: &str = "Cooperation terminated";

/// Open a pending request from the caller's agency to `to_agency_id`.
///
/// # Arguments
/// * `to_agency_id` - Agency owning the resources; it reviews the request
/// * `message` - Free text shown to the reviewer
///
/// # Returns
/// The stored relation, or `AppError::Validation` if a pending/approved
/// relation for the same pair already exists.
pub async fn create_request<S: Store>(
    store: &S,
    config: &AppConfig,
    caller: &Identity,
    to_agency_id: Uuid,
    message: Option<String>,
) -> Result<CooperationRelation> {
    if to_agency_id == caller.agency_id {
        return Err(AppError::validation(
            "an agency cannot request cooperation with itself",
        ));
    }

    let now = Utc::now();
    let relation = CooperationRelation {
        id: Uuid::new_v4(),
        from_agency_id: caller.agency_id,
        to_agency_id,
        status: CooperationStatus::Pending,
        request_message: message,
        response_message: None,
        created_at: now,
        updated_at: now,
        expired_at: Some(now + Duration::days(config.cooperation_request_ttl_days)),
        approved_at: None,
        reviewed_at: None,
        terminated_at: None,
        created_by: Some(caller.user_id),
        reviewed_by: None,
    };

    let relation = store.insert_cooperation(relation).await?;
    info!(
        relation_id = %relation.id,
        from = %relation.from_agency_id,
        to = %relation.to_agency_id,
        "Cooperation requested"
    );

    notifications::notify(
        store,
        NewNotification::cooperation(
            to_agency_id,
            TITLE_REQUESTED,
            format!(
                "Agency {} requested to cooperate with you",
                relation.from_agency_id
            ),
            relation.id,
        ),
    )
    .await;

    audit::record(
        store,
        caller,
        "cooperation.create",
        "cooperation",
        relation.id,
        None,
        audit::snapshot(&relation),
    )
    .await;

    Ok(relation)
}

pub async fn approve<S: Store>(
    store: &S,
    caller: &Identity,
    relation_id: Uuid,
    message: Option<String>,
) -> Result<Option<CooperationRelation>> {
    review(store, caller, relation_id, message, CooperationStatus::Approved).await
}

pub async fn reject<S: Store>(
    store: &S,
    caller: &Identity,
    relation_id: Uuid,
    message: Option<String>,
) -> Result<Option<CooperationRelation>> {
    review(store, caller, relation_id, message, CooperationStatus::Rejected).await
}

async fn review<S: Store>(
    store: &S,
    caller: &Identity,
    relation_id: Uuid,
    message: Option<String>,
    decision: CooperationStatus,
) -> Result<Option<CooperationRelation>> {
    let now = Utc::now();
    let Some(current) = store.get_cooperation(relation_id).await? else {
        return Ok(None);
    };
    if current.to_agency_id != caller.agency_id
        || current.status != CooperationStatus::Pending
        || is_overdue(&current, now)
    {
        return Ok(None);
    }

    let mut next = current.clone();
    next.status = decision;
    next.response_message = message;
    next.reviewed_at = Some(now);
    next.reviewed_by = Some(caller.user_id);
    next.updated_at = now;
    if decision == CooperationStatus::Approved {
        next.approved_at = Some(now);
    }

    // Lost a race with another reviewer or the expiry sweep
    let Some(saved) = store
        .transition_cooperation(&next, CooperationStatus::Pending)
        .await?
    else {
        return Ok(None);
    };
    info!(relation_id = %saved.id, status = %saved.status, "Cooperation reviewed");

    let (title, action) = match decision {
        CooperationStatus::Approved => (TITLE_APPROVED, "cooperation.approve"),
        _ => (TITLE_REJECTED, "cooperation.reject"),
    };
    notifications::notify(
        store,
        NewNotification::cooperation(
            saved.from_agency_id,
            title,
            format!(
                "Agency {} answered your request: {}",
                saved.to_agency_id, saved.status
            ),
            saved.id,
        ),
    )
    .await;

    audit::record(
        store,
        caller,
        action,
        "cooperation",
        saved.id,
        audit::snapshot(&current),
        audit::snapshot(&saved),
    )
    .await;

    Ok(Some(saved))
}

/// End an approved relation. Either party may terminate.
pub async fn terminate<S: Store>(
    store: &S,
    caller: &Identity,
    relation_id: Uuid,
) -> Result<Option<CooperationRelation>> {
    let Some(current) = store.get_cooperation(relation_id).await? else {
        return Ok(None);
    };
    if !current.involves(caller.agency_id) || current.status != CooperationStatus::Approved {
        return Ok(None);
    }

    let now = Utc::now();
    let mut next = current.clone();
    next.status = CooperationStatus::Terminated;
    next.terminated_at = Some(now);
    next.updated_at = now;

    let Some(saved) = store
        .transition_cooperation(&next, CooperationStatus::Approved)
        .await?
    else {
        return Ok(None);
    };
    info!(relation_id = %saved.id, by = %caller.agency_id, "Cooperation terminated");

    notifications::notify(
        store,
        NewNotification::cooperation(
            saved.other_party(caller.agency_id),
            TITLE_TERMINATED,
            format!("Agency {} ended the cooperation", caller.agency_id),
            saved.id,
        ),
    )
    .await;

    audit::record(
        store,
        caller,
        "cooperation.terminate",
        "cooperation",
        saved.id,
        audit::snapshot(&current),
        audit::snapshot(&saved),
    )
    .await;

    Ok(Some(saved))
}

/// Status of the most recently created relation `from -> to`, if any
pub async fn check_status<S: Store>(
    store: &S,
    from_agency_id: Uuid,
    to_agency_id: Uuid,
) -> Result<Option<CooperationStatus>> {
    Ok(store
        .latest_cooperation(from_agency_id, to_agency_id)
        .await?
        .map(|r| r.status))
}

/// Relations the caller's agency takes part in, newest first
pub async fn list_cooperations<S: Store>(
    store: &S,
    caller: &Identity,
    filter: CooperationFilter,
    page: Pagination,
) -> Result<Vec<CooperationRelation>> {
    store
        .list_cooperations(caller.agency_id, &filter, page)
        .await
}

/// Single relation, visible to either party only
pub async fn get_cooperation<S: Store>(
    store: &S,
    caller: &Identity,
    relation_id: Uuid,
) -> Result<Option<CooperationRelation>> {
    Ok(store
        .get_cooperation(relation_id)
        .await?
        .filter(|r| r.involves(caller.agency_id)))
}

/// Move overdue pending requests to `expired`
pub async fn expire_stale_requests<S: Store>(store: &S, now: DateTime<Utc>) -> Result<u64> {
    let expired = store.expire_pending_cooperations(now).await?;
    if expired > 0 {
        info!(expired, "Expired stale cooperation requests");
    }
    Ok(expired)
}

fn is_overdue(relation: &CooperationRelation, now: DateTime<Utc>) -> bool {
    relation.expired_at.is_some_and(|at| at <= now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn agencies() -> (Identity, Identity) {
        (
            Identity::new(Uuid::new_v4(), Uuid::new_v4()),
            Identity::new(Uuid::new_v4(), Uuid::new_v4()),
        )
    }

    #[tokio::test]
    async fn test_request_sets_expiry_and_notifies_target() {
        let store = MemoryStore::new();
        let config = AppConfig::default();
        let (a, b) = agencies();

        let relation = create_request(&store, &config, &a, b.agency_id, Some("hi".into()))
            .await
            .unwrap();
        assert_eq!(relation.status, CooperationStatus::Pending);
        let ttl = relation.expired_at.unwrap() - relation.created_at;
        assert_eq!(ttl, Duration::days(7));

        assert_eq!(notifications::unread_count(&store, &b).await.unwrap(), 1);
        assert_eq!(notifications::unread_count(&store, &a).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_self_request_rejected() {
        let store = MemoryStore::new();
        let (a, _) = agencies();
        let err = create_request(&store, &AppConfig::default(), &a, a.agency_id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_only_target_may_review() {
        let store = MemoryStore::new();
        let (a, b) = agencies();
        let relation = create_request(&store, &AppConfig::default(), &a, b.agency_id, None)
            .await
            .unwrap();

        assert!(approve(&store, &a, relation.id, None).await.unwrap().is_none());
        let approved = approve(&store, &b, relation.id, Some("welcome".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(approved.status, CooperationStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(b.user_id));
        assert!(approved.approved_at.is_some());

        // No longer pending
        assert!(reject(&store, &b, relation.id, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_terminate_by_either_party_only_when_approved() {
        let store = MemoryStore::new();
        let (a, b) = agencies();
        let outsider = Identity::new(Uuid::new_v4(), Uuid::new_v4());
        let relation = create_request(&store, &AppConfig::default(), &a, b.agency_id, None)
            .await
            .unwrap();

        assert!(terminate(&store, &a, relation.id).await.unwrap().is_none());
        approve(&store, &b, relation.id, None).await.unwrap().unwrap();
        assert!(terminate(&store, &outsider, relation.id).await.unwrap().is_none());

        let ended = terminate(&store, &a, relation.id).await.unwrap().unwrap();
        assert_eq!(ended.status, CooperationStatus::Terminated);
        assert!(ended.terminated_at.is_some());
        assert!(terminate(&store, &b, relation.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_check_status_reports_latest() {
        let store = MemoryStore::new();
        let config = AppConfig::default();
        let (a, b) = agencies();

        assert_eq!(check_status(&store, a.agency_id, b.agency_id).await.unwrap(), None);

        let first = create_request(&store, &config, &a, b.agency_id, None).await.unwrap();
        reject(&store, &b, first.id, None).await.unwrap().unwrap();
        create_request(&store, &config, &a, b.agency_id, None).await.unwrap();

        assert_eq!(
            check_status(&store, a.agency_id, b.agency_id).await.unwrap(),
            Some(CooperationStatus::Pending)
        );
        // Direction matters
        assert_eq!(check_status(&store, b.agency_id, a.agency_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_requests_cannot_be_approved_and_free_the_pair() {
        let store = MemoryStore::new();
        let config = AppConfig::default();
        let (a, b) = agencies();
        let relation = create_request(&store, &config, &a, b.agency_id, None).await.unwrap();

        let later = Utc::now() + Duration::days(8);
        assert_eq!(expire_stale_requests(&store, later).await.unwrap(), 1);
        assert!(approve(&store, &b, relation.id, None).await.unwrap().is_none());
        assert_eq!(
            check_status(&store, a.agency_id, b.agency_id).await.unwrap(),
            Some(CooperationStatus::Expired)
        );

        create_request(&store, &config, &a, b.agency_id, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_listing_by_role() {
        let store = MemoryStore::new();
        let config = AppConfig::default();
        let (a, b) = agencies();
        let c = Identity::new(Uuid::new_v4(), Uuid::new_v4());

        create_request(&store, &config, &a, b.agency_id, None).await.unwrap();
        create_request(&store, &config, &c, a.agency_id, None).await.unwrap();

        let all = list_cooperations(&store, &a, CooperationFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let as_provider = list_cooperations(
            &store,
            &a,
            CooperationFilter {
                role: Some(crate::models::CooperationRole::Provider),
                status: None,
            },
            Pagination::default(),
        )
        .await
        .unwrap();
        assert_eq!(as_provider.len(), 1);
        assert_eq!(as_provider[0].from_agency_id, c.agency_id);

        let for_b = list_cooperations(&store, &b, CooperationFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(for_b.len(), 1);
    }
}
