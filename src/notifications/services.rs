//! Notification service functions.

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::identity::Identity;
use crate::models::{NewNotification, Notification};
use crate::store::{NotificationFilter, NotificationStore, Pagination};

/// Deliver one notification. Failures are logged and swallowed.
pub async fn notify<S: NotificationStore>(
    store: &S,
    notification: NewNotification,
) -> Option<Notification> {
    let agency_id = notification.agency_id;
    match store
        .insert_notification(notification.into_notification(Utc::now()))
        .await
    {
        Ok(stored) => {
            debug!(%agency_id, notification_id = %stored.id, "Notification delivered");
            Some(stored)
        }
        Err(e) => {
            warn!(%agency_id, error = %e, "Failed to deliver notification");
            None
        }
    }
}

/// Inbox of the caller: notifications addressed to them plus agency-wide ones
pub async fn list_notifications<S: NotificationStore>(
    store: &S,
    caller: &Identity,
    mut filter: NotificationFilter,
    page: Pagination,
) -> Result<Vec<Notification>> {
    filter.user_id = Some(caller.user_id);
    store
        .list_notifications(caller.agency_id, &filter, page)
        .await
}

/// Mark notifications of the caller's agency as read; returns how many flipped
pub async fn mark_as_read<S: NotificationStore>(
    store: &S,
    caller: &Identity,
    ids: &[Uuid],
) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    store
        .mark_notifications_read(caller.agency_id, ids, Utc::now())
        .await
}

pub async fn unread_count<S: NotificationStore>(store: &S, caller: &Identity) -> Result<u64> {
    store
        .count_unread_notifications(caller.agency_id, Some(caller.user_id))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationType;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_inbox_includes_agency_wide_and_own_only() {
        let store = MemoryStore::new();
        let me = Identity::new(Uuid::new_v4(), Uuid::new_v4());
        let colleague = Uuid::new_v4();

        let wide = NewNotification::cooperation(me.agency_id, "wide", "x".into(), Uuid::new_v4());
        let mut mine = NewNotification::sku_update(me.agency_id, "mine", "y".into(), Uuid::new_v4());
        mine.user_id = Some(me.user_id);
        let mut theirs = mine.clone();
        theirs.user_id = Some(colleague);
        theirs.title = "theirs".into();
        for n in [wide, mine, theirs] {
            notify(&store, n).await.unwrap();
        }

        let inbox = list_notifications(&store, &me, NotificationFilter::default(), Pagination::default())
            .await
            .unwrap();
        let mut titles: Vec<&str> = inbox.iter().map(|n| n.title.as_str()).collect();
        titles.sort();
        assert_eq!(titles, vec!["mine", "wide"]);
        assert_eq!(unread_count(&store, &me).await.unwrap(), 2);

        let filtered = list_notifications(
            &store,
            &me,
            NotificationFilter {
                notification_type: Some(NotificationType::SkuUpdate),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_as_read_is_scoped_and_counted() {
        let store = MemoryStore::new();
        let me = Identity::new(Uuid::new_v4(), Uuid::new_v4());
        let other = Identity::new(Uuid::new_v4(), Uuid::new_v4());

        let mine = notify(
            &store,
            NewNotification::cooperation(me.agency_id, "a", "b".into(), Uuid::new_v4()),
        )
        .await
        .unwrap();
        let foreign = notify(
            &store,
            NewNotification::cooperation(other.agency_id, "c", "d".into(), Uuid::new_v4()),
        )
        .await
        .unwrap();

        assert_eq!(mark_as_read(&store, &me, &[mine.id, foreign.id]).await.unwrap(), 1);
        assert_eq!(mark_as_read(&store, &me, &[mine.id]).await.unwrap(), 0);
        assert_eq!(unread_count(&store, &me).await.unwrap(), 0);
        assert_eq!(unread_count(&store, &other).await.unwrap(), 1);
    }
}
