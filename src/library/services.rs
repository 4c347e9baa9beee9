//! Dual-library transfer engine.
//!
//! Moves SKUs between an agency's private catalog and the shared public
//! library. Two acquisition paths exist side by side:
//!
//! * [`copy_to_private`] is the exclusive transfer. It is gated by an
//!   approved cooperation with the owner and takes the entry out of the
//!   library, so at most one agency ever succeeds per publication.
//! * [`pull_public_sku`] is the shared pull. It is gated by the visibility
//!   scope, may re-price through the caller's factor and leaves the origin
//!   listed.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit;
use crate::cooperation;
use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::models::{CooperationStatus, NewNotification, OwnerType, Sku, VisibilityScope};
use crate::notifications;
use crate::pricing::{self, reprice_attrs};
use crate::store::{Pagination, PublicSkuFilter, Store};

pub const TITLE_SOURCE_UPDATED: &str = "Shared SKU updated";

/// Put one of the caller's SKUs into the public library.
///
/// Re-publishing an already published entry rewrites the same state.
/// `partner_whitelist` replaces the stored list only when given.
pub async fn publish<S: Store>(
    store: &S,
    caller: &Identity,
    sku_id: Uuid,
    scope: VisibilityScope,
    partner_whitelist: Option<Vec<Uuid>>,
) -> Result<Option<Sku>> {
    let Some(before) = store.get_sku(caller.agency_id, sku_id).await? else {
        return Ok(None);
    };

    let mut sku = before.clone();
    sku.mark_published(scope, partner_whitelist, Utc::now());
    let Some(saved) = store.update_sku_visibility(&sku).await? else {
        return Ok(None);
    };
    info!(%sku_id, agency_id = %caller.agency_id, scope = %scope, "SKU published");

    audit::record(
        store,
        caller,
        "sku.publish_to_public",
        "sku",
        sku_id,
        Some(json!({"is_public": before.is_public, "public_status": before.public_status})),
        Some(json!({
            "is_public": saved.is_public,
            "public_status": saved.public_status,
            "visibility_scope": saved.visibility_scope,
        })),
    )
    .await;

    Ok(Some(saved))
}

/// Withdraw one of the caller's entries from the public library
pub async fn unpublish<S: Store>(
    store: &S,
    caller: &Identity,
    sku_id: Uuid,
) -> Result<Option<Sku>> {
    let Some(before) = store.get_sku(caller.agency_id, sku_id).await? else {
        return Ok(None);
    };
    if !before.is_publicly_listed() {
        return Ok(None);
    }

    let mut sku = before.clone();
    sku.owner_type = OwnerType::Private;
    sku.mark_removed(Utc::now());
    let Some(saved) = store.update_sku_visibility(&sku).await? else {
        return Ok(None);
    };
    info!(%sku_id, "SKU withdrawn from public library");

    audit::record(
        store,
        caller,
        "sku.unpublish",
        "sku",
        sku_id,
        Some(json!({"public_status": before.public_status})),
        Some(json!({"public_status": saved.public_status})),
    )
    .await;

    Ok(Some(saved))
}

/// Public library listing, newest-updated first.
///
/// The visibility scope is not applied here; whitelisted entries are
/// listed to everyone and gated at pull time.
pub async fn browse_public<S: Store>(
    store: &S,
    filter: PublicSkuFilter,
    page: Pagination,
) -> Result<Vec<Sku>> {
    store.list_public_skus(&filter, page).await
}

/// One library entry, if it is currently listed
pub async fn get_public_sku<S: Store>(store: &S, sku_id: Uuid) -> Result<Option<Sku>> {
    Ok(store
        .get_public_sku(sku_id)
        .await?
        .filter(Sku::is_publicly_listed))
}

/// Exclusive transfer of a published entry into the caller's catalog.
///
/// # Arguments
/// * `caller` - Requesting agency and user
/// * `public_sku_id` - Library entry to take
///
/// # Returns
/// * `Ok(Some(copy))` - The new private entry; the origin is now `removed`
/// * `Ok(None)` - No such published entry, or another agency claimed it first
/// * `Err(PermissionDenied)` - Foreign entry without an approved cooperation
pub async fn copy_to_private<S: Store>(
    store: &S,
    caller: &Identity,
    public_sku_id: Uuid,
) -> Result<Option<Sku>> {
    let Some(origin) = store.get_public_sku(public_sku_id).await? else {
        return Ok(None);
    };
    if !origin.is_claimable() {
        return Ok(None);
    }

    if origin.agency_id != caller.agency_id {
        let status =
            cooperation::check_status(store, caller.agency_id, origin.agency_id).await?;
        if status != Some(CooperationStatus::Approved) {
            return Err(AppError::permission_denied(format!(
                "no approved cooperation with agency {}",
                origin.agency_id
            )));
        }
    }

    let now = Utc::now();
    let (agency_id, user_id) = (caller.agency_id, caller.user_id);
    let claimed = store
        .claim_published_sku(public_sku_id, now, move |origin| {
            let mut copy = origin.private_copy_for(agency_id, user_id, now);
            // Partner cost is the provider's sale price
            copy.base_cost_price = origin.base_sale_price;
            copy
        })
        .await?;

    let Some(copy) = claimed else {
        debug!(%public_sku_id, %agency_id, "Copy lost: entry no longer published");
        return Ok(None);
    };
    info!(
        %public_sku_id,
        copy_id = %copy.id,
        %agency_id,
        "Public SKU transferred to private catalog"
    );

    audit::record(
        store,
        caller,
        "sku.copy_from_public",
        "sku",
        copy.id,
        None,
        Some(json!({
            "source_sku_id": public_sku_id,
            "source_org_id": origin.agency_id,
        })),
    )
    .await;

    Ok(Some(copy))
}

/// Shared pull of a listed entry into the caller's catalog.
///
/// With `apply_factor`, the caller's matching factor re-prices the
/// type-specific price attributes of the copy and is recorded on it.
/// The origin stays listed.
pub async fn pull_public_sku<S: Store>(
    store: &S,
    caller: &Identity,
    public_sku_id: Uuid,
    apply_factor: bool,
) -> Result<Option<Sku>> {
    let Some(origin) = get_public_sku(store, public_sku_id).await? else {
        return Ok(None);
    };
    if !origin.admits_partner(caller.agency_id) {
        return Err(AppError::permission_denied(format!(
            "agency {} is not on the partner whitelist",
            caller.agency_id
        )));
    }

    let now = Utc::now();
    let mut copy = origin.private_copy_for(caller.agency_id, caller.user_id, now);

    let factor = if apply_factor {
        pricing::find_matching_factor(store, caller.agency_id, &origin, now.date_naive()).await?
    } else {
        None
    };
    if let Some(factor) = &factor {
        let rewritten = reprice_attrs(&mut copy.attrs, factor.multiply_factor, factor.add_amount);
        copy.applied_factor_id = Some(factor.id);
        debug!(factor_id = %factor.id, ?rewritten, "Pulled copy re-priced");
    }

    let copy = store.insert_sku(copy).await?;
    info!(%public_sku_id, copy_id = %copy.id, agency_id = %caller.agency_id, "Public SKU pulled");

    audit::record(
        store,
        caller,
        "sku.pull_from_public",
        "sku",
        copy.id,
        None,
        Some(json!({
            "source_sku_id": public_sku_id,
            "applied_factor": apply_factor,
            "factor_id": factor.as_ref().map(|f| f.id),
        })),
    )
    .await;

    Ok(Some(copy))
}

/// Tell every agency holding a copy of `origin_sku_id` that it changed.
///
/// One notification per derived entry, each delivered on its own; a failed
/// delivery does not stop the rest. Returns how many were delivered.
pub async fn notify_downstream_change<S: Store>(
    store: &S,
    origin_sku_id: Uuid,
    change_details: &str,
) -> Result<usize> {
    let derived = store.list_derived_skus(origin_sku_id).await?;
    let mut delivered = 0;
    for copy in &derived {
        let notification = NewNotification::sku_update(
            copy.agency_id,
            TITLE_SOURCE_UPDATED,
            format!(
                "The SKU {} you reference has changed: {}",
                origin_sku_id, change_details
            ),
            copy.id,
        );
        if notifications::notify(store, notification).await.is_some() {
            delivered += 1;
        }
    }
    if !derived.is_empty() {
        info!(%origin_sku_id, recipients = derived.len(), delivered, "Downstream change fan-out");
    }
    Ok(delivered)
}
