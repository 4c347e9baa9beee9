//! Private catalog service functions.
//!
//! Every read and write is scoped to the caller's agency. Batch operations
//! apply item by item and report one outcome per requested id.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit;
use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::library;
use crate::models::{CalendarDetail, CalendarEntry, PriceMode, Sku, SkuAttrs};
use crate::pricing::calculators::{apply_factor, margin_multiplier, round_money, sell_from_cost};
use crate::store::{Pagination, SkuFilter, Store};

use super::requests::{
    BatchPricingRequest, BatchSkuUpdateRequest, CreateSkuRequest, PriceCalendarItem,
    UpdateSkuRequest,
};

pub const SKIP_NOT_FOUND: &str = "not found";
pub const SKIP_NO_COST: &str = "no cost price";

/// What happened to one id of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BatchResult {
    Updated,
    Deleted,
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItemOutcome {
    pub sku_id: Uuid,
    #[serde(flatten)]
    pub result: BatchResult,
}

impl BatchItemOutcome {
    fn skipped(sku_id: Uuid, reason: &str) -> Self {
        Self {
            sku_id,
            result: BatchResult::Skipped {
                reason: reason.to_string(),
            },
        }
    }

    pub fn is_applied(&self) -> bool {
        !matches!(self.result, BatchResult::Skipped { .. })
    }
}

fn check_window(sku: &Sku) -> Result<()> {
    if let (Some(from), Some(to)) = (sku.valid_from, sku.valid_to) {
        if from > to {
            return Err(AppError::validation("valid_from must not be after valid_to"));
        }
    }
    Ok(())
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("sku_name is required"));
    }
    Ok(())
}

/// Create a private SKU for the caller's agency.
///
/// The attribute payload is validated against the schema of `sku_type`
/// and the category is derived from the type.
pub async fn create_sku<S: Store>(
    store: &S,
    caller: &Identity,
    request: CreateSkuRequest,
) -> Result<Sku> {
    check_name(&request.sku_name)?;
    let attrs = SkuAttrs::parse(request.sku_type, request.attrs)?;

    let mut sku = Sku::new_private(
        caller.agency_id,
        request.sku_name,
        attrs,
        Some(caller.user_id),
        Utc::now(),
    );
    sku.product_id = request.product_id;
    sku.supplier_id = request.supplier_id;
    sku.supplier_name = request.supplier_name;
    sku.destination_country = request.destination_country;
    sku.destination_city = request.destination_city;
    sku.tags = request.tags;
    sku.valid_from = request.valid_from;
    sku.valid_to = request.valid_to;
    sku.booking_advance = request.booking_advance;
    sku.description = request.description;
    sku.highlights = request.highlights;
    sku.inclusions = request.inclusions;
    sku.exclusions = request.exclusions;
    sku.cancellation_policy = request.cancellation_policy;
    sku.base_cost_price = request.base_cost_price;
    sku.base_sale_price = request.base_sale_price;
    sku.media = request.media;
    if let Some(mode) = request.price_mode {
        sku.price_mode = mode;
    }
    if let Some(calendar) = request.calendar_prices {
        sku.calendar_prices = calendar;
    }
    if let Some(rules) = request.price_rules {
        sku.price_rules = rules;
    }
    check_window(&sku)?;

    let sku = store.insert_sku(sku).await?;
    info!(sku_id = %sku.id, sku_type = %sku.sku_type, agency_id = %sku.agency_id, "SKU created");

    audit::record(
        store,
        caller,
        "sku.create",
        "sku",
        sku.id,
        None,
        Some(json!({"sku_name": sku.sku_name, "sku_type": sku.sku_type})),
    )
    .await;

    Ok(sku)
}

pub async fn get_sku<S: Store>(store: &S, caller: &Identity, sku_id: Uuid) -> Result<Option<Sku>> {
    store.get_sku(caller.agency_id, sku_id).await
}

/// Newest-updated first
pub async fn list_skus<S: Store>(
    store: &S,
    caller: &Identity,
    filter: SkuFilter,
    page: Pagination,
) -> Result<Vec<Sku>> {
    store.list_skus(caller.agency_id, &filter, page).await
}

/// Apply the fields present in `patch` to one of the caller's SKUs.
///
/// Changing `sku_type` is rejected. A new attribute payload is validated
/// against the existing type. Agencies holding copies of this SKU are
/// notified afterwards.
pub async fn update_sku<S: Store>(
    store: &S,
    caller: &Identity,
    sku_id: Uuid,
    patch: UpdateSkuRequest,
) -> Result<Option<Sku>> {
    let Some(before) = store.get_sku(caller.agency_id, sku_id).await? else {
        return Ok(None);
    };

    if let Some(requested) = patch.sku_type {
        if requested != before.sku_type {
            return Err(AppError::validation(format!(
                "sku_type cannot change from {} to {}",
                before.sku_type, requested
            )));
        }
    }

    let mut sku = before.clone();
    let mut changed: Vec<&str> = Vec::new();

    macro_rules! set {
        ($field:ident) => {
            if let Some(value) = patch.$field {
                sku.$field = value;
                changed.push(stringify!($field));
            }
        };
        ($field:ident, some) => {
            if let Some(value) = patch.$field {
                sku.$field = Some(value);
                changed.push(stringify!($field));
            }
        };
    }

    if let Some(name) = &patch.sku_name {
        check_name(name)?;
    }
    set!(sku_name);
    set!(status);
    set!(product_id, some);
    set!(supplier_id, some);
    set!(supplier_name, some);
    set!(destination_country, some);
    set!(destination_city, some);
    set!(tags);
    set!(valid_from, some);
    set!(valid_to, some);
    set!(booking_advance, some);
    set!(description, some);
    set!(highlights);
    set!(inclusions);
    set!(exclusions);
    set!(cancellation_policy, some);
    set!(price_mode);
    set!(base_cost_price, some);
    set!(base_sale_price, some);
    set!(calendar_prices);
    set!(price_rules);
    set!(media);
    if let Some(raw) = patch.attrs {
        sku.attrs = SkuAttrs::parse(before.sku_type, raw)?;
        changed.push("attrs");
    }
    check_window(&sku)?;
    sku.updated_at = Utc::now();

    let Some(saved) = store.update_sku(&sku).await? else {
        return Ok(None);
    };
    debug!(%sku_id, ?changed, "SKU updated");

    audit::record(
        store,
        caller,
        "sku.update",
        "sku",
        sku_id,
        Some(json!({"sku_name": before.sku_name, "attrs": before.attrs})),
        Some(json!({"sku_name": saved.sku_name, "attrs": saved.attrs})),
    )
    .await;

    if !changed.is_empty() {
        let details = format!("updated {}", changed.join(", "));
        if let Err(e) = library::notify_downstream_change(store, sku_id, &details).await {
            warn!(%sku_id, error = %e, "Failed to notify holders of copies");
        }
    }

    Ok(Some(saved))
}

pub async fn delete_sku<S: Store>(store: &S, caller: &Identity, sku_id: Uuid) -> Result<bool> {
    let Some(before) = store.get_sku(caller.agency_id, sku_id).await? else {
        return Ok(false);
    };
    let deleted = store.delete_sku(caller.agency_id, sku_id).await?;
    if deleted {
        info!(%sku_id, "SKU deleted");
        audit::record(
            store,
            caller,
            "sku.delete",
            "sku",
            sku_id,
            Some(json!({"sku_name": before.sku_name})),
            None,
        )
        .await;
    }
    Ok(deleted)
}

/// Write dated prices into the SKU calendar and switch it to calendar mode.
///
/// Existing entries for other dates are kept; a date given again is replaced.
pub async fn set_price_calendar<S: Store>(
    store: &S,
    caller: &Identity,
    sku_id: Uuid,
    items: Vec<PriceCalendarItem>,
) -> Result<Option<Sku>> {
    let Some(mut sku) = store.get_sku(caller.agency_id, sku_id).await? else {
        return Ok(None);
    };

    let count = items.len();
    for item in items {
        sku.calendar_prices.insert(
            item.date.format("%Y-%m-%d").to_string(),
            CalendarEntry::Detailed(CalendarDetail {
                sales_price: Some(item.sales_price),
                cost_price: Some(item.cost_price),
                inventory: item.inventory,
                is_available: Some(item.is_available),
                ..Default::default()
            }),
        );
    }
    sku.price_mode = PriceMode::Calendar;
    sku.updated_at = Utc::now();

    let Some(saved) = store.update_sku(&sku).await? else {
        return Ok(None);
    };
    info!(%sku_id, entries = count, "Price calendar updated");

    audit::record(
        store,
        caller,
        "sku.update_price_calendar",
        "sku",
        sku_id,
        None,
        Some(json!({"entries": count, "price_mode": saved.price_mode})),
    )
    .await;

    Ok(Some(saved))
}

/// Re-derive sell prices from cost for each listed SKU.
///
/// Both the attribute sell price (from the paired cost attribute) and
/// `base_sale_price` (from `base_cost_price`) are rewritten when their
/// source is present. SKUs with neither are skipped.
pub async fn batch_update_pricing<S: Store>(
    store: &S,
    caller: &Identity,
    request: BatchPricingRequest,
) -> Result<Vec<BatchItemOutcome>> {
    let multiply_factor = match (request.multiply_factor, request.margin_percentage) {
        (Some(m), _) => m,
        (None, Some(margin)) => margin_multiplier(margin),
        (None, None) => {
            return Err(AppError::validation(
                "either margin_percentage or multiply_factor is required",
            ))
        }
    };
    if multiply_factor.is_sign_negative() {
        return Err(AppError::validation("multiplier must not be negative"));
    }
    let add_amount = request.add_amount.unwrap_or(Decimal::ZERO);

    let mut outcomes = Vec::with_capacity(request.sku_ids.len());
    for sku_id in request.sku_ids {
        let Some(mut sku) = store.get_sku(caller.agency_id, sku_id).await? else {
            outcomes.push(BatchItemOutcome::skipped(sku_id, SKIP_NOT_FOUND));
            continue;
        };

        let attr_sell = sell_from_cost(&mut sku.attrs, multiply_factor, add_amount);
        let base_sell = sku
            .base_cost_price
            .map(|cost| round_money(apply_factor(cost, multiply_factor, add_amount), 2));
        if attr_sell.is_none() && base_sell.is_none() {
            outcomes.push(BatchItemOutcome::skipped(sku_id, SKIP_NO_COST));
            continue;
        }
        if base_sell.is_some() {
            sku.base_sale_price = base_sell;
        }
        sku.updated_at = Utc::now();

        if store.update_sku(&sku).await?.is_none() {
            outcomes.push(BatchItemOutcome::skipped(sku_id, SKIP_NOT_FOUND));
            continue;
        }
        audit::record(
            store,
            caller,
            "sku.batch_update_pricing",
            "sku",
            sku_id,
            None,
            Some(json!({
                "multiply_factor": multiply_factor,
                "add_amount": add_amount,
                "base_sale_price": sku.base_sale_price,
            })),
        )
        .await;
        outcomes.push(BatchItemOutcome {
            sku_id,
            result: BatchResult::Updated,
        });
    }

    info!(
        requested = outcomes.len(),
        updated = outcomes.iter().filter(|o| o.is_applied()).count(),
        "Batch pricing update"
    );
    Ok(outcomes)
}

/// Set status, tags or supplier on each listed SKU
pub async fn batch_update_skus<S: Store>(
    store: &S,
    caller: &Identity,
    request: BatchSkuUpdateRequest,
) -> Result<Vec<BatchItemOutcome>> {
    if request.status.is_none() && request.tags.is_none() && request.supplier_id.is_none() {
        return Err(AppError::validation(
            "at least one of status, tags or supplier_id is required",
        ));
    }

    let mut outcomes = Vec::with_capacity(request.sku_ids.len());
    for sku_id in request.sku_ids {
        let Some(mut sku) = store.get_sku(caller.agency_id, sku_id).await? else {
            outcomes.push(BatchItemOutcome::skipped(sku_id, SKIP_NOT_FOUND));
            continue;
        };
        if let Some(status) = request.status {
            sku.status = status;
        }
        if let Some(tags) = &request.tags {
            sku.tags = tags.clone();
        }
        if let Some(supplier_id) = &request.supplier_id {
            sku.supplier_id = Some(supplier_id.clone());
        }
        sku.updated_at = Utc::now();

        let result = match store.update_sku(&sku).await? {
            Some(_) => {
                audit::record(
                    store,
                    caller,
                    "sku.batch_update",
                    "sku",
                    sku_id,
                    None,
                    Some(json!({
                        "status": request.status,
                        "tags": request.tags,
                        "supplier_id": request.supplier_id,
                    })),
                )
                .await;
                BatchItemOutcome {
                    sku_id,
                    result: BatchResult::Updated,
                }
            }
            None => BatchItemOutcome::skipped(sku_id, SKIP_NOT_FOUND),
        };
        outcomes.push(result);
    }
    Ok(outcomes)
}

pub async fn batch_delete_skus<S: Store>(
    store: &S,
    caller: &Identity,
    sku_ids: Vec<Uuid>,
) -> Result<Vec<BatchItemOutcome>> {
    let mut outcomes = Vec::with_capacity(sku_ids.len());
    for sku_id in sku_ids {
        let outcome = if delete_sku(store, caller, sku_id).await? {
            BatchItemOutcome {
                sku_id,
                result: BatchResult::Deleted,
            }
        } else {
            BatchItemOutcome::skipped(sku_id, SKIP_NOT_FOUND)
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SkuStatus, SkuType};
    use crate::store::{AuditStore, FaultyStore, MemoryStore, SkuStore};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn identity() -> Identity {
        Identity::new(Uuid::new_v4(), Uuid::new_v4())
    }

    fn car_request(cost: Option<i64>) -> CreateSkuRequest {
        CreateSkuRequest::new(
            "Airport transfer",
            SkuType::Car,
            json!({"car_type": "MPV", "seats": 6, "service_mode": "transfer", "cost_price": cost}),
        )
    }

    #[tokio::test]
    async fn test_create_validates_attrs_and_audits() {
        let store = MemoryStore::new();
        let me = identity();

        let bad = CreateSkuRequest::new("Broken", SkuType::Hotel, json!({"hotel_name": "x"}));
        let err = create_sku(&store, &me, bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let sku = create_sku(&store, &me, car_request(Some(300))).await.unwrap();
        assert_eq!(sku.agency_id, me.agency_id);
        assert_eq!(sku.created_by, Some(me.user_id));

        let audit = store.list_audit(me.agency_id, Some(sku.id)).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "sku.create");
    }

    #[tokio::test]
    async fn test_update_rejects_type_change_and_revalidates() {
        let store = MemoryStore::new();
        let me = identity();
        let sku = create_sku(&store, &me, car_request(None)).await.unwrap();

        let err = update_sku(
            &store,
            &me,
            sku.id,
            UpdateSkuRequest {
                sku_type: Some(SkuType::Hotel),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = update_sku(
            &store,
            &me,
            sku.id,
            UpdateSkuRequest {
                attrs: Some(json!({"seats": 4})),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let updated = update_sku(
            &store,
            &me,
            sku.id,
            UpdateSkuRequest {
                sku_name: Some("Night transfer".into()),
                sku_type: Some(SkuType::Car),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.sku_name, "Night transfer");
    }

    #[tokio::test]
    async fn test_update_survives_failed_copy_lookup() {
        let store = FaultyStore {
            fail_derived_lookup: true,
            ..FaultyStore::new()
        };
        let me = identity();
        let sku = create_sku(&store, &me, car_request(Some(300))).await.unwrap();

        let saved = update_sku(
            &store,
            &me,
            sku.id,
            UpdateSkuRequest {
                sku_name: Some("Late transfer".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(saved.sku_name, "Late transfer");

        let stored = store.get_sku(me.agency_id, sku.id).await.unwrap().unwrap();
        assert_eq!(stored.sku_name, "Late transfer");
    }

    #[tokio::test]
    async fn test_price_calendar_switches_mode() {
        let store = MemoryStore::new();
        let me = identity();
        let sku = create_sku(&store, &me, car_request(None)).await.unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();

        let saved = set_price_calendar(
            &store,
            &me,
            sku.id,
            vec![PriceCalendarItem {
                date,
                cost_price: dec!(200),
                sales_price: dec!(260),
                inventory: Some(3),
                is_available: true,
            }],
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(saved.price_mode, PriceMode::Calendar);
        assert_eq!(saved.calendar_prices["2025-10-01"].price(), Some(dec!(260)));

        assert!(set_price_calendar(&store, &identity(), sku.id, vec![])
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_batch_pricing_reports_each_item() {
        let store = MemoryStore::new();
        let me = identity();
        let with_cost = create_sku(&store, &me, car_request(Some(100))).await.unwrap();
        let without_cost = create_sku(&store, &me, car_request(None)).await.unwrap();
        let missing = Uuid::new_v4();

        let outcomes = batch_update_pricing(
            &store,
            &me,
            BatchPricingRequest {
                sku_ids: vec![with_cost.id, without_cost.id, missing],
                margin_percentage: Some(dec!(20)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(outcomes[0].result, BatchResult::Updated);
        assert_eq!(
            outcomes[1].result,
            BatchResult::Skipped {
                reason: SKIP_NO_COST.into()
            }
        );
        assert_eq!(
            outcomes[2].result,
            BatchResult::Skipped {
                reason: SKIP_NOT_FOUND.into()
            }
        );

        let repriced = get_sku(&store, &me, with_cost.id).await.unwrap().unwrap();
        assert_eq!(repriced.attrs.price_field("sell_price"), Some(dec!(120)));
    }

    #[tokio::test]
    async fn test_batch_pricing_needs_a_multiplier() {
        let store = MemoryStore::new();
        let err = batch_update_pricing(&store, &identity(), BatchPricingRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_batch_update_and_delete_stay_in_tenant() {
        let store = MemoryStore::new();
        let me = identity();
        let other = identity();
        let mine = create_sku(&store, &me, car_request(None)).await.unwrap();
        let theirs = create_sku(&store, &other, car_request(None)).await.unwrap();

        let outcomes = batch_update_skus(
            &store,
            &me,
            BatchSkuUpdateRequest {
                sku_ids: vec![mine.id, theirs.id],
                status: Some(SkuStatus::Inactive),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(outcomes[0].is_applied());
        assert!(!outcomes[1].is_applied());
        let untouched = get_sku(&store, &other, theirs.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, SkuStatus::Active);

        let deleted = batch_delete_skus(&store, &me, vec![mine.id, theirs.id])
            .await
            .unwrap();
        assert_eq!(deleted[0].result, BatchResult::Deleted);
        assert!(!deleted[1].is_applied());
        assert!(get_sku(&store, &other, theirs.id).await.unwrap().is_some());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = BatchItemOutcome::skipped(Uuid::nil(), SKIP_NO_COST);
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "sku_id": Uuid::nil(),
                "result": "skipped",
                "reason": "no cost price"
            })
        );
    }
}
