//! Pricing service functions with store access.
//!
//! The math lives in `calculators`; these functions load the SKU and the
//! caller's factors and hand them over.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::models::{PricingFactor, Sku};
use crate::store::{FactorStore, Store};

use super::calculators::{build_availability, resolve_price_for_date, PriceResolution};
use super::matcher;
use super::requests::{FactorRequest, FactorUpdateRequest};

/// Per-day prices of one SKU
#[derive(Debug, Clone)]
pub struct Availability {
    pub sku_id: Uuid,
    pub currency: String,
    pub items: Vec<PriceResolution>,
}

/// Find the factor of `agency_id` that applies to `sku` on `today`.
///
/// # Arguments
/// * `store` - Factor store; listing order is priority descending
/// * `agency_id` - Agency whose factors are considered
/// * `sku` - Resource being priced
/// * `today` - Date checked against each factor's validity window
///
/// # Returns
/// The first surviving factor, or `None` when nothing applies
pub async fn find_matching_factor<S: FactorStore>(
    store: &S,
    agency_id: Uuid,
    sku: &Sku,
    today: NaiveDate,
) -> Result<Option<PricingFactor>> {
    let factors = store.list_factors(agency_id).await?;
    let found = matcher::find_matching_factor(&factors, sku, today).cloned();
    debug!(
        %agency_id,
        sku_id = %sku.id,
        factor_id = ?found.as_ref().map(|f| f.id),
        "Factor lookup"
    );
    Ok(found)
}

/// Price of one of the caller's SKUs on `date`, with the caller's factor
pub async fn resolve_price<S: Store>(
    store: &S,
    caller: &Identity,
    sku_id: Uuid,
    date: NaiveDate,
) -> Result<Option<PriceResolution>> {
    let Some(sku) = store.get_sku(caller.agency_id, sku_id).await? else {
        return Ok(None);
    };
    let factor =
        find_matching_factor(store, caller.agency_id, &sku, Utc::now().date_naive()).await?;
    Ok(Some(resolve_price_for_date(&sku, date, factor.as_ref())))
}

/// Daily price list for `days` days starting at `start` (default: today).
///
/// `days` is clamped by the configured maximum. Currency comes from the
/// attribute payload when it carries one, else the configured default.
pub async fn get_availability<S: Store>(
    store: &S,
    config: &AppConfig,
    caller: &Identity,
    sku_id: Uuid,
    start: Option<NaiveDate>,
    days: Option<u32>,
) -> Result<Option<Availability>> {
    let Some(sku) = store.get_sku(caller.agency_id, sku_id).await? else {
        return Ok(None);
    };

    let today = Utc::now().date_naive();
    let factor = find_matching_factor(store, caller.agency_id, &sku, today).await?;
    let days = config.clamp_availability_days(days);
    let items = build_availability(&sku, factor.as_ref(), start.unwrap_or(today), days);

    let currency = sku
        .attrs
        .currency()
        .unwrap_or(&config.default_currency)
        .to_string();

    Ok(Some(Availability {
        sku_id,
        currency,
        items,
    }))
}

fn check_factor_values(
    multiply_factor: Decimal,
    valid_from: Option<NaiveDate>,
    valid_to: Option<NaiveDate>,
) -> Result<()> {
    if multiply_factor.is_sign_negative() {
        return Err(AppError::validation("multiply_factor must not be negative"));
    }
    if let (Some(from), Some(to)) = (valid_from, valid_to) {
        if from > to {
            return Err(AppError::validation("valid_from must not be after valid_to"));
        }
    }
    Ok(())
}

pub async fn create_factor<S: Store>(
    store: &S,
    caller: &Identity,
    request: FactorRequest,
) -> Result<PricingFactor> {
    if request.name.trim().is_empty() {
        return Err(AppError::validation("factor name is required"));
    }
    check_factor_values(request.multiply_factor, request.valid_from, request.valid_to)?;

    let now = Utc::now();
    let factor = PricingFactor {
        id: Uuid::new_v4(),
        agency_id: caller.agency_id,
        name: request.name,
        apply_to_sku_types: request.apply_to_sku_types,
        apply_to_cities: request.apply_to_cities,
        apply_to_tags: request.apply_to_tags,
        apply_to_suppliers: request.apply_to_suppliers,
        multiply_factor: request.multiply_factor,
        add_amount: request.add_amount,
        priority: request.priority,
        valid_from: request.valid_from,
        valid_to: request.valid_to,
        created_at: now,
        updated_at: now,
    };

    let factor = store.insert_factor(factor).await?;
    info!(factor_id = %factor.id, agency_id = %factor.agency_id, "Pricing factor created");
    audit::record(
        store,
        caller,
        "pricing_factor.create",
        "pricing_factor",
        factor.id,
        None,
        audit::snapshot(&factor),
    )
    .await;
    Ok(factor)
}

pub async fn get_factor<S: FactorStore>(
    store: &S,
    caller: &Identity,
    factor_id: Uuid,
) -> Result<Option<PricingFactor>> {
    store.get_factor(caller.agency_id, factor_id).await
}

pub async fn list_factors<S: FactorStore>(
    store: &S,
    caller: &Identity,
) -> Result<Vec<PricingFactor>> {
    store.list_factors(caller.agency_id).await
}

/// Apply the fields present in `patch` to one of the caller's factors
pub async fn update_factor<S: Store>(
    store: &S,
    caller: &Identity,
    factor_id: Uuid,
    patch: FactorUpdateRequest,
) -> Result<Option<PricingFactor>> {
    let Some(before) = store.get_factor(caller.agency_id, factor_id).await? else {
        return Ok(None);
    };

    let mut factor = before.clone();
    if let Some(name) = patch.name {
        if name.trim().is_empty() {
            return Err(AppError::validation("factor name is required"));
        }
        factor.name = name;
    }
    if let Some(v) = patch.apply_to_sku_types {
        factor.apply_to_sku_types = v;
    }
    if let Some(v) = patch.apply_to_cities {
        factor.apply_to_cities = v;
    }
    if let Some(v) = patch.apply_to_tags {
        factor.apply_to_tags = v;
    }
    if let Some(v) = patch.apply_to_suppliers {
        factor.apply_to_suppliers = v;
    }
    if let Some(v) = patch.multiply_factor {
        factor.multiply_factor = v;
    }
    if let Some(v) = patch.add_amount {
        factor.add_amount = v;
    }
    if let Some(v) = patch.priority {
        factor.priority = v;
    }
    if let Some(v) = patch.valid_from {
        factor.valid_from = Some(v);
    }
    if let Some(v) = patch.valid_to {
        factor.valid_to = Some(v);
    }
    check_factor_values(factor.multiply_factor, factor.valid_from, factor.valid_to)?;
    factor.updated_at = Utc::now();

    let Some(saved) = store.update_factor(&factor).await? else {
        return Ok(None);
    };
    audit::record(
        store,
        caller,
        "pricing_factor.update",
        "pricing_factor",
        saved.id,
        audit::snapshot(&before),
        audit::snapshot(&saved),
    )
    .await;
    Ok(Some(saved))
}

pub async fn delete_factor<S: Store>(
    store: &S,
    caller: &Identity,
    factor_id: Uuid,
) -> Result<bool> {
    let Some(before) = store.get_factor(caller.agency_id, factor_id).await? else {
        return Ok(false);
    };
    let deleted = store.delete_factor(caller.agency_id, factor_id).await?;
    if deleted {
        info!(%factor_id, "Pricing factor deleted");
        audit::record(
            store,
            caller,
            "pricing_factor.delete",
            "pricing_factor",
            factor_id,
            audit::snapshot(&before),
            None,
        )
        .await;
    }
    Ok(deleted)
}
