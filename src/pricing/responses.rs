//! Response DTOs for pricing API endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::PriceRule;

use super::calculators::{PriceResolution, PriceSource};
use super::services::Availability;

/// One resolved date
#[derive(Debug, Serialize)]
pub struct PriceResolutionResponse {
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub final_price: Decimal,
    pub price_source: PriceSource,
    pub rule_applied: Option<PriceRule>,
    pub factor_applied: Option<Uuid>,
}

impl From<PriceResolution> for PriceResolutionResponse {
    fn from(r: PriceResolution) -> Self {
        Self {
            date: r.date,
            base_price: r.base_price,
            final_price: r.final_price,
            price_source: r.price_source,
            rule_applied: r.rule_applied,
            factor_applied: r.factor_applied,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub sku_id: Uuid,
    pub currency: String,
    pub items: Vec<PriceResolutionResponse>,
}

impl From<Availability> for AvailabilityResponse {
    fn from(a: Availability) -> Self {
        Self {
            sku_id: a.sku_id,
            currency: a.currency,
            items: a.items.into_iter().map(Into::into).collect(),
        }
    }
}
