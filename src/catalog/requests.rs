//! Request DTOs for catalog endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::library::requests::split_tags;
use crate::models::{OwnerType, PriceCalendar, PriceMode, PriceRule, SkuStatus, SkuType};
use crate::store::SkuFilter;

/// Body of SKU creation. New entries always start private.
#[derive(Debug, Deserialize)]
pub struct CreateSkuRequest {
    pub sku_name: String,
    pub sku_type: SkuType,
    pub attrs: serde_json::Value,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub supplier_id: Option<String>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub destination_country: Option<String>,
    #[serde(default)]
    pub destination_city: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
    #[serde(default)]
    pub booking_advance: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub inclusions: Vec<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
    #[serde(default)]
    pub cancellation_policy: Option<String>,
    #[serde(default)]
    pub price_mode: Option<PriceMode>,
    #[serde(default)]
    pub base_cost_price: Option<Decimal>,
    #[serde(default)]
    pub base_sale_price: Option<Decimal>,
    #[serde(default)]
    pub calendar_prices: Option<PriceCalendar>,
    #[serde(default)]
    pub price_rules: Option<Vec<PriceRule>>,
    #[serde(default)]
    pub media: Vec<BTreeMap<String, String>>,
}

impl CreateSkuRequest {
    /// Minimal request, everything optional left empty
    pub fn new(sku_name: impl Into<String>, sku_type: SkuType, attrs: serde_json::Value) -> Self {
        Self {
            sku_name: sku_name.into(),
            sku_type,
            attrs,
            product_id: None,
            supplier_id: None,
            supplier_name: None,
            destination_country: None,
            destination_city: None,
            tags: Vec::new(),
            valid_from: None,
            valid_to: None,
            booking_advance: None,
            description: None,
            highlights: Vec::new(),
            inclusions: Vec::new(),
            exclusions: Vec::new(),
            cancellation_policy: None,
            price_mode: None,
            base_cost_price: None,
            base_sale_price: None,
            calendar_prices: None,
            price_rules: None,
            media: Vec::new(),
        }
    }
}

/// Partial SKU update; absent fields are left as they are.
///
/// `sku_type` is accepted only so that an attempt to change it can be
/// rejected explicitly.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSkuRequest {
    pub sku_type: Option<SkuType>,
    pub sku_name: Option<String>,
    pub status: Option<SkuStatus>,
    pub product_id: Option<Uuid>,
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
    pub destination_country: Option<String>,
    pub destination_city: Option<String>,
    pub tags: Option<Vec<String>>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub booking_advance: Option<i32>,
    pub description: Option<String>,
    pub highlights: Option<Vec<String>>,
    pub inclusions: Option<Vec<String>>,
    pub exclusions: Option<Vec<String>>,
    pub cancellation_policy: Option<String>,
    pub price_mode: Option<PriceMode>,
    pub base_cost_price: Option<Decimal>,
    pub base_sale_price: Option<Decimal>,
    pub calendar_prices: Option<PriceCalendar>,
    pub price_rules: Option<Vec<PriceRule>>,
    pub attrs: Option<serde_json::Value>,
    pub media: Option<Vec<BTreeMap<String, String>>>,
}

/// Query string of the private catalog listing. `tags` is comma separated.
#[derive(Debug, Default, Deserialize)]
pub struct SkuListQuery {
    #[serde(default)]
    pub sku_type: Option<SkuType>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub status: Option<SkuStatus>,
    #[serde(default)]
    pub owner_type: Option<OwnerType>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl SkuListQuery {
    pub fn filter(&self) -> SkuFilter {
        SkuFilter {
            sku_type: self.sku_type,
            city: self.city.clone(),
            tags: split_tags(self.tags.as_deref()),
            status: self.status,
            owner_type: self.owner_type,
            keyword: self.keyword.clone(),
        }
    }
}

/// One dated price in a calendar update
#[derive(Debug, Clone, Deserialize)]
pub struct PriceCalendarItem {
    pub date: NaiveDate,
    pub cost_price: Decimal,
    pub sales_price: Decimal,
    #[serde(default)]
    pub inventory: Option<i32>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct PriceCalendarUpdate {
    pub items: Vec<PriceCalendarItem>,
}

/// Re-derive sell prices from cost.
///
/// Exactly one of `margin_percentage` (20 means cost * 1.2) or
/// `multiply_factor` is expected; `multiply_factor` wins if both are given.
#[derive(Debug, Default, Deserialize)]
pub struct BatchPricingRequest {
    pub sku_ids: Vec<Uuid>,
    #[serde(default)]
    pub margin_percentage: Option<Decimal>,
    #[serde(default)]
    pub multiply_factor: Option<Decimal>,
    #[serde(default)]
    pub add_amount: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchSkuUpdateRequest {
    pub sku_ids: Vec<Uuid>,
    #[serde(default)]
    pub status: Option<SkuStatus>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub supplier_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchDeleteRequest {
    pub sku_ids: Vec<Uuid>,
}
