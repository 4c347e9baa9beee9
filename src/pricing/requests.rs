//! Request DTOs for pricing API endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::SkuType;

/// Body of factor creation
#[derive(Debug, Deserialize)]
pub struct FactorRequest {
    pub name: String,
    #[serde(default)]
    pub apply_to_sku_types: Vec<SkuType>,
    #[serde(default)]
    pub apply_to_cities: Vec<String>,
    #[serde(default)]
    pub apply_to_tags: Vec<String>,
    #[serde(default)]
    pub apply_to_suppliers: Vec<String>,
    #[serde(default = "default_multiply_factor")]
    pub multiply_factor: Decimal,
    #[serde(default)]
    pub add_amount: Decimal,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
}

fn default_multiply_factor() -> Decimal {
    Decimal::ONE
}

/// Partial factor update; absent fields are left as they are
#[derive(Debug, Default, Deserialize)]
pub struct FactorUpdateRequest {
    pub name: Option<String>,
    pub apply_to_sku_types: Option<Vec<SkuType>>,
    pub apply_to_cities: Option<Vec<String>>,
    pub apply_to_tags: Option<Vec<String>>,
    pub apply_to_suppliers: Option<Vec<String>>,
    pub multiply_factor: Option<Decimal>,
    pub add_amount: Option<Decimal>,
    pub priority: Option<i32>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
pub struct AvailabilityQuery {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub days: Option<u32>,
}
