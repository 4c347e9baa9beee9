//! Pricing factor (tenant markup rule) model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::sku::SkuType;

/// Markup rule owned by one agency.
///
/// Empty filter lists mean "no restriction on this axis".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingFactor {
    pub id: Uuid,
    pub agency_id: Uuid,
    pub name: String,
    pub apply_to_sku_types: Vec<SkuType>,
    pub apply_to_cities: Vec<String>,
    pub apply_to_tags: Vec<String>,
    pub apply_to_suppliers: Vec<String>,
    pub multiply_factor: Decimal,
    pub add_amount: Decimal,
    /// Higher wins
    pub priority: i32,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PricingFactor {
    /// Check if the factor's window contains `date`. Both bounds are inclusive.
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        if let Some(from) = self.valid_from {
            if from > date {
                return false;
            }
        }
        match self.valid_to {
            Some(to) => date <= to,
            None => true,
        }
    }
}
