//! Core pricing calculation functions.
//!
//! Pure functions for pricing math - no store access. Everything here takes
//! the date explicitly so results are reproducible in tests.

use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{PriceCalendar, PriceMode, PriceRule, PricingFactor, Sku, SkuAttrs};

/// Attribute keys probed (in order) for the sell-side base price
pub const SELL_PRICE_KEYS: [&str; 4] = [
    "daily_sell_price",
    "sell_price",
    "per_person_price",
    "adult_price",
];

/// Attribute keys probed (in order) when no sell price is present
pub const COST_PRICE_KEYS: [&str; 4] = [
    "daily_cost_price",
    "cost_price",
    "per_person_price",
    "adult_price",
];

/// Alternate calendar key format accepted after ISO `YYYY-MM-DD`
const ALT_CALENDAR_KEY_FORMAT: &str = "%Y/%m/%d";

/// Round to specified decimal places using banker's rounding (ROUND_HALF_EVEN).
///
/// Banker's rounding rounds to the nearest even number when the value is exactly
/// halfway between two possibilities. This reduces cumulative rounding bias
/// across a batch re-price.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use tfrm_backend::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(2));
/// assert_eq!(round_money(dec!(3.5), 0), dec!(4));
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// `price * multiply_factor + add_amount`, multiply first.
pub fn apply_factor(price: Decimal, multiply_factor: Decimal, add_amount: Decimal) -> Decimal {
    price * multiply_factor + add_amount
}

/// Which precedence tier produced a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Fixed,
    Calendar,
    Rule,
}

/// Price of one resource on one date
#[derive(Debug, Clone, PartialEq)]
pub struct PriceResolution {
    pub date: NaiveDate,
    /// Sell (or cost) base from the attribute payload, before any tier or factor
    pub base_price: Decimal,
    pub final_price: Decimal,
    pub price_source: PriceSource,
    pub rule_applied: Option<PriceRule>,
    pub factor_applied: Option<Uuid>,
}

fn first_price(attrs: &SkuAttrs, keys: &[&str]) -> Option<Decimal> {
    keys.iter().find_map(|key| attrs.price_field(key))
}

/// `(cost, sell)` as found in the attribute payload
pub fn base_prices(attrs: &SkuAttrs) -> (Option<Decimal>, Option<Decimal>) {
    (
        first_price(attrs, &COST_PRICE_KEYS),
        first_price(attrs, &SELL_PRICE_KEYS),
    )
}

/// Sell price, else cost price, else zero. A zero amount counts as absent.
pub fn base_price(attrs: &SkuAttrs) -> Decimal {
    let (cost, sell) = base_prices(attrs);
    sell.filter(|p| !p.is_zero())
        .or(cost.filter(|p| !p.is_zero()))
        .unwrap_or(Decimal::ZERO)
}

/// The calendar in force: the SKU-level one if non-empty, else the legacy
/// calendar nested in hotel attributes.
fn effective_calendar(sku: &Sku) -> Option<&PriceCalendar> {
    if !sku.calendar_prices.is_empty() {
        return Some(&sku.calendar_prices);
    }
    sku.attrs.legacy_price_calendar()
}

/// Calendar price for `date`, trying the ISO key first
pub fn calendar_price(calendar: &PriceCalendar, date: NaiveDate) -> Option<Decimal> {
    let entry = calendar
        .get(&date.format("%Y-%m-%d").to_string())
        .or_else(|| calendar.get(&date.format(ALT_CALENDAR_KEY_FORMAT).to_string()))?;
    entry.price()
}

/// Resolve the unit price of `sku` on `date`.
///
/// Precedence: calendar entry for the date, then (in `ruled` mode) the first
/// matching rule's delta on top of the base, then the base itself. The factor,
/// when given, is applied to whichever tier fired. Missing data degrades to 0.
pub fn resolve_price_for_date(
    sku: &Sku,
    date: NaiveDate,
    factor: Option<&PricingFactor>,
) -> PriceResolution {
    let base = base_price(&sku.attrs);
    let mut price = base;
    let mut price_source = PriceSource::Fixed;
    let mut rule_applied = None;

    if let Some(calendar) = effective_calendar(sku).and_then(|c| calendar_price(c, date)) {
        price = calendar;
        price_source = PriceSource::Calendar;
    } else if sku.price_mode == PriceMode::Ruled {
        if let Some(rule) = sku.price_rules.iter().find(|r| r.matches(date)) {
            price = base + rule.delta_amount;
            price_source = PriceSource::Rule;
            rule_applied = Some(rule.clone());
        }
    }

    let factor_applied = factor.map(|f| {
        price = apply_factor(price, f.multiply_factor, f.add_amount);
        f.id
    });

    PriceResolution {
        date,
        base_price: base,
        final_price: round_money(price, 2),
        price_source,
        rule_applied,
        factor_applied,
    }
}

/// One resolution per day for `days` days starting at `start`.
pub fn build_availability(
    sku: &Sku,
    factor: Option<&PricingFactor>,
    start: NaiveDate,
    days: u32,
) -> Vec<PriceResolution> {
    (0..days)
        .map(|offset| resolve_price_for_date(sku, start + Duration::days(i64::from(offset)), factor))
        .collect()
}

/// Rewrite the type-specific price attributes of `attrs` through a factor.
///
/// Keys the payload leaves empty are untouched. Returns the keys rewritten.
pub fn reprice_attrs(
    attrs: &mut SkuAttrs,
    multiply_factor: Decimal,
    add_amount: Decimal,
) -> Vec<&'static str> {
    let mut rewritten = Vec::new();
    for &key in attrs.price_keys() {
        if let Some(slot) = attrs.price_field_mut(key) {
            if let Some(current) = *slot {
                *slot = Some(round_money(apply_factor(current, multiply_factor, add_amount), 2));
                rewritten.push(key);
            }
        }
    }
    rewritten
}

/// Multiplier equivalent of a margin percentage, e.g. `20` -> `1.2`
pub fn margin_multiplier(margin_percentage: Decimal) -> Decimal {
    Decimal::ONE + margin_percentage / Decimal::ONE_HUNDRED
}

/// `(cost_key, sell_key)` pair a batch re-price derives one from the other
pub fn cost_sell_keys(attrs: &SkuAttrs) -> Option<(&'static str, &'static str)> {
    match attrs {
        SkuAttrs::Hotel(_) | SkuAttrs::Guide(_) => Some(("daily_cost_price", "daily_sell_price")),
        SkuAttrs::Car(_) | SkuAttrs::Ticket(_) | SkuAttrs::Activity(_) => {
            Some(("cost_price", "sell_price"))
        }
        SkuAttrs::Itinerary(_) | SkuAttrs::Restaurant(_) => None,
    }
}

/// Set the sell attribute to `cost * multiply_factor + add_amount`.
///
/// Returns the new sell price, or `None` when the payload has no cost price
/// to derive from.
pub fn sell_from_cost(
    attrs: &mut SkuAttrs,
    multiply_factor: Decimal,
    add_amount: Decimal,
) -> Option<Decimal> {
    let (cost_key, sell_key) = cost_sell_keys(attrs)?;
    let cost = attrs.price_field(cost_key)?;
    let sell = round_money(apply_factor(cost, multiply_factor, add_amount), 2);
    *attrs.price_field_mut(sell_key)? = Some(sell);
    Some(sell)
}
