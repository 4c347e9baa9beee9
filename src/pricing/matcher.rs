//! Pricing factor selection.
//!
//! First survivor wins: factors are walked in listing order (priority
//! descending, ties in creation order) and the first one whose window and
//! filters all accept the SKU is chosen. There is no best-match scoring.

use chrono::NaiveDate;

use crate::models::{PricingFactor, Sku};

/// Check whether every non-empty filter axis of `factor` accepts `sku`.
///
/// An empty axis places no restriction. Tags match on intersection.
pub fn factor_applies_to(factor: &PricingFactor, sku: &Sku) -> bool {
    if !factor.apply_to_sku_types.is_empty() && !factor.apply_to_sku_types.contains(&sku.sku_type) {
        return false;
    }

    if !factor.apply_to_cities.is_empty() {
        match &sku.destination_city {
            Some(city) if factor.apply_to_cities.contains(city) => {}
            _ => return false,
        }
    }

    if !factor.apply_to_tags.is_empty() && !sku.shares_tag_with(&factor.apply_to_tags) {
        return false;
    }

    if !factor.apply_to_suppliers.is_empty() {
        match &sku.supplier_id {
            Some(supplier) if factor.apply_to_suppliers.contains(supplier) => {}
            _ => return false,
        }
    }

    true
}

/// Pick the factor for `sku` on `today` from `factors`, which must already be
/// in priority order.
pub fn find_matching_factor<'a>(
    factors: &'a [PricingFactor],
    sku: &Sku,
    today: NaiveDate,
) -> Option<&'a PricingFactor> {
    factors
        .iter()
        .filter(|f| f.is_valid_on(today))
        .find(|f| factor_applies_to(f, sku))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SkuAttrs, SkuType};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn car_in(city: &str, tags: &[&str], supplier: Option<&str>) -> Sku {
        let attrs = SkuAttrs::parse(
            SkuType::Car,
            json!({"car_type": "SUV", "seats": 7, "service_mode": "charter"}),
        )
        .unwrap();
        let mut sku = Sku::new_private(Uuid::new_v4(), "7-seat SUV".into(), attrs, None, Utc::now());
        sku.destination_city = Some(city.to_string());
        sku.tags = tags.iter().map(|t| t.to_string()).collect();
        sku.supplier_id = supplier.map(str::to_string);
        sku
    }

    fn factor(name: &str, priority: i32) -> PricingFactor {
        let now = Utc::now();
        PricingFactor {
            id: Uuid::new_v4(),
            agency_id: Uuid::new_v4(),
            name: name.to_string(),
            apply_to_sku_types: vec![],
            apply_to_cities: vec![],
            apply_to_tags: vec![],
            apply_to_suppliers: vec![],
            multiply_factor: dec!(1.1),
            add_amount: Decimal::ZERO,
            priority,
            valid_from: None,
            valid_to: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_first_in_priority_order_wins() {
        let sku = car_in("Kunming", &[], None);
        let factors = vec![factor("high", 10), factor("low", 5)];
        let chosen = find_matching_factor(&factors, &sku, today()).unwrap();
        assert_eq!(chosen.name, "high");
    }

    #[test]
    fn test_equal_priority_is_stable() {
        let sku = car_in("Kunming", &[], None);
        let factors = vec![factor("first", 5), factor("second", 5)];
        for _ in 0..10 {
            assert_eq!(
                find_matching_factor(&factors, &sku, today()).unwrap().name,
                "first"
            );
        }
    }

    #[test]
    fn test_window_excludes_outside_dates() {
        let sku = car_in("Kunming", &[], None);

        let mut future = factor("future", 10);
        future.valid_from = Some(NaiveDate::from_ymd_opt(2025, 6, 11).unwrap());
        let mut past = factor("past", 9);
        past.valid_to = Some(NaiveDate::from_ymd_opt(2025, 6, 9).unwrap());
        let mut edge = factor("edge", 1);
        edge.valid_from = Some(today());
        edge.valid_to = Some(today());

        let factors = vec![future, past, edge];
        assert_eq!(
            find_matching_factor(&factors, &sku, today()).unwrap().name,
            "edge"
        );
    }

    #[test]
    fn test_filter_axes() {
        let sku = car_in("Kunming", &["family", "eco"], Some("sup-1"));

        let mut wrong_type = factor("hotel only", 40);
        wrong_type.apply_to_sku_types = vec![SkuType::Hotel];
        let mut wrong_city = factor("dali only", 30);
        wrong_city.apply_to_cities = vec!["Dali".into()];
        let mut wrong_tag = factor("luxury", 20);
        wrong_tag.apply_to_tags = vec!["luxury".into()];
        let mut wrong_supplier = factor("sup-2", 15);
        wrong_supplier.apply_to_suppliers = vec!["sup-2".into()];
        let mut all_match = factor("all axes", 10);
        all_match.apply_to_sku_types = vec![SkuType::Car, SkuType::Hotel];
        all_match.apply_to_cities = vec!["Kunming".into()];
        all_match.apply_to_tags = vec!["eco".into(), "luxury".into()];
        all_match.apply_to_suppliers = vec!["sup-1".into()];

        let factors = vec![wrong_type, wrong_city, wrong_tag, wrong_supplier, all_match];
        assert_eq!(
            find_matching_factor(&factors, &sku, today()).unwrap().name,
            "all axes"
        );
    }

    #[test]
    fn test_missing_attribute_fails_non_empty_axis() {
        let mut sku = car_in("Kunming", &[], None);
        sku.destination_city = None;

        let mut city = factor("city", 1);
        city.apply_to_cities = vec!["Kunming".into()];
        let mut supplier = factor("supplier", 1);
        supplier.apply_to_suppliers = vec!["sup-1".into()];

        assert!(!factor_applies_to(&city, &sku));
        assert!(!factor_applies_to(&supplier, &sku));
        assert!(find_matching_factor(&[city, supplier], &sku, today()).is_none());
    }
}
