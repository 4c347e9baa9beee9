mod common;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tfrm_backend::catalog::{self, requests::UpdateSkuRequest};
use tfrm_backend::models::{CalendarEntry, PriceMode, PriceRule, SkuType};
use tfrm_backend::pricing::{self, PriceSource};
use tfrm_backend::store::MemoryStore;

use common::{agency, factor, factor_request, hotel};

// 2025-06-07 is a Saturday, 2025-06-10 a Tuesday
fn saturday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 7).unwrap()
}

fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
}

#[tokio::test]
async fn calendar_price_wins_in_every_mode() {
    let store = MemoryStore::new();
    let me = agency();
    let sku = hotel(&store, &me, 1000).await;

    for mode in [PriceMode::Fixed, PriceMode::Calendar, PriceMode::Ruled] {
        let mut calendar = std::collections::BTreeMap::new();
        calendar.insert("2025-06-07".to_string(), CalendarEntry::Amount(dec!(1500)));
        catalog::update_sku(
            &store,
            &me,
            sku.id,
            UpdateSkuRequest {
                price_mode: Some(mode),
                price_rules: Some(vec![PriceRule::weekend(dec!(300))]),
                calendar_prices: Some(calendar),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        let price = pricing::resolve_price(&store, &me, sku.id, saturday())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(price.price_source, PriceSource::Calendar, "mode {mode:?}");
        assert_eq!(price.final_price, dec!(1500));
    }
}

#[tokio::test]
async fn weekend_rule_adds_delta_only_on_weekends() {
    let store = MemoryStore::new();
    let me = agency();
    let sku = hotel(&store, &me, 1000).await;
    catalog::update_sku(
        &store,
        &me,
        sku.id,
        UpdateSkuRequest {
            price_mode: Some(PriceMode::Ruled),
            price_rules: Some(vec![PriceRule::weekend(dec!(300))]),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    let weekend = pricing::resolve_price(&store, &me, sku.id, saturday())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(weekend.final_price, dec!(1300));
    assert_eq!(weekend.price_source, PriceSource::Rule);

    let weekday = pricing::resolve_price(&store, &me, sku.id, tuesday())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(weekday.final_price, dec!(1000));
}

#[tokio::test]
async fn factor_multiplies_then_adds() {
    let store = MemoryStore::new();
    let me = agency();
    let sku = hotel(&store, &me, 1000).await;
    factor(&store, &me, factor_request("markup", 1, dec!(1.2), dec!(50))).await;

    let price = pricing::resolve_price(&store, &me, sku.id, tuesday())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(price.final_price, dec!(1250));
    assert_eq!(price.base_price, dec!(1000));
}

#[tokio::test]
async fn factor_selection_is_priority_first_and_stable() {
    let store = MemoryStore::new();
    let me = agency();
    let sku = hotel(&store, &me, 1000).await;

    let low = factor(&store, &me, factor_request("low", 5, dec!(3), Decimal::ZERO)).await;
    let high = factor(&store, &me, factor_request("high", 10, dec!(2), Decimal::ZERO)).await;
    let picked = pricing::find_matching_factor(&store, me.agency_id, &sku, tuesday())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(picked.id, high.id);
    assert_ne!(picked.id, low.id);

    let tied = agency();
    let first = factor(&store, &tied, factor_request("a", 7, dec!(1.1), Decimal::ZERO)).await;
    factor(&store, &tied, factor_request("b", 7, dec!(1.3), Decimal::ZERO)).await;
    for _ in 0..10 {
        let picked = pricing::find_matching_factor(&store, tied.agency_id, &sku, tuesday())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, first.id);
    }
}

#[tokio::test]
async fn factor_filters_exclude_other_types() {
    let store = MemoryStore::new();
    let me = agency();
    let sku = hotel(&store, &me, 1000).await;

    let mut cars_only = factor_request("cars", 100, dec!(5), Decimal::ZERO);
    cars_only.apply_to_sku_types = vec![SkuType::Car];
    factor(&store, &me, cars_only).await;

    let price = pricing::resolve_price(&store, &me, sku.id, tuesday())
        .await
        .unwrap()
        .unwrap();
    assert!(price.factor_applied.is_none());
    assert_eq!(price.final_price, dec!(1000));
}

#[tokio::test]
async fn weekend_rule_with_markup_scenario() {
    let store = MemoryStore::new();
    let me = agency();
    let sku = hotel(&store, &me, 1000).await;
    catalog::update_sku(
        &store,
        &me,
        sku.id,
        UpdateSkuRequest {
            price_mode: Some(PriceMode::Ruled),
            price_rules: Some(vec![PriceRule::weekend(dec!(200))]),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    let mut hotels = factor_request("hotels", 1, dec!(1.1), Decimal::ZERO);
    hotels.apply_to_sku_types = vec![SkuType::Hotel];
    factor(&store, &me, hotels).await;

    let saturday_price = pricing::resolve_price(&store, &me, sku.id, saturday())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saturday_price.final_price, dec!(1320));

    let tuesday_price = pricing::resolve_price(&store, &me, sku.id, tuesday())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tuesday_price.final_price, dec!(1100));
}

#[tokio::test]
async fn factor_applies_on_top_of_calendar_price() {
    let store = MemoryStore::new();
    let me = agency();
    let sku = hotel(&store, &me, 800).await;
    let mut calendar = std::collections::BTreeMap::new();
    calendar.insert("2025-06-10".to_string(), CalendarEntry::Amount(dec!(1000)));
    catalog::update_sku(
        &store,
        &me,
        sku.id,
        UpdateSkuRequest {
            calendar_prices: Some(calendar),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    factor(&store, &me, factor_request("markup", 1, dec!(1.2), dec!(50))).await;

    let price = pricing::resolve_price(&store, &me, sku.id, tuesday())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(price.price_source, PriceSource::Calendar);
    assert_eq!(price.final_price, dec!(1250));
}
