//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use tfrm_backend::catalog::{self, requests::CreateSkuRequest};
use tfrm_backend::config::AppConfig;
use tfrm_backend::cooperation;
use tfrm_backend::models::{PricingFactor, Sku, SkuType};
use tfrm_backend::pricing::{requests::FactorRequest, services as pricing};
use tfrm_backend::store::MemoryStore;
use tfrm_backend::Identity;

pub fn agency() -> Identity {
    Identity::new(Uuid::new_v4(), Uuid::new_v4())
}

pub fn hotel_request(name: &str, sell: i64) -> CreateSkuRequest {
    CreateSkuRequest::new(
        name,
        SkuType::Hotel,
        json!({
            "hotel_name": name,
            "address": "18 Lakeside Ave",
            "room_type_name": "Deluxe Double",
            "daily_cost_price": sell - 200,
            "daily_sell_price": sell
        }),
    )
}

pub async fn hotel(store: &MemoryStore, owner: &Identity, sell: i64) -> Sku {
    let mut request = hotel_request("Lakeside Hotel", sell);
    request.base_cost_price = Some(Decimal::from(sell - 200));
    request.base_sale_price = Some(Decimal::from(sell));
    request.destination_city = Some("Hangzhou".into());
    catalog::create_sku(store, owner, request).await.unwrap()
}

pub fn factor_request(name: &str, priority: i32, multiply: Decimal, add: Decimal) -> FactorRequest {
    FactorRequest {
        name: name.into(),
        apply_to_sku_types: vec![],
        apply_to_cities: vec![],
        apply_to_tags: vec![],
        apply_to_suppliers: vec![],
        multiply_factor: multiply,
        add_amount: add,
        priority,
        valid_from: None,
        valid_to: None,
    }
}

pub async fn factor(store: &MemoryStore, owner: &Identity, request: FactorRequest) -> PricingFactor {
    pricing::create_factor(store, owner, request).await.unwrap()
}

/// `requester -> provider` relation, approved by the provider
pub async fn cooperate(store: &MemoryStore, requester: &Identity, provider: &Identity) {
    let relation = cooperation::create_request(
        store,
        &AppConfig::default(),
        requester,
        provider.agency_id,
        Some("let's work together".into()),
    )
    .await
    .unwrap();
    cooperation::approve(store, provider, relation.id, None)
        .await
        .unwrap()
        .unwrap();
}
