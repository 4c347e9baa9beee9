//! Pricing route handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::models::PricingFactor;
use crate::store::Store;
use crate::AppState;

use super::requests::{AvailabilityQuery, FactorRequest, FactorUpdateRequest, PriceQuery};
use super::responses::{AvailabilityResponse, PriceResolutionResponse};
use super::services;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/skus/:id/price", get(price::<S>))
        .route("/skus/:id/availability", get(availability::<S>))
        .route("/pricing/factors", get(list_factors::<S>).post(create_factor::<S>))
        .route(
            "/pricing/factors/:id",
            get(get_factor::<S>)
                .patch(update_factor::<S>)
                .delete(delete_factor::<S>),
        )
}

async fn price<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(sku_id): Path<Uuid>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<PriceResolutionResponse>> {
    services::resolve_price(state.store.as_ref(), &caller, sku_id, query.date)
        .await?
        .map(|r| Json(r.into()))
        .ok_or(AppError::NotFound)
}

async fn availability<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(sku_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>> {
    services::get_availability(
        state.store.as_ref(),
        &state.config,
        &caller,
        sku_id,
        query.start_date,
        query.days,
    )
    .await?
    .map(|a| Json(a.into()))
    .ok_or(AppError::NotFound)
}

async fn list_factors<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
) -> Result<Json<Vec<PricingFactor>>> {
    Ok(Json(services::list_factors(state.store.as_ref(), &caller).await?))
}

async fn create_factor<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Json(body): Json<FactorRequest>,
) -> Result<(StatusCode, Json<PricingFactor>)> {
    let factor = services::create_factor(state.store.as_ref(), &caller, body).await?;
    Ok((StatusCode::CREATED, Json(factor)))
}

async fn get_factor<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<PricingFactor>> {
    services::get_factor(state.store.as_ref(), &caller, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn update_factor<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
    Json(body): Json<FactorUpdateRequest>,
) -> Result<Json<PricingFactor>> {
    services::update_factor(state.store.as_ref(), &caller, id, body)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn delete_factor<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if services::delete_factor(state.store.as_ref(), &caller, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
