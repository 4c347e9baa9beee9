//! Catalog route handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::models::Sku;
use crate::store::{Pagination, Store};
use crate::AppState;

use super::requests::{
    BatchDeleteRequest, BatchPricingRequest, BatchSkuUpdateRequest, CreateSkuRequest,
    PriceCalendarUpdate, SkuListQuery, UpdateSkuRequest,
};
use super::responses::BatchResponse;
use super::services;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/skus", get(list::<S>).post(create::<S>))
        .route(
            "/skus/:id",
            get(detail::<S>).patch(update::<S>).delete(delete::<S>),
        )
        .route("/skus/:id/price-calendar", put(price_calendar::<S>))
        .route("/batch/skus/pricing", post(batch_pricing::<S>))
        .route("/batch/skus/update", post(batch_update::<S>))
        .route("/batch/skus/delete", post(batch_delete::<S>))
}

async fn create<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Json(body): Json<CreateSkuRequest>,
) -> Result<(StatusCode, Json<Sku>)> {
    let sku = services::create_sku(state.store.as_ref(), &caller, body).await?;
    Ok((StatusCode::CREATED, Json(sku)))
}

async fn list<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Query(query): Query<SkuListQuery>,
) -> Result<Json<Vec<Sku>>> {
    let page = Pagination::new(query.skip, query.limit, state.config.page_limit_max);
    let items = services::list_skus(state.store.as_ref(), &caller, query.filter(), page).await?;
    Ok(Json(items))
}

async fn detail<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Sku>> {
    services::get_sku(state.store.as_ref(), &caller, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn update<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSkuRequest>,
) -> Result<Json<Sku>> {
    services::update_sku(state.store.as_ref(), &caller, id, body)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if services::delete_sku(state.store.as_ref(), &caller, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn price_calendar<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
    Json(body): Json<PriceCalendarUpdate>,
) -> Result<Json<Sku>> {
    services::set_price_calendar(state.store.as_ref(), &caller, id, body.items)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn batch_pricing<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Json(body): Json<BatchPricingRequest>,
) -> Result<Json<BatchResponse>> {
    let outcomes = services::batch_update_pricing(state.store.as_ref(), &caller, body).await?;
    Ok(Json(outcomes.into()))
}

async fn batch_update<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Json(body): Json<BatchSkuUpdateRequest>,
) -> Result<Json<BatchResponse>> {
    let outcomes = services::batch_update_skus(state.store.as_ref(), &caller, body).await?;
    Ok(Json(outcomes.into()))
}

async fn batch_delete<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Json(body): Json<BatchDeleteRequest>,
) -> Result<Json<BatchResponse>> {
    let outcomes =
        services::batch_delete_skus(state.store.as_ref(), &caller, body.sku_ids).await?;
    Ok(Json(outcomes.into()))
}
