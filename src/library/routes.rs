//! Public library route handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::models::Sku;
use crate::store::{Pagination, Store};
use crate::AppState;

use super::requests::{PublicBrowseQuery, PublishRequest, PullQuery};
use super::services;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/skus/:id/publish", post(publish::<S>))
        .route("/skus/:id/unpublish", post(unpublish::<S>))
        .route("/public/skus", get(browse::<S>))
        .route("/public/skus/:id", get(detail::<S>))
        .route("/public/skus/:id/copy", post(copy::<S>))
        .route("/public/skus/:id/pull", post(pull::<S>))
}

async fn publish<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
    Json(body): Json<PublishRequest>,
) -> Result<Json<Sku>> {
    services::publish(
        state.store.as_ref(),
        &caller,
        id,
        body.visibility_scope,
        body.partner_whitelist,
    )
    .await?
    .map(Json)
    .ok_or(AppError::NotFound)
}

async fn unpublish<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Sku>> {
    services::unpublish(state.store.as_ref(), &caller, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn browse<S: Store>(
    State(state): State<AppState<S>>,
    _caller: Identity,
    Query(query): Query<PublicBrowseQuery>,
) -> Result<Json<Vec<Sku>>> {
    let page = Pagination::new(query.skip, query.limit, state.config.page_limit_max);
    let items = services::browse_public(state.store.as_ref(), query.filter(), page).await?;
    Ok(Json(items))
}

async fn detail<S: Store>(
    State(state): State<AppState<S>>,
    _caller: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Sku>> {
    services::get_public_sku(state.store.as_ref(), id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn copy<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Sku>)> {
    services::copy_to_private(state.store.as_ref(), &caller, id)
        .await?
        .map(|sku| (StatusCode::CREATED, Json(sku)))
        .ok_or(AppError::NotFound)
}

async fn pull<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
    Query(query): Query<PullQuery>,
) -> Result<(StatusCode, Json<Sku>)> {
    services::pull_public_sku(state.store.as_ref(), &caller, id, query.apply_factor)
        .await?
        .map(|sku| (StatusCode::CREATED, Json(sku)))
        .ok_or(AppError::NotFound)
}
