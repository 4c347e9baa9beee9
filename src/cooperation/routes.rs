//! Cooperation route handlers

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::models::CooperationRelation;
use crate::store::{Pagination, Store};
use crate::AppState;

use super::requests::{
    CooperationListQuery, CooperationStatusQuery, CreateCooperationRequest,
    ReviewCooperationRequest,
};
use super::services;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/cooperations", get(list::<S>).post(create::<S>))
        .route("/cooperations/status", get(status::<S>))
        .route("/cooperations/:id", get(detail::<S>))
        .route("/cooperations/:id/approve", post(approve::<S>))
        .route("/cooperations/:id/reject", post(reject::<S>))
        .route("/cooperations/:id/terminate", post(terminate::<S>))
}

async fn create<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Json(body): Json<CreateCooperationRequest>,
) -> Result<Json<CooperationRelation>> {
    let relation = services::create_request(
        state.store.as_ref(),
        &state.config,
        &caller,
        body.to_agency_id,
        body.request_message,
    )
    .await?;
    Ok(Json(relation))
}

async fn list<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Query(query): Query<CooperationListQuery>,
) -> Result<Json<Vec<CooperationRelation>>> {
    let page = Pagination::new(query.skip, query.limit, state.config.page_limit_max);
    let items =
        services::list_cooperations(state.store.as_ref(), &caller, query.filter(), page).await?;
    Ok(Json(items))
}

async fn detail<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<CooperationRelation>> {
    services::get_cooperation(state.store.as_ref(), &caller, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn status<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Query(query): Query<CooperationStatusQuery>,
) -> Result<Json<Value>> {
    let status =
        services::check_status(state.store.as_ref(), caller.agency_id, query.to_agency_id).await?;
    Ok(Json(json!({
        "from_agency_id": caller.agency_id,
        "to_agency_id": query.to_agency_id,
        "status": status,
    })))
}

async fn approve<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
    body: Option<Json<ReviewCooperationRequest>>,
) -> Result<Json<CooperationRelation>> {
    let message = body.and_then(|Json(b)| b.response_message);
    services::approve(state.store.as_ref(), &caller, id, message)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn reject<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
    body: Option<Json<ReviewCooperationRequest>>,
) -> Result<Json<CooperationRelation>> {
    let message = body.and_then(|Json(b)| b.response_message);
    services::reject(state.store.as_ref(), &caller, id, message)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn terminate<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<CooperationRelation>> {
    services::terminate(state.store.as_ref(), &caller, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}
