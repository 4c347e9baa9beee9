//! Import route handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::models::{ExtractionOutcome, ImportTask, Sku};
use crate::store::{Pagination, Store};
use crate::AppState;

use super::requests::{ConfirmImportRequest, CreateImportRequest, ImportListQuery};
use super::services;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/imports", get(list::<S>).post(create::<S>))
        .route("/imports/:id", get(detail::<S>))
        .route("/imports/:id/extraction", post(record_extraction::<S>))
        .route("/imports/:id/confirm", post(confirm::<S>))
}

async fn create<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Json(body): Json<CreateImportRequest>,
) -> Result<(StatusCode, Json<ImportTask>)> {
    let task =
        services::create_import_task(state.store.as_ref(), &caller, body.input_text, body.input_files)
            .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn list<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Query(query): Query<ImportListQuery>,
) -> Result<Json<Vec<ImportTask>>> {
    let page = Pagination::new(query.skip, query.limit, state.config.page_limit_max);
    let items =
        services::list_import_tasks(state.store.as_ref(), &caller, query.status, page).await?;
    Ok(Json(items))
}

async fn detail<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<ImportTask>> {
    services::get_import_task(state.store.as_ref(), &caller, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn record_extraction<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
    Json(body): Json<ExtractionOutcome>,
) -> Result<Json<ImportTask>> {
    services::record_extraction(state.store.as_ref(), &caller, id, body)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn confirm<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Path(id): Path<Uuid>,
    Json(body): Json<ConfirmImportRequest>,
) -> Result<(StatusCode, Json<Sku>)> {
    services::confirm_import(
        state.store.as_ref(),
        &caller,
        id,
        body.sku_type,
        body.extracted_fields,
    )
    .await?
    .map(|sku| (StatusCode::CREATED, Json(sku)))
    .ok_or(AppError::NotFound)
}
