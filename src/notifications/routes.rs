//! Notification route handlers

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::error::Result;
use crate::identity::Identity;
use crate::models::Notification;
use crate::store::{Pagination, Store};
use crate::AppState;

use super::requests::{MarkReadRequest, NotificationListQuery};
use super::services;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/notifications", get(list::<S>))
        .route("/notifications/read", post(mark_read::<S>))
        .route("/notifications/unread-count", get(unread_count::<S>))
}

async fn list<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<Vec<Notification>>> {
    let page = Pagination::new(query.skip, query.limit, state.config.page_limit_max);
    let items =
        services::list_notifications(state.store.as_ref(), &caller, query.filter(), page).await?;
    Ok(Json(items))
}

async fn mark_read<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
    Json(body): Json<MarkReadRequest>,
) -> Result<Json<Value>> {
    let updated = services::mark_as_read(state.store.as_ref(), &caller, &body.ids).await?;
    Ok(Json(json!({ "updated": updated })))
}

async fn unread_count<S: Store>(
    State(state): State<AppState<S>>,
    caller: Identity,
) -> Result<Json<Value>> {
    let count = services::unread_count(state.store.as_ref(), &caller).await?;
    Ok(Json(json!({ "count": count })))
}
