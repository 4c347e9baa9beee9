//! HTTP surface: one router per domain area merged under a shared state.

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::store::Store;
use crate::{catalog, cooperation, imports, library, notifications, pricing, AppState};

/// Full application router with tracing and CORS layers
pub fn app<S: Store>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(catalog::router::<S>())
        .merge(pricing::router::<S>())
        .merge(library::router::<S>())
        .merge(cooperation::router::<S>())
        .merge(notifications::router::<S>())
        .merge(imports::router::<S>())
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
