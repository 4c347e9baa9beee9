//! HTTP contract checks against the in-memory store.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use tfrm_backend::identity::{AGENCY_HEADER, USER_HEADER};
use tfrm_backend::routes;
use tfrm_backend::store::MemoryStore;
use tfrm_backend::{AppConfig, AppState};

fn app() -> Router {
    routes::app(AppState::new(MemoryStore::new(), AppConfig::default()))
}

struct Caller {
    agency_id: Uuid,
    user_id: Uuid,
}

impl Caller {
    fn new() -> Self {
        Self {
            agency_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        }
    }

    fn request(&self, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(AGENCY_HEADER, self.agency_id.to_string())
            .header(USER_HEADER, self.user_id.to_string());
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

#[tokio::test]
async fn health_needs_no_identity() {
    let app = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let app = app();
    let request = Request::builder().uri("/skus").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_type"], "unauthorized");
}

#[tokio::test]
async fn copy_gate_over_http() {
    let app = app();
    let provider = Caller::new();
    let partner = Caller::new();

    let (status, sku) = send(
        &app,
        provider.request(
            "POST",
            "/skus",
            Some(json!({
                "sku_name": "Old Town Walk",
                "sku_type": "guide",
                "base_sale_price": "600",
                "attrs": {
                    "guide_name": "Li Wei",
                    "languages": ["en", "zh"],
                    "daily_cost_price": 400,
                    "daily_sell_price": 600
                }
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{sku}");
    let sku_id = sku["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        provider.request("POST", &format!("/skus/{sku_id}/publish"), Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let copy_uri = format!("/public/skus/{sku_id}/copy");
    let (status, _) = send(&app, partner.request("POST", &copy_uri, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, relation) = send(
        &app,
        partner.request(
            "POST",
            "/cooperations",
            Some(json!({ "to_agency_id": provider.agency_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let relation_id = relation["id"].as_str().unwrap().to_string();

    let (status, approved) = send(
        &app,
        provider.request("POST", &format!("/cooperations/{relation_id}/approve"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let (status, copy) = send(&app, partner.request("POST", &copy_uri, None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(copy["source_org_id"], json!(provider.agency_id));

    let (status, _) = send(&app, partner.request("POST", &copy_uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
