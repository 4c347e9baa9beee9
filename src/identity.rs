//! Caller identity.
//!
//! Authentication happens upstream; the `(agency_id, user_id)` pair arrives
//! already trusted in the `x-agency-id` / `x-user-id` headers.

use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

pub const AGENCY_HEADER: &str = "x-agency-id";
pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub agency_id: Uuid,
    pub user_id: Uuid,
}

impl Identity {
    pub fn new(agency_id: Uuid, user_id: Uuid) -> Self {
        Self { agency_id, user_id }
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        Ok(Self {
            agency_id: uuid_header(headers, AGENCY_HEADER)?,
            user_id: uuid_header(headers, USER_HEADER)?,
        })
    }
}

fn uuid_header(headers: &HeaderMap, name: &str) -> Result<Uuid, AppError> {
    let raw = headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("missing {} header", name)))?;

    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Unauthorized(format!("{} is not a valid id", name)))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Identity::from_headers(&parts.headers)
    }
}
