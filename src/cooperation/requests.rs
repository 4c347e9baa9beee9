//! Request DTOs for cooperation endpoints.

use serde::Deserialize;
use uuid::Uuid;

use crate::models::{CooperationRole, CooperationStatus};
use crate::store::CooperationFilter;

#[derive(Debug, Deserialize)]
pub struct CreateCooperationRequest {
    pub to_agency_id: Uuid,
    #[serde(default)]
    pub request_message: Option<String>,
}

/// Body of approve / reject
#[derive(Debug, Default, Deserialize)]
pub struct ReviewCooperationRequest {
    #[serde(default)]
    pub response_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CooperationListQuery {
    #[serde(default)]
    pub role: Option<CooperationRole>,
    #[serde(default)]
    pub status: Option<CooperationStatus>,
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl CooperationListQuery {
    pub fn filter(&self) -> CooperationFilter {
        CooperationFilter {
            role: self.role,
            status: self.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CooperationStatusQuery {
    /// Provider side of the pair; the caller is the requester
    pub to_agency_id: Uuid,
}
