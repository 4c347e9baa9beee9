//! Response DTOs for catalog endpoints.

use serde::Serialize;

use super::services::BatchItemOutcome;

/// Batch summary plus the per-item outcomes in request order
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub requested: usize,
    pub applied: usize,
    pub items: Vec<BatchItemOutcome>,
}

impl From<Vec<BatchItemOutcome>> for BatchResponse {
    fn from(items: Vec<BatchItemOutcome>) -> Self {
        Self {
            requested: items.len(),
            applied: items.iter().filter(|i| i.is_applied()).count(),
            items,
        }
    }
}
