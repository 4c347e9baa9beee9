//! Request DTOs for import endpoints.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::{ImportStatus, SkuType};

#[derive(Debug, Deserialize)]
pub struct CreateImportRequest {
    #[serde(default)]
    pub input_text: Option<String>,
    #[serde(default)]
    pub input_files: Vec<String>,
}

/// Reviewed fields submitted for SKU creation
#[derive(Debug, Deserialize)]
pub struct ConfirmImportRequest {
    pub sku_type: SkuType,
    pub extracted_fields: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportListQuery {
    #[serde(default)]
    pub status: Option<ImportStatus>,
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}
