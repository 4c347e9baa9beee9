//! AI import task model.
//!
//! The extraction provider runs elsewhere; this side only stores its result
//! (or its failure) and turns a confirmed result into a catalog entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::sku::SkuType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Created,
    Uploaded,
    Parsing,
    Parsed,
    Confirmed,
    Failed,
}

text_enum!(ImportStatus {
    Created => "created",
    Uploaded => "uploaded",
    Parsing => "parsing",
    Parsed => "parsed",
    Confirmed => "confirmed",
    Failed => "failed",
});

impl ImportStatus {
    /// States in which an extraction result may still be recorded
    pub fn awaits_extraction(&self) -> bool {
        matches!(
            self,
            ImportStatus::Created | ImportStatus::Uploaded | ImportStatus::Parsing
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportTask {
    pub id: Uuid,
    pub agency_id: Uuid,
    pub user_id: Uuid,
    pub status: ImportStatus,
    pub input_text: Option<String>,
    pub input_files: Vec<String>,
    pub sku_type: Option<SkuType>,
    pub extracted_fields: Option<serde_json::Map<String, serde_json::Value>>,
    pub confidence: Option<serde_json::Value>,
    pub evidence: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_sku_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Structured output of the extraction provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub sku_type: Option<SkuType>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub extracted_fields: serde_json::Map<String, serde_json::Value>,
    /// Either an overall score or per-field scores
    #[serde(default)]
    pub confidence: serde_json::Value,
    #[serde(default)]
    pub evidence: serde_json::Value,
}

/// What the extraction worker hands back: a field map or a failure marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Parsed(ExtractionResult),
    Failed { reason: String },
}
