//! Import task service functions.
//!
//! Task lifecycle: `uploaded -> parsed -> confirmed`, or `-> failed` when the
//! extraction worker reports a failure. Only the result is handled here;
//! running the extraction provider is somebody else's job.

use chrono::{NaiveDate, Utc};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit;
use crate::catalog::{self, requests::CreateSkuRequest};
use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::models::{ExtractionOutcome, ImportStatus, ImportTask, Sku, SkuAttrs, SkuType};
use crate::store::{Pagination, Store};

pub const DEFAULT_SKU_NAME: &str = "Unnamed SKU";
pub const DEFAULT_ADDRESS: &str = "Address not specified";

/// Register raw input for extraction. The task starts as `uploaded`.
pub async fn create_import_task<S: Store>(
    store: &S,
    caller: &Identity,
    input_text: Option<String>,
    input_files: Vec<String>,
) -> Result<ImportTask> {
    let has_text = input_text.as_deref().is_some_and(|t| !t.trim().is_empty());
    if !has_text && input_files.is_empty() {
        return Err(AppError::validation(
            "an import needs input_text or at least one input file",
        ));
    }

    let now = Utc::now();
    let task = ImportTask {
        id: Uuid::new_v4(),
        agency_id: caller.agency_id,
        user_id: caller.user_id,
        status: ImportStatus::Uploaded,
        input_text,
        input_files,
        sku_type: None,
        extracted_fields: None,
        confidence: None,
        evidence: None,
        error_message: None,
        created_sku_id: None,
        created_at: now,
        updated_at: now,
    };
    let task = store.insert_import_task(task).await?;
    info!(task_id = %task.id, agency_id = %task.agency_id, "Import task created");

    audit::record(
        store,
        caller,
        "import.create",
        "import_task",
        task.id,
        None,
        Some(json!({"status": task.status})),
    )
    .await;

    Ok(task)
}

pub async fn get_import_task<S: Store>(
    store: &S,
    caller: &Identity,
    task_id: Uuid,
) -> Result<Option<ImportTask>> {
    store.get_import_task(caller.agency_id, task_id).await
}

/// Newest first
pub async fn list_import_tasks<S: Store>(
    store: &S,
    caller: &Identity,
    status: Option<ImportStatus>,
    page: Pagination,
) -> Result<Vec<ImportTask>> {
    store.list_import_tasks(caller.agency_id, status, page).await
}

/// Store what the extraction worker produced.
///
/// A field map moves the task to `parsed`; a failure marker moves it to the
/// terminal `failed` state with the reason kept in `error_message`. Tasks
/// past extraction are left alone (`Ok(None)`).
pub async fn record_extraction<S: Store>(
    store: &S,
    caller: &Identity,
    task_id: Uuid,
    outcome: ExtractionOutcome,
) -> Result<Option<ImportTask>> {
    let Some(current) = store.get_import_task(caller.agency_id, task_id).await? else {
        return Ok(None);
    };
    if !current.status.awaits_extraction() {
        return Ok(None);
    }

    let mut next = current.clone();
    next.updated_at = Utc::now();
    match outcome {
        ExtractionOutcome::Parsed(result) => {
            next.status = ImportStatus::Parsed;
            next.sku_type = result.sku_type;
            next.extracted_fields = Some(result.extracted_fields);
            next.confidence = Some(result.confidence);
            next.evidence = Some(result.evidence);
            next.error_message = None;
        }
        ExtractionOutcome::Failed { reason } => {
            warn!(%task_id, %reason, "Extraction failed");
            next.status = ImportStatus::Failed;
            next.error_message = Some(reason);
        }
    }

    let Some(saved) = store.transition_import_task(&next, current.status).await? else {
        return Ok(None);
    };
    info!(%task_id, status = %saved.status, "Extraction recorded");

    audit::record(
        store,
        caller,
        "import.record_extraction",
        "import_task",
        task_id,
        Some(json!({"status": current.status})),
        Some(json!({"status": saved.status, "error_message": saved.error_message})),
    )
    .await;

    Ok(Some(saved))
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn date_field(fields: &Map<String, Value>, key: &str) -> Option<NaiveDate> {
    text_field(fields, key).and_then(|s| s.parse().ok())
}

/// Turn reviewed extraction fields into a catalog request.
///
/// The whole map doubles as the attribute payload; keys the type schema
/// does not know are dropped when it is parsed. A hotel without an address
/// gets one derived from `destination_city`.
pub fn sku_request_from_fields(sku_type: SkuType, fields: &Map<String, Value>) -> CreateSkuRequest {
    let mut attrs = Value::Object(fields.clone());
    if sku_type == SkuType::Hotel {
        let fallback = text_field(fields, "destination_city");
        SkuAttrs::set_address_if_missing(&mut attrs, fallback.as_deref().unwrap_or(DEFAULT_ADDRESS));
    }

    let name = text_field(fields, "sku_name").unwrap_or_else(|| DEFAULT_SKU_NAME.to_string());
    let mut request = CreateSkuRequest::new(name, sku_type, attrs);
    request.supplier_id = text_field(fields, "supplier_id");
    request.supplier_name = text_field(fields, "supplier_name");
    request.destination_country = text_field(fields, "destination_country");
    request.destination_city = text_field(fields, "destination_city");
    request.tags = fields
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    request.valid_from = date_field(fields, "valid_from");
    request.valid_to = date_field(fields, "valid_to");
    request.booking_advance = fields
        .get("booking_advance")
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok());
    request.description = text_field(fields, "description");
    request
}

/// Create a private SKU from a parsed task.
///
/// The task is claimed (`parsed -> confirmed`) before the SKU is written so
/// a task yields at most one SKU; if the SKU is rejected the claim is
/// rolled back and the SKU error returned. Once the SKU exists it is
/// returned even when linking it on the task fails.
pub async fn confirm_import<S: Store>(
    store: &S,
    caller: &Identity,
    task_id: Uuid,
    sku_type: SkuType,
    extracted_fields: Map<String, Value>,
) -> Result<Option<Sku>> {
    let Some(current) = store.get_import_task(caller.agency_id, task_id).await? else {
        return Ok(None);
    };
    if current.status != ImportStatus::Parsed {
        return Ok(None);
    }

    let mut claimed = current.clone();
    claimed.status = ImportStatus::Confirmed;
    claimed.sku_type = Some(sku_type);
    claimed.extracted_fields = Some(extracted_fields.clone());
    claimed.updated_at = Utc::now();
    let Some(claimed) = store
        .transition_import_task(&claimed, ImportStatus::Parsed)
        .await?
    else {
        return Ok(None);
    };

    let request = sku_request_from_fields(sku_type, &extracted_fields);
    let sku = match catalog::create_sku(store, caller, request).await {
        Ok(sku) => sku,
        Err(e) => {
            let mut reverted = current.clone();
            reverted.updated_at = Utc::now();
            match store
                .transition_import_task(&reverted, ImportStatus::Confirmed)
                .await
            {
                Ok(Some(_)) => {}
                Ok(None) => warn!(%task_id, "Import task left its claim before release"),
                Err(revert) => {
                    warn!(%task_id, error = %revert, "Failed to release import task")
                }
            }
            return Err(e);
        }
    };

    let mut done = claimed;
    done.created_sku_id = Some(sku.id);
    done.updated_at = Utc::now();
    match store
        .transition_import_task(&done, ImportStatus::Confirmed)
        .await
    {
        Ok(Some(_)) => info!(%task_id, sku_id = %sku.id, "Import confirmed"),
        Ok(None) => {
            warn!(%task_id, sku_id = %sku.id, "Import task changed before the SKU link was recorded")
        }
        Err(e) => {
            warn!(%task_id, sku_id = %sku.id, error = %e, "Failed to record created SKU on import task")
        }
    }

    audit::record(
        store,
        caller,
        "import.confirm",
        "import_task",
        task_id,
        None,
        Some(json!({"created_sku_id": sku.id})),
    )
    .await;

    Ok(Some(sku))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionResult;
    use crate::store::{FaultyStore, MemoryStore, SkuStore};

    fn identity() -> Identity {
        Identity::new(Uuid::new_v4(), Uuid::new_v4())
    }

    fn parsed(fields: Value) -> ExtractionOutcome {
        ExtractionOutcome::Parsed(ExtractionResult {
            sku_type: Some(SkuType::Hotel),
            category: None,
            extracted_fields: fields.as_object().cloned().unwrap_or_default(),
            confidence: json!(0.9),
            evidence: Value::Null,
        })
    }

    fn hotel_fields() -> Map<String, Value> {
        json!({
            "sku_name": "Riverside Hotel",
            "hotel_name": "Riverside",
            "room_type_name": "Queen",
            "destination_city": "Guilin",
            "daily_sell_price": 520,
            "tags": ["river", "family"],
            "valid_from": "2025-01-01"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_needs_input() {
        let store = MemoryStore::new();
        let err = create_import_task(&store, &identity(), Some("  ".into()), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_confirm_creates_hotel_with_derived_address() {
        let store = MemoryStore::new();
        let me = identity();
        let task = create_import_task(&store, &me, Some("Riverside Hotel...".into()), vec![])
            .await
            .unwrap();
        assert_eq!(task.status, ImportStatus::Uploaded);

        // Not parsed yet
        assert!(confirm_import(&store, &me, task.id, SkuType::Hotel, hotel_fields())
            .await
            .unwrap()
            .is_none());

        record_extraction(&store, &me, task.id, parsed(Value::Object(hotel_fields())))
            .await
            .unwrap()
            .unwrap();
        let sku = confirm_import(&store, &me, task.id, SkuType::Hotel, hotel_fields())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sku.sku_name, "Riverside Hotel");
        assert_eq!(sku.destination_city.as_deref(), Some("Guilin"));
        assert_eq!(sku.tags, vec!["river", "family"]);
        assert_eq!(sku.valid_from, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(sku.attrs.to_value()["address"], json!("Guilin"));

        let task = get_import_task(&store, &me, task.id).await.unwrap().unwrap();
        assert_eq!(task.status, ImportStatus::Confirmed);
        assert_eq!(task.created_sku_id, Some(sku.id));

        // A task yields one SKU
        assert!(confirm_import(&store, &me, task.id, SkuType::Hotel, hotel_fields())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_failed_extraction_is_terminal() {
        let store = MemoryStore::new();
        let me = identity();
        let task = create_import_task(&store, &me, None, vec!["menu.pdf".into()])
            .await
            .unwrap();

        let failed = record_extraction(
            &store,
            &me,
            task.id,
            ExtractionOutcome::Failed {
                reason: "provider timeout".into(),
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(failed.status, ImportStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("provider timeout"));

        assert!(record_extraction(&store, &me, task.id, parsed(json!({})))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_rejected_confirm_leaves_task_parsed() {
        let store = MemoryStore::new();
        let me = identity();
        let task = create_import_task(&store, &me, Some("text".into()), vec![])
            .await
            .unwrap();
        record_extraction(&store, &me, task.id, parsed(json!({})))
            .await
            .unwrap()
            .unwrap();

        // Car attrs miss every required field
        let err = confirm_import(&store, &me, task.id, SkuType::Car, Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let task = get_import_task(&store, &me, task.id).await.unwrap().unwrap();
        assert_eq!(task.status, ImportStatus::Parsed);
        assert!(task.created_sku_id.is_none());
    }

    #[tokio::test]
    async fn test_release_failure_keeps_the_sku_error() {
        let store = FaultyStore {
            fail_import_transition_from: Some(ImportStatus::Confirmed),
            ..FaultyStore::new()
        };
        let me = identity();
        let task = create_import_task(&store, &me, Some("text".into()), vec![])
            .await
            .unwrap();
        record_extraction(&store, &me, task.id, parsed(json!({})))
            .await
            .unwrap()
            .unwrap();

        let err = confirm_import(&store, &me, task.id, SkuType::Car, Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unrecorded_link_still_returns_the_sku() {
        let store = FaultyStore {
            miss_import_transition_from: Some(ImportStatus::Confirmed),
            ..FaultyStore::new()
        };
        let me = identity();
        let task = create_import_task(&store, &me, Some("Riverside Hotel...".into()), vec![])
            .await
            .unwrap();
        record_extraction(&store, &me, task.id, parsed(Value::Object(hotel_fields())))
            .await
            .unwrap()
            .unwrap();

        let sku = confirm_import(&store, &me, task.id, SkuType::Hotel, hotel_fields())
            .await
            .unwrap()
            .unwrap();
        assert!(store.get_sku(me.agency_id, sku.id).await.unwrap().is_some());

        let task = get_import_task(&store, &me, task.id).await.unwrap().unwrap();
        assert_eq!(task.status, ImportStatus::Confirmed);
        assert!(task.created_sku_id.is_none());
    }

    #[test]
    fn test_unnamed_default() {
        let request = sku_request_from_fields(SkuType::Activity, &Map::new());
        assert_eq!(request.sku_name, DEFAULT_SKU_NAME);
    }
}
