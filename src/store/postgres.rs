//! Postgres store.
//!
//! Enum columns are TEXT; JSON-shaped fields are JSONB decoded through
//! `sqlx::types::Json`. Rows are read into private `*Row` structs and then
//! converted, so a corrupt row surfaces as `AppError::Internal`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, PgExecutor, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

use super::{
    AuditStore, CooperationFilter, CooperationStore, FactorStore, ImportTaskStore,
    NotificationFilter, NotificationStore, Pagination, PublicSkuFilter, SkuFilter, SkuStore,
};
use crate::error::{AppError, Result};
use crate::models::{
    AuditLogEntry, CooperationRelation, CooperationRole, CooperationStatus, ImportStatus,
    ImportTask, Notification, PriceCalendar, PriceRule, PricingFactor, Sku, SkuAttrs, SkuType,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Apply pending migrations from `./migrations`
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Parse a TEXT enum column
fn decode<T>(column: &str, value: &str) -> Result<T>
where
    T: FromStr<Err = AppError>,
{
    value
        .parse()
        .map_err(|_| AppError::Internal(format!("unexpected {} '{}' in database", column, value)))
}

// ---------------------------------------------------------------------------
// skus
// ---------------------------------------------------------------------------

const SKU_COLUMNS: &str = r#"
    id, agency_id, product_id, sku_name, sku_type, category, status,
    owner_type, is_public, public_status, visibility_scope, partner_whitelist,
    source_org_id, source_sku_id, applied_factor_id,
    supplier_id, supplier_name, destination_country, destination_city, tags,
    valid_from, valid_to, booking_advance, description,
    highlights, inclusions, exclusions, cancellation_policy,
    price_mode, base_cost_price, base_sale_price, calendar_prices, price_rules,
    attrs, media, created_by, created_at, updated_at
"#;

#[derive(Debug, FromRow)]
struct SkuRow {
    id: Uuid,
    agency_id: Uuid,
    product_id: Option<Uuid>,
    sku_name: String,
    sku_type: String,
    category: String,
    status: String,
    owner_type: String,
    is_public: bool,
    public_status: String,
    visibility_scope: String,
    partner_whitelist: Vec<Uuid>,
    source_org_id: Option<Uuid>,
    source_sku_id: Option<Uuid>,
    applied_factor_id: Option<Uuid>,
    supplier_id: Option<String>,
    supplier_name: Option<String>,
    destination_country: Option<String>,
    destination_city: Option<String>,
    tags: Vec<String>,
    valid_from: Option<NaiveDate>,
    valid_to: Option<NaiveDate>,
    booking_advance: Option<i32>,
    description: Option<String>,
    highlights: Vec<String>,
    inclusions: Vec<String>,
    exclusions: Vec<String>,
    cancellation_policy: Option<String>,
    price_mode: String,
    base_cost_price: Option<Decimal>,
    base_sale_price: Option<Decimal>,
    calendar_prices: Json<PriceCalendar>,
    price_rules: Json<Vec<PriceRule>>,
    attrs: serde_json::Value,
    media: Json<Vec<BTreeMap<String, String>>>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SkuRow> for Sku {
    type Error = AppError;

    fn try_from(row: SkuRow) -> Result<Self> {
        let sku_type: SkuType = decode("sku_type", &row.sku_type)?;
        let attrs = SkuAttrs::parse(sku_type, row.attrs).map_err(|e| {
            AppError::Internal(format!("stored attrs of sku {} are invalid: {}", row.id, e))
        })?;

        Ok(Sku {
            id: row.id,
            agency_id: row.agency_id,
            product_id: row.product_id,
            sku_name: row.sku_name,
            sku_type,
            category: decode("category", &row.category)?,
            status: decode("status", &row.status)?,
            owner_type: decode("owner_type", &row.owner_type)?,
            is_public: row.is_public,
            public_status: decode("public_status", &row.public_status)?,
            visibility_scope: decode("visibility_scope", &row.visibility_scope)?,
            partner_whitelist: row.partner_whitelist,
            source_org_id: row.source_org_id,
            source_sku_id: row.source_sku_id,
            applied_factor_id: row.applied_factor_id,
            supplier_id: row.supplier_id,
            supplier_name: row.supplier_name,
            destination_country: row.destination_country,
            destination_city: row.destination_city,
            tags: row.tags,
            valid_from: row.valid_from,
            valid_to: row.valid_to,
            booking_advance: row.booking_advance,
            description: row.description,
            highlights: row.highlights,
            inclusions: row.inclusions,
            exclusions: row.exclusions,
            cancellation_policy: row.cancellation_policy,
            price_mode: decode("price_mode", &row.price_mode)?,
            base_cost_price: row.base_cost_price,
            base_sale_price: row.base_sale_price,
            calendar_prices: row.calendar_prices.0,
            price_rules: row.price_rules.0,
            attrs,
            media: row.media.0,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn rows_to_skus(rows: Vec<SkuRow>) -> Result<Vec<Sku>> {
    rows.into_iter().map(Sku::try_from).collect()
}

async fn insert_sku_row<'e, E>(executor: E, sku: &Sku) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO skus (
            id, agency_id, product_id, sku_name, sku_type, category, status,
            owner_type, is_public, public_status, visibility_scope, partner_whitelist,
            source_org_id, source_sku_id, applied_factor_id,
            supplier_id, supplier_name, destination_country, destination_city, tags,
            valid_from, valid_to, booking_advance, description,
            highlights, inclusions, exclusions, cancellation_policy,
            price_mode, base_cost_price, base_sale_price, calendar_prices, price_rules,
            attrs, media, created_by, created_at, updated_at
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7,
            $8, $9, $10, $11, $12,
            $13, $14, $15,
            $16, $17, $18, $19, $20,
            $21, $22, $23, $24,
            $25, $26, $27, $28,
            $29, $30, $31, $32, $33,
            $34, $35, $36, $37, $38
        )
        "#,
    )
    .bind(sku.id)
    .bind(sku.agency_id)
    .bind(sku.product_id)
    .bind(&sku.sku_name)
    .bind(sku.sku_type.as_str())
    .bind(sku.category.as_str())
    .bind(sku.status.as_str())
    .bind(sku.owner_type.as_str())
    .bind(sku.is_public)
    .bind(sku.public_status.as_str())
    .bind(sku.visibility_scope.as_str())
    .bind(sku.partner_whitelist.as_slice())
    .bind(sku.source_org_id)
    .bind(sku.source_sku_id)
    .bind(sku.applied_factor_id)
    .bind(&sku.supplier_id)
    .bind(&sku.supplier_name)
    .bind(&sku.destination_country)
    .bind(&sku.destination_city)
    .bind(sku.tags.as_slice())
    .bind(sku.valid_from)
    .bind(sku.valid_to)
    .bind(sku.booking_advance)
    .bind(&sku.description)
    .bind(sku.highlights.as_slice())
    .bind(sku.inclusions.as_slice())
    .bind(sku.exclusions.as_slice())
    .bind(&sku.cancellation_policy)
    .bind(sku.price_mode.as_str())
    .bind(sku.base_cost_price)
    .bind(sku.base_sale_price)
    .bind(Json(&sku.calendar_prices))
    .bind(Json(&sku.price_rules))
    .bind(sku.attrs.to_value())
    .bind(Json(&sku.media))
    .bind(sku.created_by)
    .bind(sku.created_at)
    .bind(sku.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

impl SkuStore for PgStore {
    async fn insert_sku(&self, sku: Sku) -> Result<Sku> {
        insert_sku_row(&self.pool, &sku).await?;
        Ok(sku)
    }

    async fn get_sku(&self, agency_id: Uuid, id: Uuid) -> Result<Option<Sku>> {
        let sql = format!("SELECT {SKU_COLUMNS} FROM skus WHERE id = $1 AND agency_id = $2");
        let row = sqlx::query_as::<_, SkuRow>(&sql)
            .bind(id)
            .bind(agency_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Sku::try_from).transpose()
    }

    async fn get_public_sku(&self, id: Uuid) -> Result<Option<Sku>> {
        let sql = format!(
            "SELECT {SKU_COLUMNS} FROM skus WHERE id = $1 AND (is_public OR owner_type = 'public')"
        );
        let row = sqlx::query_as::<_, SkuRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Sku::try_from).transpose()
    }

    async fn update_sku(&self, sku: &Sku) -> Result<Option<Sku>> {
        let sql = format!(
            r#"
            UPDATE skus SET
                product_id = $3, sku_name = $4, category = $5, status = $6,
                supplier_id = $7, supplier_name = $8,
                destination_country = $9, destination_city = $10, tags = $11,
                valid_from = $12, valid_to = $13, booking_advance = $14, description = $15,
                highlights = $16, inclusions = $17, exclusions = $18, cancellation_policy = $19,
                price_mode = $20, base_cost_price = $21, base_sale_price = $22,
                calendar_prices = $23, price_rules = $24,
                attrs = $25, media = $26, updated_at = $27
            WHERE id = $1 AND agency_id = $2
            RETURNING {SKU_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, SkuRow>(&sql)
            .bind(sku.id)
            .bind(sku.agency_id)
            .bind(sku.product_id)
            .bind(&sku.sku_name)
            .bind(sku.category.as_str())
            .bind(sku.status.as_str())
            .bind(&sku.supplier_id)
            .bind(&sku.supplier_name)
            .bind(&sku.destination_country)
            .bind(&sku.destination_city)
            .bind(sku.tags.as_slice())
            .bind(sku.valid_from)
            .bind(sku.valid_to)
            .bind(sku.booking_advance)
            .bind(&sku.description)
            .bind(sku.highlights.as_slice())
            .bind(sku.inclusions.as_slice())
            .bind(sku.exclusions.as_slice())
            .bind(&sku.cancellation_policy)
            .bind(sku.price_mode.as_str())
            .bind(sku.base_cost_price)
            .bind(sku.base_sale_price)
            .bind(Json(&sku.calendar_prices))
            .bind(Json(&sku.price_rules))
            .bind(sku.attrs.to_value())
            .bind(Json(&sku.media))
            .bind(sku.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Sku::try_from).transpose()
    }

    async fn update_sku_visibility(&self, sku: &Sku) -> Result<Option<Sku>> {
        let sql = format!(
            r#"
            UPDATE skus SET
                owner_type = $3, is_public = $4, public_status = $5,
                visibility_scope = $6, partner_whitelist = $7, updated_at = $8
            WHERE id = $1 AND agency_id = $2
            RETURNING {SKU_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, SkuRow>(&sql)
            .bind(sku.id)
            .bind(sku.agency_id)
            .bind(sku.owner_type.as_str())
            .bind(sku.is_public)
            .bind(sku.public_status.as_str())
            .bind(sku.visibility_scope.as_str())
            .bind(sku.partner_whitelist.as_slice())
            .bind(sku.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Sku::try_from).transpose()
    }

    async fn delete_sku(&self, agency_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM skus WHERE id = $1 AND agency_id = $2")
            .bind(id)
            .bind(agency_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_skus(
        &self,
        agency_id: Uuid,
        filter: &SkuFilter,
        page: Pagination,
    ) -> Result<Vec<Sku>> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {SKU_COLUMNS} FROM skus WHERE agency_id = "));
        qb.push_bind(agency_id);

        if let Some(sku_type) = filter.sku_type {
            qb.push(" AND sku_type = ").push_bind(sku_type.as_str());
        }
        if let Some(city) = &filter.city {
            qb.push(" AND destination_city = ").push_bind(city.clone());
        }
        if !filter.tags.is_empty() {
            qb.push(" AND tags && ").push_bind(filter.tags.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(owner_type) = filter.owner_type {
            qb.push(" AND owner_type = ").push_bind(owner_type.as_str());
        }
        if let Some(keyword) = &filter.keyword {
            qb.push(" AND sku_name ILIKE ").push_bind(format!("%{}%", keyword));
        }

        qb.push(" ORDER BY updated_at DESC, created_at DESC OFFSET ")
            .push_bind(page.skip)
            .push(" LIMIT ")
            .push_bind(page.limit);

        let rows = qb.build_query_as::<SkuRow>().fetch_all(&self.pool).await?;
        rows_to_skus(rows)
    }

    async fn list_public_skus(
        &self,
        filter: &PublicSkuFilter,
        page: Pagination,
    ) -> Result<Vec<Sku>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SKU_COLUMNS} FROM skus \
             WHERE (is_public OR owner_type = 'public') AND public_status <> 'removed'"
        ));

        if let Some(city) = &filter.city {
            qb.push(" AND destination_city = ").push_bind(city.clone());
        }
        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category.as_str());
        }
        if !filter.tags.is_empty() {
            qb.push(" AND tags && ").push_bind(filter.tags.clone());
        }
        if let Some(keyword) = &filter.keyword {
            qb.push(" AND sku_name ILIKE ").push_bind(format!("%{}%", keyword));
        }

        qb.push(" ORDER BY updated_at DESC, created_at DESC OFFSET ")
            .push_bind(page.skip)
            .push(" LIMIT ")
            .push_bind(page.limit);

        let rows = qb.build_query_as::<SkuRow>().fetch_all(&self.pool).await?;
        rows_to_skus(rows)
    }

    async fn list_derived_skus(&self, source_sku_id: Uuid) -> Result<Vec<Sku>> {
        let sql = format!("SELECT {SKU_COLUMNS} FROM skus WHERE source_sku_id = $1 ORDER BY created_at");
        let rows = sqlx::query_as::<_, SkuRow>(&sql)
            .bind(source_sku_id)
            .fetch_all(&self.pool)
            .await?;

        rows_to_skus(rows)
    }

    async fn claim_published_sku<F>(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        build_copy: F,
    ) -> Result<Option<Sku>>
    where
        F: FnOnce(&Sku) -> Sku + Send,
    {
        let mut tx = self.pool.begin().await?;

        // The WHERE clause is the compare-and-swap: a second caller matches zero rows
        let sql = format!(
            r#"
            UPDATE skus
            SET is_public = FALSE, public_status = 'removed', updated_at = $2
            WHERE id = $1 AND is_public AND public_status = 'published'
            RETURNING {SKU_COLUMNS}
            "#
        );
        let claimed = sqlx::query_as::<_, SkuRow>(&sql)
            .bind(id)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = claimed else {
            tx.rollback().await?;
            return Ok(None);
        };

        let origin = Sku::try_from(row)?;
        let copy = build_copy(&origin);
        insert_sku_row(&mut *tx, &copy).await?;
        tx.commit().await?;

        Ok(Some(copy))
    }
}

// ---------------------------------------------------------------------------
// pricing_factors
// ---------------------------------------------------------------------------

const FACTOR_COLUMNS: &str = r#"
    id, agency_id, name, apply_to_sku_types, apply_to_cities, apply_to_tags,
    apply_to_suppliers, multiply_factor, add_amount, priority,
    valid_from, valid_to, created_at, updated_at
"#;

#[derive(Debug, FromRow)]
struct FactorRow {
    id: Uuid,
    agency_id: Uuid,
    name: String,
    apply_to_sku_types: Vec<String>,
    apply_to_cities: Vec<String>,
    apply_to_tags: Vec<String>,
    apply_to_suppliers: Vec<String>,
    multiply_factor: Decimal,
    add_amount: Decimal,
    priority: i32,
    valid_from: Option<NaiveDate>,
    valid_to: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FactorRow> for PricingFactor {
    type Error = AppError;

    fn try_from(row: FactorRow) -> Result<Self> {
        let apply_to_sku_types = row
            .apply_to_sku_types
            .iter()
            .map(|t| decode("apply_to_sku_types", t))
            .collect::<Result<Vec<SkuType>>>()?;

        Ok(PricingFactor {
            id: row.id,
            agency_id: row.agency_id,
            name: row.name,
            apply_to_sku_types,
            apply_to_cities: row.apply_to_cities,
            apply_to_tags: row.apply_to_tags,
            apply_to_suppliers: row.apply_to_suppliers,
            multiply_factor: row.multiply_factor,
            add_amount: row.add_amount,
            priority: row.priority,
            valid_from: row.valid_from,
            valid_to: row.valid_to,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn sku_type_texts(types: &[SkuType]) -> Vec<String> {
    types.iter().map(|t| t.as_str().to_string()).collect()
}

impl FactorStore for PgStore {
    async fn insert_factor(&self, factor: PricingFactor) -> Result<PricingFactor> {
        sqlx::query(
            r#"
            INSERT INTO pricing_factors (
                id, agency_id, name, apply_to_sku_types, apply_to_cities, apply_to_tags,
                apply_to_suppliers, multiply_factor, add_amount, priority,
                valid_from, valid_to, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(factor.id)
        .bind(factor.agency_id)
        .bind(&factor.name)
        .bind(sku_type_texts(&factor.apply_to_sku_types))
        .bind(factor.apply_to_cities.as_slice())
        .bind(factor.apply_to_tags.as_slice())
        .bind(factor.apply_to_suppliers.as_slice())
        .bind(factor.multiply_factor)
        .bind(factor.add_amount)
        .bind(factor.priority)
        .bind(factor.valid_from)
        .bind(factor.valid_to)
        .bind(factor.created_at)
        .bind(factor.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(factor)
    }

    async fn get_factor(&self, agency_id: Uuid, id: Uuid) -> Result<Option<PricingFactor>> {
        let sql =
            format!("SELECT {FACTOR_COLUMNS} FROM pricing_factors WHERE id = $1 AND agency_id = $2");
        let row = sqlx::query_as::<_, FactorRow>(&sql)
            .bind(id)
            .bind(agency_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(PricingFactor::try_from).transpose()
    }

    async fn update_factor(&self, factor: &PricingFactor) -> Result<Option<PricingFactor>> {
        let sql = format!(
            r#"
            UPDATE pricing_factors SET
                name = $3, apply_to_sku_types = $4, apply_to_cities = $5,
                apply_to_tags = $6, apply_to_suppliers = $7,
                multiply_factor = $8, add_amount = $9, priority = $10,
                valid_from = $11, valid_to = $12, updated_at = $13
            WHERE id = $1 AND agency_id = $2
            RETURNING {FACTOR_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, FactorRow>(&sql)
            .bind(factor.id)
            .bind(factor.agency_id)
            .bind(&factor.name)
            .bind(sku_type_texts(&factor.apply_to_sku_types))
            .bind(factor.apply_to_cities.as_slice())
            .bind(factor.apply_to_tags.as_slice())
            .bind(factor.apply_to_suppliers.as_slice())
            .bind(factor.multiply_factor)
            .bind(factor.add_amount)
            .bind(factor.priority)
            .bind(factor.valid_from)
            .bind(factor.valid_to)
            .bind(factor.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        row.map(PricingFactor::try_from).transpose()
    }

    async fn delete_factor(&self, agency_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pricing_factors WHERE id = $1 AND agency_id = $2")
            .bind(id)
            .bind(agency_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_factors(&self, agency_id: Uuid) -> Result<Vec<PricingFactor>> {
        let sql = format!(
            "SELECT {FACTOR_COLUMNS} FROM pricing_factors WHERE agency_id = $1 \
             ORDER BY priority DESC, seq ASC"
        );
        let rows = sqlx::query_as::<_, FactorRow>(&sql)
            .bind(agency_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(PricingFactor::try_from).collect()
    }
}

// ---------------------------------------------------------------------------
// cooperation_relations
// ---------------------------------------------------------------------------

const COOPERATION_COLUMNS: &str = r#"
    id, from_agency_id, to_agency_id, status, request_message, response_message,
    created_at, updated_at, expired_at, approved_at, reviewed_at, terminated_at,
    created_by, reviewed_by
"#;

#[derive(Debug, FromRow)]
struct CooperationRow {
    id: Uuid,
    from_agency_id: Uuid,
    to_agency_id: Uuid,
    status: String,
    request_message: Option<String>,
    response_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expired_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    reviewed_at: Option<DateTime<Utc>>,
    terminated_at: Option<DateTime<Utc>>,
    created_by: Option<Uuid>,
    reviewed_by: Option<Uuid>,
}

impl TryFrom<CooperationRow> for CooperationRelation {
    type Error = AppError;

    fn try_from(row: CooperationRow) -> Result<Self> {
        Ok(CooperationRelation {
            id: row.id,
            from_agency_id: row.from_agency_id,
            to_agency_id: row.to_agency_id,
            status: decode("status", &row.status)?,
            request_message: row.request_message,
            response_message: row.response_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
            expired_at: row.expired_at,
            approved_at: row.approved_at,
            reviewed_at: row.reviewed_at,
            terminated_at: row.terminated_at,
            created_by: row.created_by,
            reviewed_by: row.reviewed_by,
        })
    }
}

impl CooperationStore for PgStore {
    async fn insert_cooperation(
        &self,
        relation: CooperationRelation,
    ) -> Result<CooperationRelation> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE cooperation_relations
            SET status = 'expired', updated_at = $3
            WHERE from_agency_id = $1 AND to_agency_id = $2
              AND status = 'pending' AND expired_at <= $3
            "#,
        )
        .bind(relation.from_agency_id)
        .bind(relation.to_agency_id)
        .bind(relation.created_at)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO cooperation_relations (
                id, from_agency_id, to_agency_id, status, request_message, response_message,
                created_at, updated_at, expired_at, approved_at, reviewed_at, terminated_at,
                created_by, reviewed_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(relation.id)
        .bind(relation.from_agency_id)
        .bind(relation.to_agency_id)
        .bind(relation.status.as_str())
        .bind(&relation.request_message)
        .bind(&relation.response_message)
        .bind(relation.created_at)
        .bind(relation.updated_at)
        .bind(relation.expired_at)
        .bind(relation.approved_at)
        .bind(relation.reviewed_at)
        .bind(relation.terminated_at)
        .bind(relation.created_by)
        .bind(relation.reviewed_by)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {
                tx.commit().await?;
                Ok(relation)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                tx.rollback().await?;
                Err(AppError::validation(
                    "a pending or approved cooperation already exists for this pair",
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_cooperation(&self, id: Uuid) -> Result<Option<CooperationRelation>> {
        let sql = format!("SELECT {COOPERATION_COLUMNS} FROM cooperation_relations WHERE id = $1");
        let row = sqlx::query_as::<_, CooperationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(CooperationRelation::try_from).transpose()
    }

    async fn transition_cooperation(
        &self,
        relation: &CooperationRelation,
        expected: CooperationStatus,
    ) -> Result<Option<CooperationRelation>> {
        let sql = format!(
            r#"
            UPDATE cooperation_relations SET
                status = $3, response_message = $4, updated_at = $5,
                approved_at = $6, reviewed_at = $7, terminated_at = $8, reviewed_by = $9
            WHERE id = $1 AND status = $2
            RETURNING {COOPERATION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, CooperationRow>(&sql)
            .bind(relation.id)
            .bind(expected.as_str())
            .bind(relation.status.as_str())
            .bind(&relation.response_message)
            .bind(relation.updated_at)
            .bind(relation.approved_at)
            .bind(relation.reviewed_at)
            .bind(relation.terminated_at)
            .bind(relation.reviewed_by)
            .fetch_optional(&self.pool)
            .await?;

        row.map(CooperationRelation::try_from).transpose()
    }

    async fn latest_cooperation(
        &self,
        from_agency_id: Uuid,
        to_agency_id: Uuid,
    ) -> Result<Option<CooperationRelation>> {
        let sql = format!(
            r#"
            SELECT {COOPERATION_COLUMNS}
            FROM cooperation_relations
            WHERE from_agency_id = $1 AND to_agency_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, CooperationRow>(&sql)
            .bind(from_agency_id)
            .bind(to_agency_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(CooperationRelation::try_from).transpose()
    }

    async fn list_cooperations(
        &self,
        agency_id: Uuid,
        filter: &CooperationFilter,
        page: Pagination,
    ) -> Result<Vec<CooperationRelation>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COOPERATION_COLUMNS} FROM cooperation_relations WHERE "
        ));

        match filter.role {
            Some(CooperationRole::Provider) => {
                qb.push("to_agency_id = ").push_bind(agency_id);
            }
            Some(CooperationRole::Consumer) => {
                qb.push("from_agency_id = ").push_bind(agency_id);
            }
            None => {
                qb.push("(from_agency_id = ")
                    .push_bind(agency_id)
                    .push(" OR to_agency_id = ")
                    .push_bind(agency_id)
                    .push(")");
            }
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }

        qb.push(" ORDER BY created_at DESC OFFSET ")
            .push_bind(page.skip)
            .push(" LIMIT ")
            .push_bind(page.limit);

        let rows = qb
            .build_query_as::<CooperationRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(CooperationRelation::try_from).collect()
    }

    async fn expire_pending_cooperations(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE cooperation_relations
            SET status = 'expired', updated_at = $1
            WHERE status = 'pending' AND expired_at IS NOT NULL AND expired_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// notifications
// ---------------------------------------------------------------------------

const NOTIFICATION_COLUMNS: &str = r#"
    id, agency_id, user_id, notification_type, title, content,
    related_entity_type, related_entity_id, is_read, read_at, created_at
"#;

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: Uuid,
    agency_id: Uuid,
    user_id: Option<Uuid>,
    notification_type: String,
    title: String,
    content: String,
    related_entity_type: Option<String>,
    related_entity_id: Option<Uuid>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Notification {
            id: row.id,
            agency_id: row.agency_id,
            user_id: row.user_id,
            notification_type: decode("notification_type", &row.notification_type)?,
            title: row.title,
            content: row.content,
            related_entity_type: row.related_entity_type,
            related_entity_id: row.related_entity_id,
            is_read: row.is_read,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}

impl NotificationStore for PgStore {
    async fn insert_notification(&self, notification: Notification) -> Result<Notification> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, agency_id, user_id, notification_type, title, content,
                related_entity_type, related_entity_id, is_read, read_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(notification.id)
        .bind(notification.agency_id)
        .bind(notification.user_id)
        .bind(notification.notification_type.as_str())
        .bind(&notification.title)
        .bind(&notification.content)
        .bind(&notification.related_entity_type)
        .bind(notification.related_entity_id)
        .bind(notification.is_read)
        .bind(notification.read_at)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn list_notifications(
        &self,
        agency_id: Uuid,
        filter: &NotificationFilter,
        page: Pagination,
    ) -> Result<Vec<Notification>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE agency_id = "
        ));
        qb.push_bind(agency_id);

        if let Some(user_id) = filter.user_id {
            qb.push(" AND (user_id IS NULL OR user_id = ")
                .push_bind(user_id)
                .push(")");
        }
        if let Some(kind) = filter.notification_type {
            qb.push(" AND notification_type = ").push_bind(kind.as_str());
        }
        if let Some(is_read) = filter.is_read {
            qb.push(" AND is_read = ").push_bind(is_read);
        }

        qb.push(" ORDER BY created_at DESC OFFSET ")
            .push_bind(page.skip)
            .push(" LIMIT ")
            .push_bind(page.limit);

        let rows = qb
            .build_query_as::<NotificationRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn mark_notifications_read(
        &self,
        agency_id: Uuid,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = $3
            WHERE agency_id = $1 AND id = ANY($2) AND NOT is_read
            "#,
        )
        .bind(agency_id)
        .bind(ids)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_unread_notifications(
        &self,
        agency_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM notifications
            WHERE agency_id = $1
              AND NOT is_read
              AND ($2::uuid IS NULL OR user_id IS NULL OR user_id = $2)
            "#,
        )
        .bind(agency_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}

// ---------------------------------------------------------------------------
// audit_logs
// ---------------------------------------------------------------------------

#[derive(Debug, FromRow)]
struct AuditRow {
    id: Uuid,
    agency_id: Uuid,
    user_id: Uuid,
    action: String,
    entity_type: String,
    entity_id: Uuid,
    before_data: Option<serde_json::Value>,
    after_data: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditLogEntry {
    fn from(row: AuditRow) -> Self {
        AuditLogEntry {
            id: row.id,
            agency_id: row.agency_id,
            user_id: row.user_id,
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            before_data: row.before_data,
            after_data: row.after_data,
            created_at: row.created_at,
        }
    }
}

impl AuditStore for PgStore {
    async fn insert_audit(&self, entry: AuditLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, agency_id, user_id, action, entity_type, entity_id,
                before_data, after_data, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.agency_id)
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.before_data)
        .bind(&entry.after_data)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_audit(
        &self,
        agency_id: Uuid,
        entity_id: Option<Uuid>,
    ) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, agency_id, user_id, action, entity_type, entity_id,
                   before_data, after_data, created_at
            FROM audit_logs
            WHERE agency_id = $1 AND ($2::uuid IS NULL OR entity_id = $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(agency_id)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }
}

// ---------------------------------------------------------------------------
// import_tasks
// ---------------------------------------------------------------------------

const IMPORT_COLUMNS: &str = r#"
    id, agency_id, user_id, status, input_text, input_files, sku_type,
    extracted_fields, confidence, evidence, error_message, created_sku_id,
    created_at, updated_at
"#;

#[derive(Debug, FromRow)]
struct ImportTaskRow {
    id: Uuid,
    agency_id: Uuid,
    user_id: Uuid,
    status: String,
    input_text: Option<String>,
    input_files: Vec<String>,
    sku_type: Option<String>,
    extracted_fields: Option<Json<serde_json::Map<String, serde_json::Value>>>,
    confidence: Option<serde_json::Value>,
    evidence: Option<serde_json::Value>,
    error_message: Option<String>,
    created_sku_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ImportTaskRow> for ImportTask {
    type Error = AppError;

    fn try_from(row: ImportTaskRow) -> Result<Self> {
        Ok(ImportTask {
            id: row.id,
            agency_id: row.agency_id,
            user_id: row.user_id,
            status: decode("status", &row.status)?,
            input_text: row.input_text,
            input_files: row.input_files,
            sku_type: row
                .sku_type
                .as_deref()
                .map(|t| decode("sku_type", t))
                .transpose()?,
            extracted_fields: row.extracted_fields.map(|j| j.0),
            confidence: row.confidence,
            evidence: row.evidence,
            error_message: row.error_message,
            created_sku_id: row.created_sku_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl ImportTaskStore for PgStore {
    async fn insert_import_task(&self, task: ImportTask) -> Result<ImportTask> {
        sqlx::query(
            r#"
            INSERT INTO import_tasks (
                id, agency_id, user_id, status, input_text, input_files, sku_type,
                extracted_fields, confidence, evidence, error_message, created_sku_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(task.id)
        .bind(task.agency_id)
        .bind(task.user_id)
        .bind(task.status.as_str())
        .bind(&task.input_text)
        .bind(task.input_files.as_slice())
        .bind(task.sku_type.map(|t| t.as_str()))
        .bind(task.extracted_fields.as_ref().map(Json))
        .bind(&task.confidence)
        .bind(&task.evidence)
        .bind(&task.error_message)
        .bind(task.created_sku_id)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(task)
    }

    async fn get_import_task(&self, agency_id: Uuid, id: Uuid) -> Result<Option<ImportTask>> {
        let sql = format!("SELECT {IMPORT_COLUMNS} FROM import_tasks WHERE id = $1 AND agency_id = $2");
        let row = sqlx::query_as::<_, ImportTaskRow>(&sql)
            .bind(id)
            .bind(agency_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ImportTask::try_from).transpose()
    }

    async fn transition_import_task(
        &self,
        task: &ImportTask,
        expected: ImportStatus,
    ) -> Result<Option<ImportTask>> {
        let sql = format!(
            r#"
            UPDATE import_tasks SET
                status = $4, sku_type = $5, extracted_fields = $6, confidence = $7,
                evidence = $8, error_message = $9, created_sku_id = $10, updated_at = $11
            WHERE id = $1 AND agency_id = $2 AND status = $3
            RETURNING {IMPORT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ImportTaskRow>(&sql)
            .bind(task.id)
            .bind(task.agency_id)
            .bind(expected.as_str())
            .bind(task.status.as_str())
            .bind(task.sku_type.map(|t| t.as_str()))
            .bind(task.extracted_fields.as_ref().map(Json))
            .bind(&task.confidence)
            .bind(&task.evidence)
            .bind(&task.error_message)
            .bind(task.created_sku_id)
            .bind(task.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ImportTask::try_from).transpose()
    }

    async fn list_import_tasks(
        &self,
        agency_id: Uuid,
        status: Option<ImportStatus>,
        page: Pagination,
    ) -> Result<Vec<ImportTask>> {
        let sql = format!(
            r#"
            SELECT {IMPORT_COLUMNS}
            FROM import_tasks
            WHERE agency_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            OFFSET $3 LIMIT $4
            "#
        );
        let rows = sqlx::query_as::<_, ImportTaskRow>(&sql)
            .bind(agency_id)
            .bind(status.map(|s| s.as_str()))
            .bind(page.skip)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ImportTask::try_from).collect()
    }
}
