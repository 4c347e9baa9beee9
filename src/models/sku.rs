//! Catalog entry (SKU) model.
//!
//! A SKU is owned by exactly one agency. Visibility across agencies is
//! carried by `is_public` + `public_status`; `owner_type` is the older coarse
//! flag and is still honoured when reading rows written before the split.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use super::attrs::SkuAttrs;

/// The seven bookable resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkuType {
    Hotel,
    Car,
    Itinerary,
    Guide,
    Restaurant,
    Ticket,
    Activity,
}

text_enum!(SkuType {
    Hotel => "hotel",
    Car => "car",
    Itinerary => "itinerary",
    Guide => "guide",
    Restaurant => "restaurant",
    Ticket => "ticket",
    Activity => "activity",
});

impl SkuType {
    pub const ALL: [SkuType; 7] = [
        SkuType::Hotel,
        SkuType::Car,
        SkuType::Itinerary,
        SkuType::Guide,
        SkuType::Restaurant,
        SkuType::Ticket,
        SkuType::Activity,
    ];

    /// Canonical unified category for this type
    pub fn category(&self) -> Category {
        match self {
            SkuType::Hotel => Category::Hotel,
            SkuType::Car => Category::Transport,
            SkuType::Itinerary => Category::Route,
            SkuType::Guide => Category::Guide,
            SkuType::Restaurant => Category::Dining,
            SkuType::Ticket => Category::Ticket,
            SkuType::Activity => Category::Activity,
        }
    }
}

/// Cross-type category used for unified filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Hotel,
    Transport,
    Route,
    Guide,
    Dining,
    Ticket,
    Activity,
}

text_enum!(Category {
    Hotel => "hotel",
    Transport => "transport",
    Route => "route",
    Guide => "guide",
    Dining => "dining",
    Ticket => "ticket",
    Activity => "activity",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkuStatus {
    Active,
    Inactive,
}

text_enum!(SkuStatus {
    Active => "active",
    Inactive => "inactive",
});

/// Legacy coarse visibility flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerType {
    Private,
    Public,
}

text_enum!(OwnerType {
    Private => "private",
    Public => "public",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicStatus {
    #[serde(rename = "none")]
    Unpublished,
    Pending,
    Published,
    Removed,
}

text_enum!(PublicStatus {
    Unpublished => "none",
    Pending => "pending",
    Published => "published",
    Removed => "removed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityScope {
    All,
    PartnerWhitelist,
}

text_enum!(VisibilityScope {
    All => "all",
    PartnerWhitelist => "partner_whitelist",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceMode {
    Fixed,
    Calendar,
    Ruled,
}

text_enum!(PriceMode {
    Fixed => "fixed",
    Calendar => "calendar",
    Ruled => "ruled",
});

/// Rule-based surcharge, e.g. weekend +300
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRule {
    #[serde(alias = "rule_name")]
    pub rule: String,
    #[serde(default)]
    pub delta_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl PriceRule {
    pub const WEEKEND: &'static str = "weekend";

    pub fn weekend(delta_amount: Decimal) -> Self {
        Self {
            rule: Self::WEEKEND.to_string(),
            delta_amount,
            currency: None,
        }
    }

    /// Whether the rule fires on `date`. Only weekend rules are evaluated;
    /// other kinds (holiday, peak_season) are stored but never match.
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self.rule.as_str() {
            Self::WEEKEND => matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
            _ => false,
        }
    }
}

/// A calendar price entry: either a bare amount or a detailed record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CalendarEntry {
    Amount(Decimal),
    Detailed(CalendarDetail),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

impl CalendarEntry {
    /// Sell-side price of the entry (`sales_price`, then `price`, then `amount`)
    pub fn price(&self) -> Option<Decimal> {
        match self {
            CalendarEntry::Amount(amount) => Some(*amount),
            CalendarEntry::Detailed(detail) => {
                detail.sales_price.or(detail.price).or(detail.amount)
            }
        }
    }
}

/// Date string (`YYYY-MM-DD`) -> entry
pub type PriceCalendar = BTreeMap<String, CalendarEntry>;

/// Catalog entry
#[derive(Debug, Clone, Serialize)]
pub struct Sku {
    pub id: Uuid,
    pub agency_id: Uuid,
    pub product_id: Option<Uuid>,
    pub sku_name: String,
    pub sku_type: SkuType,
    pub category: Category,
    pub status: SkuStatus,

    pub owner_type: OwnerType,
    pub is_public: bool,
    pub public_status: PublicStatus,
    pub visibility_scope: VisibilityScope,
    pub partner_whitelist: Vec<Uuid>,

    /// Agency that published the entry this one was copied from
    pub source_org_id: Option<Uuid>,
    pub source_sku_id: Option<Uuid>,
    pub applied_factor_id: Option<Uuid>,

    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
    pub destination_country: Option<String>,
    pub destination_city: Option<String>,
    pub tags: Vec<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub booking_advance: Option<i32>,
    pub description: Option<String>,
    pub highlights: Vec<String>,
    pub inclusions: Vec<String>,
    pub exclusions: Vec<String>,
    pub cancellation_policy: Option<String>,

    pub price_mode: PriceMode,
    pub base_cost_price: Option<Decimal>,
    pub base_sale_price: Option<Decimal>,
    pub calendar_prices: PriceCalendar,
    pub price_rules: Vec<PriceRule>,

    pub attrs: SkuAttrs,
    pub media: Vec<BTreeMap<String, String>>,

    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sku {
    /// Fresh private entry with every optional field empty
    pub fn new_private(
        agency_id: Uuid,
        sku_name: String,
        attrs: SkuAttrs,
        created_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        let sku_type = attrs.sku_type();
        Self {
            id: Uuid::new_v4(),
            agency_id,
            product_id: None,
            sku_name,
            sku_type,
            category: sku_type.category(),
            status: SkuStatus::Active,
            owner_type: OwnerType::Private,
            is_public: false,
            public_status: PublicStatus::Unpublished,
            visibility_scope: VisibilityScope::All,
            partner_whitelist: Vec::new(),
            source_org_id: None,
            source_sku_id: None,
            applied_factor_id: None,
            supplier_id: None,
            supplier_name: None,
            destination_country: None,
            destination_city: None,
            tags: Vec::new(),
            valid_from: None,
            valid_to: None,
            booking_advance: None,
            description: None,
            highlights: Vec::new(),
            inclusions: Vec::new(),
            exclusions: Vec::new(),
            cancellation_policy: None,
            price_mode: PriceMode::Fixed,
            base_cost_price: None,
            base_sale_price: None,
            calendar_prices: PriceCalendar::new(),
            price_rules: Vec::new(),
            attrs,
            media: Vec::new(),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Visible in public-library browsing
    pub fn is_publicly_listed(&self) -> bool {
        (self.is_public || self.owner_type == OwnerType::Public)
            && self.public_status != PublicStatus::Removed
    }

    /// Eligible for an exclusive copy into another private catalog
    pub fn is_claimable(&self) -> bool {
        self.is_public && self.public_status == PublicStatus::Published
    }

    /// Whether `agency_id` passes the visibility scope gate
    pub fn admits_partner(&self, agency_id: Uuid) -> bool {
        match self.visibility_scope {
            VisibilityScope::All => true,
            VisibilityScope::PartnerWhitelist => self.partner_whitelist.contains(&agency_id),
        }
    }

    pub fn shares_tag_with(&self, tags: &[String]) -> bool {
        let own: HashSet<&str> = self.tags.iter().map(String::as_str).collect();
        tags.iter().any(|t| own.contains(t.as_str()))
    }

    pub fn mark_published(
        &mut self,
        scope: VisibilityScope,
        partner_whitelist: Option<Vec<Uuid>>,
        now: DateTime<Utc>,
    ) {
        self.owner_type = OwnerType::Public;
        self.is_public = true;
        self.public_status = PublicStatus::Published;
        self.visibility_scope = scope;
        if let Some(whitelist) = partner_whitelist {
            self.partner_whitelist = whitelist;
        }
        self.updated_at = now;
    }

    pub fn mark_removed(&mut self, now: DateTime<Utc>) {
        self.is_public = false;
        self.public_status = PublicStatus::Removed;
        self.updated_at = now;
    }

    /// Duplicate into another agency's private catalog with provenance set.
    /// Publication state, ids and timestamps are reset; pricing is copied as-is.
    pub fn private_copy_for(&self, agency_id: Uuid, created_by: Uuid, now: DateTime<Utc>) -> Sku {
        Sku {
            id: Uuid::new_v4(),
            agency_id,
            product_id: None,
            owner_type: OwnerType::Private,
            is_public: false,
            public_status: PublicStatus::Unpublished,
            visibility_scope: VisibilityScope::All,
            partner_whitelist: Vec::new(),
            source_org_id: Some(self.agency_id),
            source_sku_id: Some(self.id),
            applied_factor_id: None,
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }
}
