//! Type-specific SKU attribute payloads.
//!
//! Each `SkuType` has its own strongly typed field set. Raw JSON coming from
//! callers (or from AI extraction) is validated by [`SkuAttrs::parse`], which
//! dispatches on the type tag. Unknown keys are dropped.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::sku::{PriceCalendar, SkuType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelAttrs {
    pub hotel_name: String,
    #[serde(default)]
    pub hotel_name_en: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub star_rating: Option<String>,
    pub address: String,
    #[serde(default)]
    pub latitude: Option<Decimal>,
    #[serde(default)]
    pub longitude: Option<Decimal>,
    pub room_type_name: String,
    #[serde(default)]
    pub bed_type: Option<String>,
    #[serde(default)]
    pub room_area: Option<i32>,
    #[serde(default)]
    pub max_occupancy: Option<i32>,
    #[serde(default)]
    pub include_breakfast: Option<bool>,
    #[serde(default)]
    pub daily_cost_price: Option<Decimal>,
    #[serde(default)]
    pub daily_sell_price: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Older per-hotel calendar; superseded by `Sku::calendar_prices`
    #[serde(default)]
    pub price_calendar: Option<PriceCalendar>,
    #[serde(default)]
    pub refundable: Option<bool>,
    #[serde(default)]
    pub free_cancel_before: Option<String>,
    #[serde(default)]
    pub blackout_dates: Option<Vec<chrono::NaiveDate>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarAttrs {
    pub car_type: String,
    pub seats: i32,
    pub service_mode: String,
    #[serde(default)]
    pub service_hours: Option<i32>,
    #[serde(default)]
    pub driver_language: Option<Vec<String>>,
    #[serde(default)]
    pub pickup_location: Option<String>,
    #[serde(default)]
    pub dropoff_location: Option<String>,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    #[serde(default)]
    pub sell_price: Option<Decimal>,
    #[serde(default)]
    pub available_dates: Option<Vec<chrono::NaiveDate>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryAttrs {
    pub itinerary_name: String,
    pub days: i32,
    #[serde(default)]
    pub nights: Option<i32>,
    pub depart_city: String,
    #[serde(default)]
    pub arrive_city: Option<String>,
    #[serde(default)]
    pub itinerary_type: Option<String>,
    #[serde(default)]
    pub departure_dates: Option<Vec<chrono::NaiveDate>>,
    #[serde(default)]
    pub min_pax: Option<i32>,
    #[serde(default)]
    pub max_pax: Option<i32>,
    #[serde(default)]
    pub route_stops: Option<Vec<String>>,
    #[serde(default)]
    pub service_guarantees: Option<Vec<String>>,
    #[serde(default)]
    pub experience_themes: Option<Vec<String>>,
    #[serde(default)]
    pub adult_price: Option<Decimal>,
    #[serde(default)]
    pub child_price: Option<Decimal>,
    #[serde(default)]
    pub single_supplement: Option<Decimal>,
    #[serde(default)]
    pub day_by_day: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub highlight: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideAttrs {
    pub guide_name: String,
    #[serde(default)]
    pub gender: Option<String>,
    pub languages: Vec<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub expertise_tags: Option<Vec<String>>,
    #[serde(default)]
    pub service_city: Option<String>,
    #[serde(default)]
    pub daily_cost_price: Option<Decimal>,
    #[serde(default)]
    pub daily_sell_price: Option<Decimal>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub wechat_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantAttrs {
    pub restaurant_name: String,
    #[serde(default)]
    pub cuisine_type: Option<String>,
    pub meal_type: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub per_person_price: Option<Decimal>,
    #[serde(default)]
    pub min_pax: Option<i32>,
    #[serde(default)]
    pub max_pax: Option<i32>,
    #[serde(default)]
    pub set_menu_desc: Option<String>,
    #[serde(default)]
    pub booking_time_slots: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketAttrs {
    pub attraction_name: String,
    pub ticket_type: String,
    pub entry_method: String,
    #[serde(default)]
    pub valid_type: Option<String>,
    #[serde(default)]
    pub valid_days: Option<i32>,
    #[serde(default)]
    pub visit_time_range: Option<String>,
    #[serde(default)]
    pub need_real_name: Option<bool>,
    #[serde(default)]
    pub real_name_fields: Option<Vec<String>>,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    #[serde(default)]
    pub sell_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityAttrs {
    pub activity_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub duration_hours: Option<Decimal>,
    #[serde(default)]
    pub duration_days: Option<i32>,
    #[serde(default)]
    pub duration_nights: Option<i32>,
    #[serde(default)]
    pub language_service: Option<Vec<String>>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub meeting_point: Option<String>,
    #[serde(default)]
    pub route_stops: Option<Vec<String>>,
    #[serde(default)]
    pub start_time_slots: Option<Vec<String>>,
    #[serde(default)]
    pub min_pax: Option<i32>,
    #[serde(default)]
    pub max_pax: Option<i32>,
    #[serde(default)]
    pub experience_themes: Option<Vec<String>>,
    #[serde(default)]
    pub service_guarantees: Option<Vec<String>>,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    #[serde(default)]
    pub sell_price: Option<Decimal>,
}

/// Attribute payload, one variant per `SkuType`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SkuAttrs {
    Hotel(HotelAttrs),
    Car(CarAttrs),
    Itinerary(ItineraryAttrs),
    Guide(GuideAttrs),
    Restaurant(RestaurantAttrs),
    Ticket(TicketAttrs),
    Activity(ActivityAttrs),
}

impl SkuAttrs {
    /// Validate a raw payload against the schema of `sku_type`
    pub fn parse(sku_type: SkuType, raw: serde_json::Value) -> Result<Self, AppError> {
        if !raw.is_object() {
            return Err(AppError::validation(format!(
                "attrs for {} must be an object",
                sku_type
            )));
        }

        let attrs = match sku_type {
            SkuType::Hotel => serde_json::from_value(raw).map(SkuAttrs::Hotel),
            SkuType::Car => serde_json::from_value(raw).map(SkuAttrs::Car),
            SkuType::Itinerary => serde_json::from_value(raw).map(SkuAttrs::Itinerary),
            SkuType::Guide => serde_json::from_value(raw).map(SkuAttrs::Guide),
            SkuType::Restaurant => serde_json::from_value(raw).map(SkuAttrs::Restaurant),
            SkuType::Ticket => serde_json::from_value(raw).map(SkuAttrs::Ticket),
            SkuType::Activity => serde_json::from_value(raw).map(SkuAttrs::Activity),
        };

        attrs.map_err(|e| AppError::validation(format!("invalid {} attrs: {}", sku_type, e)))
    }

    pub fn sku_type(&self) -> SkuType {
        match self {
            SkuAttrs::Hotel(_) => SkuType::Hotel,
            SkuAttrs::Car(_) => SkuType::Car,
            SkuAttrs::Itinerary(_) => SkuType::Itinerary,
            SkuAttrs::Guide(_) => SkuType::Guide,
            SkuAttrs::Restaurant(_) => SkuType::Restaurant,
            SkuAttrs::Ticket(_) => SkuType::Ticket,
            SkuAttrs::Activity(_) => SkuType::Activity,
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Price-bearing attribute keys of this variant, in declaration order
    pub fn price_keys(&self) -> &'static [&'static str] {
        match self {
            SkuAttrs::Hotel(_) | SkuAttrs::Guide(_) => &["daily_cost_price", "daily_sell_price"],
            SkuAttrs::Car(_) | SkuAttrs::Ticket(_) | SkuAttrs::Activity(_) => {
                &["cost_price", "sell_price"]
            }
            SkuAttrs::Itinerary(_) => &["adult_price", "child_price"],
            SkuAttrs::Restaurant(_) => &["per_person_price"],
        }
    }

    /// Read a price attribute by key. Keys the variant does not carry read as `None`.
    pub fn price_field(&self, key: &str) -> Option<Decimal> {
        match self {
            SkuAttrs::Hotel(a) => match key {
                "daily_cost_price" => a.daily_cost_price,
                "daily_sell_price" => a.daily_sell_price,
                _ => None,
            },
            SkuAttrs::Guide(a) => match key {
                "daily_cost_price" => a.daily_cost_price,
                "daily_sell_price" => a.daily_sell_price,
                _ => None,
            },
            SkuAttrs::Car(a) => match key {
                "cost_price" => a.cost_price,
                "sell_price" => a.sell_price,
                _ => None,
            },
            SkuAttrs::Ticket(a) => match key {
                "cost_price" => a.cost_price,
                "sell_price" => a.sell_price,
                _ => None,
            },
            SkuAttrs::Activity(a) => match key {
                "cost_price" => a.cost_price,
                "sell_price" => a.sell_price,
                _ => None,
            },
            SkuAttrs::Itinerary(a) => match key {
                "adult_price" => a.adult_price,
                "child_price" => a.child_price,
                "single_supplement" => a.single_supplement,
                _ => None,
            },
            SkuAttrs::Restaurant(a) => match key {
                "per_person_price" => a.per_person_price,
                _ => None,
            },
        }
    }

    /// Mutable slot for a price attribute, `None` if the variant has no such key
    pub fn price_field_mut(&mut self, key: &str) -> Option<&mut Option<Decimal>> {
        let slot = match self {
            SkuAttrs::Hotel(a) => match key {
                "daily_cost_price" => &mut a.daily_cost_price,
                "daily_sell_price" => &mut a.daily_sell_price,
                _ => return None,
            },
            SkuAttrs::Guide(a) => match key {
                "daily_cost_price" => &mut a.daily_cost_price,
                "daily_sell_price" => &mut a.daily_sell_price,
                _ => return None,
            },
            SkuAttrs::Car(a) => match key {
                "cost_price" => &mut a.cost_price,
                "sell_price" => &mut a.sell_price,
                _ => return None,
            },
            SkuAttrs::Ticket(a) => match key {
                "cost_price" => &mut a.cost_price,
                "sell_price" => &mut a.sell_price,
                _ => return None,
            },
            SkuAttrs::Activity(a) => match key {
                "cost_price" => &mut a.cost_price,
                "sell_price" => &mut a.sell_price,
                _ => return None,
            },
            SkuAttrs::Itinerary(a) => match key {
                "adult_price" => &mut a.adult_price,
                "child_price" => &mut a.child_price,
                "single_supplement" => &mut a.single_supplement,
                _ => return None,
            },
            SkuAttrs::Restaurant(a) => match key {
                "per_person_price" => &mut a.per_person_price,
                _ => return None,
            },
        };
        Some(slot)
    }

    pub fn currency(&self) -> Option<&str> {
        match self {
            SkuAttrs::Hotel(a) => a.currency.as_deref(),
            _ => None,
        }
    }

    /// Per-hotel calendar carried inside the payload by older imports
    pub fn legacy_price_calendar(&self) -> Option<&PriceCalendar> {
        match self {
            SkuAttrs::Hotel(a) => a.price_calendar.as_ref(),
            _ => None,
        }
    }

    pub fn set_address_if_missing(raw: &mut serde_json::Value, fallback: &str) {
        if let Some(map) = raw.as_object_mut() {
            let missing = map
                .get("address")
                .map(|v| v.is_null() || v.as_str().is_some_and(|s| s.trim().is_empty()))
                .unwrap_or(true);
            if missing {
                map.insert("address".to_string(), serde_json::Value::from(fallback));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn hotel_raw() -> serde_json::Value {
        json!({
            "hotel_name": "Lijiang Old Town Inn",
            "address": "1 Xinyi St",
            "room_type_name": "Deluxe King",
            "daily_cost_price": 700,
            "daily_sell_price": "1000.00",
            "unexpected": "dropped"
        })
    }

    #[test]
    fn test_parse_hotel_ok() {
        let attrs = SkuAttrs::parse(SkuType::Hotel, hotel_raw()).unwrap();
        assert_eq!(attrs.sku_type(), SkuType::Hotel);
        assert_eq!(attrs.price_field("daily_sell_price"), Some(dec!(1000)));
        assert_eq!(attrs.price_field("daily_cost_price"), Some(dec!(700)));
        assert!(attrs.to_value().get("unexpected").is_none());
    }

    #[test]
    fn test_parse_missing_required_field() {
        let err = SkuAttrs::parse(SkuType::Hotel, json!({"hotel_name": "x", "address": "y"}))
            .unwrap_err();
        assert!(err.to_string().contains("room_type_name"));

        let err = SkuAttrs::parse(SkuType::Guide, json!({"guide_name": "Li"})).unwrap_err();
        assert!(err.to_string().contains("languages"));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(SkuAttrs::parse(SkuType::Car, json!([1, 2])).is_err());
    }

    #[test]
    fn test_payload_shape_is_type_checked() {
        // A valid car payload is not a valid ticket payload
        let car = json!({"car_type": "SUV", "seats": 7, "service_mode": "charter"});
        assert!(SkuAttrs::parse(SkuType::Car, car.clone()).is_ok());
        assert!(SkuAttrs::parse(SkuType::Ticket, car).is_err());
    }

    #[test]
    fn test_price_field_mut_only_known_keys() {
        let mut attrs = SkuAttrs::parse(SkuType::Hotel, hotel_raw()).unwrap();
        *attrs.price_field_mut("daily_sell_price").unwrap() = Some(dec!(1200));
        assert_eq!(attrs.price_field("daily_sell_price"), Some(dec!(1200)));
        assert!(attrs.price_field_mut("adult_price").is_none());
        assert_eq!(attrs.price_field("adult_price"), None);
    }

    #[test]
    fn test_price_keys_are_readable_on_every_type() {
        let samples = [
            (SkuType::Hotel, hotel_raw()),
            (SkuType::Car, json!({"car_type": "SUV", "seats": 5, "service_mode": "daily", "sell_price": 1})),
            (SkuType::Itinerary, json!({"itinerary_name": "Yunnan 6D", "days": 6, "depart_city": "Kunming", "adult_price": 1})),
            (SkuType::Guide, json!({"guide_name": "Li", "languages": ["zh", "en"], "daily_sell_price": 1})),
            (SkuType::Restaurant, json!({"restaurant_name": "Naxi Kitchen", "meal_type": "dinner", "per_person_price": 1})),
            (SkuType::Ticket, json!({"attraction_name": "Jade Dragon", "ticket_type": "adult", "entry_method": "qr", "sell_price": 1})),
            (SkuType::Activity, json!({"activity_name": "Tea tasting", "sell_price": 1})),
        ];
        for (sku_type, raw) in samples {
            let mut attrs = SkuAttrs::parse(sku_type, raw).unwrap();
            for key in attrs.price_keys() {
                assert!(attrs.price_field_mut(key).is_some(), "{} lacks {}", sku_type, key);
            }
        }
    }

    #[test]
    fn test_set_address_if_missing() {
        let mut raw = json!({"hotel_name": "x", "address": ""});
        SkuAttrs::set_address_if_missing(&mut raw, "Dali");
        assert_eq!(raw["address"], "Dali");

        let mut raw = json!({"address": "kept"});
        SkuAttrs::set_address_if_missing(&mut raw, "Dali");
        assert_eq!(raw["address"], "kept");
    }
}
