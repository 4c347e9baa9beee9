//! Pricing engine module.
//!
//! Resolves the sell price of a SKU on a date (calendar, then rule, then
//! fixed base) and applies the owning agency's markup factor on top.

pub mod calculators;
pub mod matcher;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;

// Re-export commonly used items
pub use calculators::{
    apply_factor, build_availability, reprice_attrs, resolve_price_for_date, round_money,
    PriceResolution, PriceSource,
};
pub use routes::router;
pub use services::{find_matching_factor, get_availability, resolve_price, Availability};
