//! Private SKU catalog of an agency.

pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;

pub use routes::router;
pub use services::{
    batch_delete_skus, batch_update_pricing, batch_update_skus, create_sku, delete_sku, get_sku,
    list_skus, set_price_calendar, update_sku, BatchItemOutcome, BatchResult,
};
