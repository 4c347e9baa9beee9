//! Cooperation relationships between agencies.
//!
//! An approved relation `requester -> provider` lets the requester copy the
//! provider's public library entries into its private catalog.

pub mod requests;
pub mod routes;
pub mod services;
pub mod sweeper;

pub use routes::router;
pub use services::{
    approve, check_status, create_request, expire_stale_requests, list_cooperations, reject,
    terminate,
};
pub use sweeper::start_expiry_sweeper;
