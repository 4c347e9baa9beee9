//! Public library: publication, browsing and cross-agency acquisition.

pub mod requests;
pub mod routes;
pub mod services;

pub use routes::router;
pub use services::{
    browse_public, copy_to_private, notify_downstream_change, publish, pull_public_sku, unpublish,
};
