//! Notification sink and the recipient-facing inbox.

pub mod requests;
pub mod routes;
pub mod services;

pub use routes::router;
pub use services::{list_notifications, mark_as_read, notify, unread_count};
