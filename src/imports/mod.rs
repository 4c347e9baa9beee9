//! AI import tasks: extraction results in, private SKUs out.

pub mod requests;
pub mod routes;
pub mod services;

pub use routes::router;
pub use services::{
    confirm_import, create_import_task, get_import_task, list_import_tasks, record_extraction,
};
