//! Multi-tenant travel resource backend.
//!
//! Agencies keep a private catalog of bookable resources (SKUs), price them
//! per date with their own markup factors, and share them with cooperating
//! agencies through a moderated public library.

use std::sync::Arc;

pub mod audit;
pub mod catalog;
pub mod config;
pub mod cooperation;
pub mod error;
pub mod identity;
pub mod imports;
pub mod library;
pub mod models;
pub mod notifications;
pub mod pricing;
pub mod routes;
pub mod store;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use identity::Identity;

/// Shared handler state
pub struct AppState<S> {
    pub store: Arc<S>,
    pub config: Arc<AppConfig>,
}

impl<S> AppState<S> {
    pub fn new(store: S, config: AppConfig) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}
