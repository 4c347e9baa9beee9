//! Background expiry of overdue cooperation requests.

use chrono::Utc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use crate::store::Store;

use super::services;

/// Run the sweep immediately and then every `every_secs` seconds.
///
/// Returns at once when `every_secs` is 0.
pub async fn start_expiry_sweeper<S: Store>(store: std::sync::Arc<S>, every_secs: u64) {
    if every_secs == 0 {
        info!("Cooperation expiry sweep disabled");
        return;
    }

    let mut ticker = interval(Duration::from_secs(every_secs));
    loop {
        // First tick completes immediately
        ticker.tick().await;
        sweep(store.as_ref()).await;
    }
}

async fn sweep<S: Store>(store: &S) {
    if let Err(e) = services::expire_stale_requests(store, Utc::now()).await {
        warn!("Cooperation expiry sweep failed: {}", e);
    }
}
