//! Travel resource backend server.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tfrm_backend::cooperation::start_expiry_sweeper;
use tfrm_backend::store::{MemoryStore, PgStore, Store};
use tfrm_backend::{routes, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tfrm_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    match config.database_url.clone() {
        Some(url) => {
            let store = PgStore::connect(&url, config.db_max_connections)
                .await
                .context("connecting to database")?;
            store.migrate().await.context("running migrations")?;
            tracing::info!("Using Postgres store");
            serve(store, config).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            serve(MemoryStore::new(), config).await
        }
    }
}

async fn serve<S: Store>(store: S, config: AppConfig) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr.clone();
    let sweep_every = config.cooperation_sweep_interval_secs;
    let state = AppState::new(store, config);

    tokio::spawn(start_expiry_sweeper(state.store.clone(), sweep_every));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, routes::app(state)).await?;
    Ok(())
}
