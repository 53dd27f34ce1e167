mod routes;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use taskhive_core::config::HiveConfig;

use crate::storage::UserStore;

pub struct AppState {
    pub store: UserStore,
    pub production: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskhive_user=info".parse().unwrap()),
        )
        .init();

    let config = HiveConfig::load(None)?;

    let store = match config.user.db_path.as_deref() {
        Some(path) => UserStore::open(path)?,
        None => UserStore::open_in_memory()?,
    };

    let state = Arc::new(AppState {
        store,
        production: config.production,
    });

    // Out-of-band sweep for expired sessions; verification also deletes
    // expired rows on sight, this just keeps the table from growing.
    let sweep_state = Arc::clone(&state);
    let interval = Duration::from_secs(config.user.cleanup_interval_minutes * 60);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sweep_state.store.cleanup_expired_sessions(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(n) => tracing::info!(deleted = n, "cleaned up expired sessions"),
                Err(e) => tracing::warn!(error = %e, "session cleanup sweep failed"),
            }
        }
    });

    let app = routes::router()
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.user.host, config.user.port);
    tracing::info!("user-service listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
