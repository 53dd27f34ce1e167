mod routes;
mod storage;

use std::sync::Arc;

use anyhow::Result;
use taskhive_core::config::HiveConfig;

use crate::storage::FileStore;

pub struct AppState {
    pub store: FileStore,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskhive_file=info".parse().unwrap()),
        )
        .init();

    let config = HiveConfig::load(None)?;

    let store = match config.file.db_path.as_deref() {
        Some(path) => FileStore::open(path)?,
        None => FileStore::open_in_memory()?,
    };

    let state = Arc::new(AppState { store });

    let app = routes::router()
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.file.host, config.file.port);
    tracing::info!("file-service listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
