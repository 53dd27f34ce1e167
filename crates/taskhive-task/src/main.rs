mod routes;
mod storage;

use std::sync::Arc;

use anyhow::Result;
use taskhive_core::client::UserServiceClient;
use taskhive_core::config::HiveConfig;

use crate::storage::TaskStore;

pub struct AppState {
    pub store: TaskStore,
    pub verifier: Arc<UserServiceClient>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskhive_task=info".parse().unwrap()),
        )
        .init();

    let config = HiveConfig::load(None)?;

    let store = match config.task.db_path.as_deref() {
        Some(path) => TaskStore::open(path)?,
        None => TaskStore::open_in_memory()?,
    };

    let state = Arc::new(AppState {
        store,
        verifier: Arc::new(UserServiceClient::new(config.user_service_url.clone())),
    });

    let app = routes::router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.task.host, config.task.port);
    tracing::info!("task-service listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
