mod routes;
#[cfg(test)]
mod testutil;

use std::sync::Arc;

use anyhow::Result;
use taskhive_core::client::{
    AnalyticsServiceClient, FileServiceClient, TaskServiceClient, UserServiceClient,
};
use taskhive_core::config::HiveConfig;

pub struct AppState {
    pub users: Arc<UserServiceClient>,
    pub tasks: TaskServiceClient,
    pub analytics: AnalyticsServiceClient,
    pub files: FileServiceClient,
    pub production: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskhive_frontend=info".parse().unwrap()),
        )
        .init();

    let config = HiveConfig::load(None)?;

    let state = Arc::new(AppState {
        users: Arc::new(UserServiceClient::new(config.user_service_url.clone())),
        tasks: TaskServiceClient::new(config.task_service_url.clone()),
        analytics: AnalyticsServiceClient::new(config.analytics_service_url.clone()),
        files: FileServiceClient::new(config.file_service_url.clone()),
        production: config.production,
    });

    let app = routes::router(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.frontend.host, config.frontend.port);
    tracing::info!("frontend-service listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
