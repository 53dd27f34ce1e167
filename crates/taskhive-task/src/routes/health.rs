use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;

use taskhive_http::{DependencyHealth, HealthStatus};

use crate::AppState;

/// GET /api/v1/health
pub async fn health(State(state): State<Arc<AppState>>) -> HealthStatus {
    let started = Instant::now();
    let database = match state.store.ping().await {
        Ok(()) => DependencyHealth::healthy(started.elapsed().as_millis()),
        Err(e) => DependencyHealth::unhealthy(e.to_string()),
    };

    let mut dependencies = BTreeMap::new();
    dependencies.insert("database".to_string(), database);
    HealthStatus::for_service("task-service", dependencies)
}
