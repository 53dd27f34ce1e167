use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;

use taskhive_core::client::ClientResult;
use taskhive_http::{DependencyHealth, HealthStatus};

use crate::AppState;

/// GET /api/v1/health — the frontend has no database; its dependencies
/// are the sibling services themselves.
pub async fn health(State(state): State<Arc<AppState>>) -> HealthStatus {
    let (user, task, analytics, file) = tokio::join!(
        probe(state.users.health_check()),
        probe(state.tasks.health_check()),
        probe(state.analytics.health_check()),
        probe(state.files.health_check()),
    );

    let mut dependencies = BTreeMap::new();
    dependencies.insert("user-service".to_string(), user);
    dependencies.insert("task-service".to_string(), task);
    dependencies.insert("analytics-service".to_string(), analytics);
    dependencies.insert("file-service".to_string(), file);
    HealthStatus::for_service("frontend-service", dependencies)
}

async fn probe(check: impl Future<Output = ClientResult>) -> DependencyHealth {
    let started = Instant::now();
    match check.await {
        Ok(_) => DependencyHealth::healthy(started.elapsed().as_millis()),
        Err(e) => DependencyHealth::unhealthy(e.to_string()),
    }
}
