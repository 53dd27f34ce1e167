use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One dependency's health probe result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DependencyHealth {
    pub fn healthy(response_time_ms: u128) -> Self {
        Self {
            status: "healthy".to_string(),
            response_time_ms: Some(response_time_ms),
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            response_time_ms: None,
            error: Some(error.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// The `/api/v1/health` payload. Responds 503 when any dependency is
/// unhealthy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub service: String,
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub dependencies: BTreeMap<String, DependencyHealth>,
}

impl HealthStatus {
    pub fn for_service(
        service: &str,
        dependencies: BTreeMap<String, DependencyHealth>,
    ) -> Self {
        let healthy = dependencies.values().all(DependencyHealth::is_healthy);
        Self {
            service: service.to_string(),
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            dependencies,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

impl IntoResponse for HealthStatus {
    fn into_response(self) -> Response {
        let status = if self.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_healthy_is_ok() {
        let mut deps = BTreeMap::new();
        deps.insert("database".to_string(), DependencyHealth::healthy(2));
        let health = HealthStatus::for_service("task-service", deps);
        assert!(health.is_healthy());
        assert_eq!(health.service, "task-service");
    }

    #[test]
    fn one_unhealthy_dependency_flips_status() {
        let mut deps = BTreeMap::new();
        deps.insert("database".to_string(), DependencyHealth::healthy(2));
        deps.insert(
            "user-service".to_string(),
            DependencyHealth::unhealthy("connection refused"),
        );
        let health = HealthStatus::for_service("frontend-service", deps);
        assert!(!health.is_healthy());
    }

    #[test]
    fn no_dependencies_is_healthy() {
        let health = HealthStatus::for_service("frontend-service", BTreeMap::new());
        assert!(health.is_healthy());
    }
}
