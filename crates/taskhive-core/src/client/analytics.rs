use serde_json::{json, Value};

use crate::client::{ClientResult, RequestOptions, ServiceClient};

/// Client for the Analytics Service: event tracking and dashboard reads.
#[derive(Debug, Clone)]
pub struct AnalyticsServiceClient {
    client: ServiceClient,
    base_url: String,
}

impl AnalyticsServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: ServiceClient::new(),
            base_url: base_url.into(),
        }
    }

    pub fn with_client(mut self, client: ServiceClient) -> Self {
        self.client = client;
        self
    }

    pub async fn health_check(&self) -> ClientResult {
        self.client
            .get(
                &format!("{}/api/v1/health", self.base_url),
                RequestOptions::default(),
            )
            .await
    }

    pub async fn track_event(
        &self,
        token: &str,
        event_type: &str,
        user_id: i64,
        task_id: Option<i64>,
        data: Value,
    ) -> ClientResult {
        self.client
            .post(
                &format!("{}/api/v1/analytics/events", self.base_url),
                RequestOptions::bearer(token).with_body(json!({
                    "event": {
                        "event_type": event_type,
                        "user_id": user_id,
                        "task_id": task_id,
                        "data": data,
                    }
                })),
            )
            .await
    }

    pub async fn get_dashboard_summary(&self, token: &str) -> ClientResult {
        self.client
            .get(
                &format!("{}/api/v1/analytics/dashboard", self.base_url),
                RequestOptions::bearer(token),
            )
            .await
    }
}
