use serde_json::{json, Value};

use crate::client::{ClientResult, RequestOptions, ServiceClient};

/// Client for the Task Service. Every call forwards the caller's session
/// token as a bearer header; the Task Service does its own verification.
#[derive(Debug, Clone)]
pub struct TaskServiceClient {
    client: ServiceClient,
    base_url: String,
}

impl TaskServiceClient {
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

    /// List tasks, optionally filtered: `status`, `priority`, or
    /// `filter=overdue|due_soon`.
    pub async fn get_user_tasks(&self, token: &str, filters: &[(&str, &str)]) -> ClientResult {
        let query = filters
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.client
            .get(
                &format!("{}/api/v1/tasks", self.base_url),
                RequestOptions::bearer(token).with_query(query),
            )
            .await
    }

    pub async fn get_task(&self, token: &str, task_id: i64) -> ClientResult {
        self.client
            .get(
                &format!("{}/api/v1/tasks/{task_id}", self.base_url),
                RequestOptions::bearer(token),
            )
            .await
    }

    pub async fn create_task(&self, token: &str, task: Value) -> ClientResult {
        self.client
            .post(
                &format!("{}/api/v1/tasks", self.base_url),
                RequestOptions::bearer(token).with_body(json!({ "task": task })),
            )
            .await
    }

    pub async fn update_task(&self, token: &str, task_id: i64, task: Value) -> ClientResult {
        self.client
            .put(
                &format!("{}/api/v1/tasks/{task_id}", self.base_url),
                RequestOptions::bearer(token).with_body(json!({ "task": task })),
            )
            .await
    }

    pub async fn update_task_status(&self, token: &str, task_id: i64, status: &str) -> ClientResult {
        self.client
            .patch(
                &format!("{}/api/v1/tasks/{task_id}/status", self.base_url),
                RequestOptions::bearer(token).with_body(json!({ "status": status })),
            )
            .await
    }

    pub async fn complete_task(&self, token: &str, task_id: i64) -> ClientResult {
        self.client
            .patch(
                &format!("{}/api/v1/tasks/{task_id}/complete", self.base_url),
                RequestOptions::bearer(token),
            )
            .await
    }

    pub async fn delete_task(&self, token: &str, task_id: i64) -> ClientResult {
        self.client
            .delete(
                &format!("{}/api/v1/tasks/{task_id}", self.base_url),
                RequestOptions::bearer(token),
            )
            .await
    }

    pub async fn get_task_statistics(&self, token: &str) -> ClientResult {
        self.client
            .get(
                &format!("{}/api/v1/tasks/statistics", self.base_url),
                RequestOptions::bearer(token),
            )
            .await
    }
}
