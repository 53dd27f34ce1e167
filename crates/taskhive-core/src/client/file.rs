use serde_json::{json, Value};

use crate::client::{ClientResult, RequestOptions, ServiceClient};

/// Client for the File Service. Service-internal: the File Service does
/// not verify sessions, so no token plumbing is needed.
#[derive(Debug, Clone)]
pub struct FileServiceClient {
    client: ServiceClient,
    base_url: String,
}

impl FileServiceClient {
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

    pub async fn get_user_files(&self, user_id: i64) -> ClientResult {
        self.client
            .get(
                &format!("{}/api/v1/file_attachments", self.base_url),
                RequestOptions::default()
                    .with_query(vec![("user_id".to_string(), user_id.to_string())]),
            )
            .await
    }

    pub async fn create_file_attachment(&self, attachment: Value) -> ClientResult {
        self.client
            .post(
                &format!("{}/api/v1/file_attachments", self.base_url),
                RequestOptions::default().with_body(json!({ "file_attachment": attachment })),
            )
            .await
    }

    pub async fn delete_file(&self, file_id: i64) -> ClientResult {
        self.client
            .delete(
                &format!("{}/api/v1/file_attachments/{file_id}", self.base_url),
                RequestOptions::default(),
            )
            .await
    }

    pub async fn get_file_categories(&self) -> ClientResult {
        self.client
            .get(
                &format!("{}/api/v1/file_categories", self.base_url),
                RequestOptions::default(),
            )
            .await
    }
}
