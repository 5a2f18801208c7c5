use std::collections::HashMap;

use crate::{client::OpenAiClient, ApiResponseOrError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VectorStore {
    pub id: String,
    pub object: String,
    pub created_at: u64,
    pub name: Option<String>,
    #[serde(default)]
    pub usage_bytes: u64,
    pub file_counts: Option<FileCounts>,
    pub status: VectorStoreStatus,
    pub expires_after: Option<ExpiresAfter>,
    pub expires_at: Option<u64>,
    pub last_active_at: Option<u64>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FileCounts {
    pub in_progress: u32,
    pub completed: u32,
    pub failed: u32,
    pub cancelled: u32,
    pub total: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreStatus {
    Expired,
    InProgress,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExpiresAfter {
    pub anchor: String,
    pub days: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CreateVectorStoreRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_after: Option<ExpiresAfter>,
}

impl OpenAiClient {
    pub async fn create_vector_store(
        &self,
        params: CreateVectorStoreRequest,
    ) -> ApiResponseOrError<VectorStore> {
        self.post("vector_stores", params).await
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Credentials;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn create_sends_file_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vector_stores"))
            .and(body_json(json!({ "name": "uploads", "file_ids": ["file-1", "file-2"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "vs_1",
                "object": "vector_store",
                "created_at": 1700000000,
                "name": "uploads",
                "usage_bytes": 0,
                "file_counts": {
                    "in_progress": 2,
                    "completed": 0,
                    "failed": 0,
                    "cancelled": 0,
                    "total": 2
                },
                "status": "in_progress"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(Credentials::new("sk-test", server.uri())).unwrap();
        let store = client
            .create_vector_store(CreateVectorStoreRequest {
                name: "uploads".to_string(),
                file_ids: Some(vec!["file-1".to_string(), "file-2".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(store.id, "vs_1");
        assert_eq!(store.status, VectorStoreStatus::InProgress);
        assert_eq!(store.file_counts.map(|counts| counts.total), Some(2));
    }
}
