use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    client::{Empty, List, ListQuery, OpenAiClient},
    ApiResponseOrError,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Assistant {
    pub id: String,
    pub object: String,
    pub created_at: u64,
    /// The name of the assistant. The maximum length is 256 characters.
    pub name: Option<String>,
    /// ID of the model to use.
    pub model: String,
    /// The system instructions that the assistant uses. The maximum length is 256,000 characters.
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    /// A set of resources that are used by the assistant's tools. The file_search tool
    /// reads from the vector stores listed here.
    pub tool_resources: Option<ToolResources>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    CodeInterpreter,
    FileSearch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_search: Option<FileSearch>,
    },
    Function {
        function: serde_json::Value,
    },
    /// A tool kind this crate does not model yet.
    #[serde(other)]
    Unknown,
}

impl Tool {
    pub fn file_search() -> Self {
        Tool::FileSearch { file_search: None }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_num_results: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ToolResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_interpreter: Option<CodeInterpreterResources>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_search: Option<FileSearchResources>,
}

impl ToolResources {
    pub fn vector_stores(vector_store_ids: Vec<String>) -> Self {
        Self {
            code_interpreter: None,
            file_search: Some(FileSearchResources { vector_store_ids }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CodeInterpreterResources {
    /// A list of file IDs made available to the `code_interpreter` tool.
    pub file_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileSearchResources {
    /// The ID of the vector store attached to this assistant. There can be a maximum of 1 vector store attached to the assistant.
    #[serde(default)]
    pub vector_store_ids: Vec<String>,
}

#[derive(Serialize, Default, Debug, Clone)]
pub struct CreateAssistantRequest {
    /// ID of the model to use.
    pub model: String,
    /// The name of the assistant. The maximum length is 256 characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The description of the assistant. The maximum length is 256 characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The system instructions that the assistant uses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// A set of tools that the assistant can use.
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

/// Partial update of an assistant. Only the fields that are set are sent.
#[derive(Serialize, Default, Debug, Clone)]
pub struct ModifyAssistantRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources>,
}

impl OpenAiClient {
    pub async fn create_assistant(
        &self,
        request: CreateAssistantRequest,
    ) -> ApiResponseOrError<Assistant> {
        self.post("assistants", request).await
    }

    pub async fn get_assistant(&self, assistant_id: &str) -> ApiResponseOrError<Assistant> {
        self.get(format!("assistants/{}", assistant_id)).await
    }

    /// Lists a single page of assistants.
    pub async fn list_assistants(&self, query: &ListQuery) -> ApiResponseOrError<List<Assistant>> {
        self.list_page("assistants", query).await
    }

    pub async fn delete_assistant(&self, assistant_id: &str) -> ApiResponseOrError<Empty> {
        self.delete(format!("assistants/{}", assistant_id)).await
    }

    pub async fn update_assistant(
        &self,
        assistant_id: &str,
        request: ModifyAssistantRequest,
    ) -> ApiResponseOrError<Assistant> {
        self.post(format!("assistants/{}", assistant_id), request)
            .await
    }
}
