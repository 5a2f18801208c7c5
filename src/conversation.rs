//! The two chat flows behind `/api/chat`: analysing uploaded files with a
//! file-search assistant, and answering a text message either inside an
//! existing assistant thread or with a one-shot completion.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    assistants::{
        files::FilePurpose,
        messages::{Attachment, CreateMessageRequest},
        runs::{CreateRunRequest, PollPolicy, RunStatus},
        threads::CreateThreadRequest,
        vector_stores::CreateVectorStoreRequest,
        Assistant, CreateAssistantRequest, ModifyAssistantRequest, Tool, ToolResources,
    },
    chat::{ChatCompletion, ChatMessage},
    client::{ListQuery, OpenAiClient},
    ChatError,
};

pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
pub const DEFAULT_ASSISTANT_NAME: &str = "File Search Assistant";
pub const ASSISTANT_INSTRUCTIONS: &str = "You are a helpful assistant that can search and analyze uploaded files. Provide detailed insights and answer questions about the file contents.";
pub const ANALYSIS_PROMPT: &str =
    "Please analyze these files and provide insights about their contents.";

/// Where uploaded files are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileScope {
    /// Files ride on the analysis message and are only searchable in that
    /// thread.
    #[default]
    Thread,
    /// Files replace the shared assistant's vector store. Uploads are
    /// serialized so one request's files are the ones its run sees.
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    /// A provisioned assistant to use as is. When unset the assistant is
    /// looked up by `assistant_name` and created if missing.
    pub assistant_id: Option<String>,
    pub assistant_name: String,
    pub file_scope: FileScope,
    pub poll: PollPolicy,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            assistant_id: None,
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
            file_scope: FileScope::default(),
            poll: PollPolicy::default(),
        }
    }
}

/// One file part of an upload, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub assistant_id: Option<String>,
}

impl ConverseRequest {
    fn thread(&self) -> Option<(&str, &str)> {
        match (self.thread_id.as_deref(), self.assistant_id.as_deref()) {
            (Some(thread_id), Some(assistant_id))
                if !thread_id.is_empty() && !assistant_id.is_empty() =>
            {
                Some((thread_id, assistant_id))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_ids: Option<Vec<String>>,
}

impl ChatReply {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct ChatService {
    client: OpenAiClient,
    settings: ChatSettings,
    attach_lock: Mutex<()>,
}

impl ChatService {
    pub fn new(client: OpenAiClient, settings: ChatSettings) -> Self {
        Self {
            client,
            settings,
            attach_lock: Mutex::new(()),
        }
    }

    pub fn client(&self) -> &OpenAiClient {
        &self.client
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Returns the file search assistant.
    ///
    /// Without a configured id only the newest assistant is inspected, so an
    /// older one with the same name is not found and a duplicate is created.
    pub async fn assistant(&self) -> Result<Assistant, ChatError> {
        if let Some(assistant_id) = &self.settings.assistant_id {
            let assistant = self.client.get_assistant(assistant_id).await?;
            tracing::info!(assistant_id = %assistant.id, "Using configured assistant");
            return Ok(assistant);
        }

        let page = self.client.list_assistants(&ListQuery::newest(1)).await?;
        if let Some(existing) = page
            .data
            .into_iter()
            .find(|assistant| assistant.name.as_deref() == Some(self.settings.assistant_name.as_str()))
        {
            tracing::info!(assistant_id = %existing.id, "Using existing assistant");
            return Ok(existing);
        }

        let assistant = self
            .client
            .create_assistant(CreateAssistantRequest {
                model: self.settings.model.clone(),
                name: Some(self.settings.assistant_name.clone()),
                instructions: Some(ASSISTANT_INSTRUCTIONS.to_string()),
                tools: vec![Tool::file_search()],
                ..Default::default()
            })
            .await?;
        tracing::info!(assistant_id = %assistant.id, "Created new assistant");
        Ok(assistant)
    }

    /// Uploads the files, asks the assistant to analyse them in a new thread
    /// and returns its answer along with the ids needed to continue.
    pub async fn analyze_files(
        &self,
        parts: Vec<UploadPart>,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, ChatError> {
        tracing::info!("Processing {} files", parts.len());
        let file_ids = self.upload_all(parts).await?;
        if file_ids.is_empty() {
            return Err(ChatError::NoFilesUploaded);
        }

        let assistant = self.assistant().await?;
        let thread = self.client.create_thread(CreateThreadRequest::default()).await?;
        tracing::info!(thread_id = %thread.id, "Created thread");

        let mut prompt = CreateMessageRequest::user(ANALYSIS_PROMPT);
        let attach_guard = match self.settings.file_scope {
            FileScope::Thread => {
                prompt.attachments = Some(
                    file_ids
                        .iter()
                        .map(|file_id| Attachment::file_search(file_id.as_str()))
                        .collect(),
                );
                None
            }
            FileScope::Assistant => {
                let guard = self.attach_lock.lock().await;
                self.attach_to_assistant(&assistant.id, &file_ids).await?;
                Some(guard)
            }
        };

        self.client.create_message(&thread.id, prompt).await?;
        let run = self
            .client
            .create_run(&thread.id, CreateRunRequest::new(assistant.id.as_str()))
            .await?;
        tracing::info!(run_id = %run.id, "Started run");
        drop(attach_guard);

        let message = self.finish_run(&thread.id, &run.id, cancel).await?;
        tracing::info!("Analysis complete");

        Ok(ChatReply {
            message,
            thread_id: Some(thread.id),
            assistant_id: Some(assistant.id),
            file_ids: Some(file_ids),
        })
    }

    /// Answers a text message, continuing the given thread when both ids are
    /// present and falling back to a stateless completion otherwise.
    pub async fn converse(
        &self,
        request: ConverseRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, ChatError> {
        let Some((thread_id, assistant_id)) = request.thread() else {
            return self.complete(&request.message).await.map(ChatReply::text);
        };

        self.client
            .create_message(thread_id, CreateMessageRequest::user(request.message.as_str()))
            .await?;
        let run = self
            .client
            .create_run(thread_id, CreateRunRequest::new(assistant_id))
            .await?;
        let message = self.finish_run(thread_id, &run.id, cancel).await?;
        Ok(ChatReply::text(message))
    }

    /// One-shot completion with the message as the only user turn.
    pub async fn complete(&self, message: &str) -> Result<String, ChatError> {
        let completion = ChatCompletion::builder(&self.settings.model, [ChatMessage::user(message)])
            .create(&self.client)
            .await?;
        Ok(completion.first_content())
    }

    async fn upload_all(&self, parts: Vec<UploadPart>) -> Result<Vec<String>, ChatError> {
        let mut file_ids = Vec::with_capacity(parts.len());
        for part in parts {
            tracing::info!("Processing file: {} ({})", part.filename, part.content_type);
            let file = self
                .client
                .upload_file(&part.filename, &part.content_type, part.bytes, FilePurpose::Assistants)
                .await
                .inspect_err(|e| tracing::error!("Error uploading file {}: {}", part.filename, e))?;
            tracing::info!(file_id = %file.id, "File uploaded");
            file_ids.push(file.id);
        }
        Ok(file_ids)
    }

    async fn attach_to_assistant(
        &self,
        assistant_id: &str,
        file_ids: &[String],
    ) -> Result<(), ChatError> {
        let vector_store = self
            .client
            .create_vector_store(CreateVectorStoreRequest {
                name: format!("{} uploads", self.settings.assistant_name),
                file_ids: Some(file_ids.to_vec()),
                ..Default::default()
            })
            .await?;
        self.client
            .update_assistant(
                assistant_id,
                ModifyAssistantRequest {
                    tool_resources: Some(ToolResources::vector_stores(vec![vector_store.id])),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(assistant_id, "Updated assistant with files");
        Ok(())
    }

    /// Polls the run and, once completed, returns the text of the thread's
    /// newest message.
    async fn finish_run(
        &self,
        thread_id: &str,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ChatError> {
        let run = self
            .client
            .poll_run(thread_id, run_id, &self.settings.poll, cancel)
            .await?;
        if run.status != RunStatus::Completed {
            return Err(ChatError::RunFailed {
                status: run.status.to_string(),
            });
        }

        let messages = self
            .client
            .list_messages(thread_id, &ListQuery::newest(1))
            .await?;
        messages
            .data
            .first()
            .map(|message| message.text())
            .ok_or(ChatError::EmptyThread)
    }
}
