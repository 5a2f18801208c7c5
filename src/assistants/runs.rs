use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    assistants::{messages::CreateMessageRequest, Tool},
    client::OpenAiClient,
    ApiResponseOrError, ChatError, Usage,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Run {
    pub id: String,
    pub object: String,
    pub created_at: u64,
    /// The ID of the assistant used for this run.
    pub assistant_id: String,
    /// The ID of the thread associated with this run.
    pub thread_id: String,
    /// The status of the run.
    pub status: RunStatus,
    /// The last error that occurred during this run.
    pub last_error: Option<LastError>,
    pub expires_at: Option<u64>,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub cancelled_at: Option<u64>,
    pub failed_at: Option<u64>,
    /// The model used for this run.
    pub model: Option<String>,
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    pub usage: Option<Usage>,
    pub metadata: Option<HashMap<String, String>>,
}

/// Lifecycle state of a run as reported by the provider.
///
/// Statuses this crate does not know about are kept verbatim in `Other`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    Other(String),
}

impl RunStatus {
    /// Queued and in-progress runs are still being worked on; every other
    /// status ends the poll.
    pub fn is_pending(&self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::InProgress)
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Other(status) => status,
        }
    }
}

impl From<String> for RunStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "requires_action" => RunStatus::RequiresAction,
            "cancelling" => RunStatus::Cancelling,
            "cancelled" => RunStatus::Cancelled,
            "failed" => RunStatus::Failed,
            "completed" => RunStatus::Completed,
            "incomplete" => RunStatus::Incomplete,
            "expired" => RunStatus::Expired,
            _ => RunStatus::Other(value),
        }
    }
}

impl From<RunStatus> for String {
    fn from(value: RunStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LastError {
    pub code: String,
    pub message: String,
}

#[derive(Serialize, Builder, Debug, Clone, Default)]
#[builder(pattern = "owned")]
#[builder(name = "CreateRunBuilder")]
#[builder(setter(strip_option, into))]
pub struct CreateRunRequest {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub additional_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub additional_messages: Option<Vec<CreateMessageRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub max_completion_tokens: Option<u32>,
}

impl CreateRunRequest {
    pub fn new(assistant_id: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            ..Default::default()
        }
    }
}

/// How often and for how long [`OpenAiClient::poll_run`] re-fetches a run.
///
/// The default polls every second with no upper bound on the total wait.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Wait before the second fetch.
    pub interval: Duration,
    /// Factor applied to the wait after every fetch. `1.0` keeps it fixed.
    pub backoff: f64,
    /// Upper bound for a single wait once backoff has grown it.
    pub max_interval: Duration,
    /// Give up with [`ChatError::PollTimeout`] once this much time has passed.
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            backoff: 1.0,
            max_interval: Duration::from_secs(30),
            max_wait: None,
        }
    }
}

impl PollPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff <= 1.0 {
            return current;
        }
        let cap = self.max_interval.max(self.interval);
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff)
            .map_or(cap, |next| next.min(cap))
    }
}

impl OpenAiClient {
    pub async fn create_run(
        &self,
        thread_id: &str,
        request: CreateRunRequest,
    ) -> ApiResponseOrError<Run> {
        self.post(format!("threads/{thread_id}/runs"), request)
            .await
    }

    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> ApiResponseOrError<Run> {
        self.get(format!("threads/{thread_id}/runs/{run_id}")).await
    }

    /// Fetches the run until its status is neither queued nor in progress and
    /// returns it in that state.
    ///
    /// The first fetch happens immediately; each later one waits for the
    /// policy's current interval. Cancelling `cancel` stops the loop between
    /// fetches, it does not cancel the run on the provider side.
    pub async fn poll_run(
        &self,
        thread_id: &str,
        run_id: &str,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<Run, ChatError> {
        let started = Instant::now();
        let mut interval = policy.interval;
        let mut run = self.get_run(thread_id, run_id).await?;

        while run.status.is_pending() {
            tracing::debug!(run_id, status = %run.status, "Run still pending");

            let mut wait = interval;
            if let Some(max_wait) = policy.max_wait {
                let waited = started.elapsed();
                if waited >= max_wait {
                    tracing::warn!(run_id, ?waited, "Gave up polling run");
                    return Err(ChatError::PollTimeout { waited });
                }
                wait = wait.min(max_wait - waited);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(ChatError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }

            run = self.get_run(thread_id, run_id).await?;
            interval = policy.next_interval(interval);
        }

        tracing::info!(run_id, status = %run.status, "Run finished");
        Ok(run)
    }
}
