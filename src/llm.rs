//! Client for the OpenAI-compatible chat completions API.
//!
//! One request per call, no retries. Callers only see text: either the
//! model's reply or a fixed apology, with the real failure logged here.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::config::{LlmConfig, LLM_USER_AGENT};

/// Returned when the provider answers with a non-success status
pub const UPSTREAM_ERROR_REPLY: &str = "Xin lỗi, tôi đang gặp vấn đề kỹ thuật. Vui lòng thử lại sau.";

/// Returned when the request could not be sent or the reply could not be read
pub const REQUEST_ERROR_REPLY: &str = "Xin lỗi, đã có lỗi xảy ra khi xử lý yêu cầu của bạn.";

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Response contained no choices")]
    EmptyResponse,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// The fixed text shown to the user for this failure.
    pub fn fallback_reply(&self) -> &'static str {
        match self {
            LlmError::Status { .. } => UPSTREAM_ERROR_REPLY,
            _ => REQUEST_ERROR_REPLY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatCompletionMessage,
}

/// Shared LLM client; cheap to clone.
#[derive(Clone)]
pub struct LlmClient {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "http-referer",
            HeaderValue::from_str(&config.site_url)
                .map_err(|e| LlmError::Config(format!("Invalid site_url: {}", e)))?,
        );
        headers.insert(
            "x-title",
            HeaderValue::from_str(&config.site_name)
                .map_err(|e| LlmError::Config(format!("Invalid site_name: {}", e)))?,
        );

        let http_client = reqwest::Client::builder()
            .user_agent(LLM_USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            tracing::warn!("No LLM API key configured; provider requests will be unauthenticated");
        }

        Ok(Self {
            http_client,
            endpoint: config.completions_url(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a single-turn prompt and return the reply text.
    #[tracing::instrument(name = "llm::complete", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    pub async fn try_complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatCompletionMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let mut request = self.http_client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let reply = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        tracing::debug!(reply_len = reply.len(), "Completion received");
        Ok(reply)
    }

    /// Like [`try_complete`](Self::try_complete), but failures become a fixed apology.
    pub async fn complete(&self, prompt: &str) -> String {
        match self.try_complete(prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "Error calling LLM provider");
                e.fallback_reply().to_string()
            }
        }
    }
}
