//! OpenRouter chat-completions client
//!
//! Speaks the OpenAI chat completions format, so any compatible endpoint works.
//! Every request carries the persona as its first (system) message and the
//! sampling constants from configuration.
//!
//! # Configuration
//!
//! ```toml
//! [completion]
//! endpoint = "https://openrouter.ai/api/v1/chat/completions"
//! model = "qwen/qwen3-8b:free"
//! api_key_env = "OPENROUTER_API_KEY"
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::{prompts_builtin, CompletionConfig};
use crate::conversation::ChatTurn;

use super::{CompletionBackend, CompletionError, FallbackPicker, ThreadRngPicker};

const HTTP_REFERER: HeaderName = HeaderName::from_static("http-referer");
const X_TITLE: HeaderName = HeaderName::from_static("x-title");

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Completion client used for every send in the process
pub struct CompletionClient {
    config: CompletionConfig,
    api_key: Option<String>,
    system_prompt: String,
    picker: Arc<dyn FallbackPicker>,
    transport: OnceCell<Client>,
}

impl CompletionClient {
    /// Create a client; the HTTP transport is built on first use
    pub fn new(
        config: CompletionConfig,
        api_key: Option<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            config,
            api_key,
            system_prompt: system_prompt.into(),
            picker: Arc::new(ThreadRngPicker),
            transport: OnceCell::new(),
        }
    }

    /// Replace the source of fallback randomness
    pub fn with_picker(mut self, picker: Arc<dyn FallbackPicker>) -> Self {
        self.picker = picker;
        self
    }

    async fn transport(&self) -> Result<&Client, CompletionError> {
        self.transport
            .get_or_try_init(|| async move {
                debug!(timeout_secs = self.config.timeout_secs, "Building completion transport");
                Client::builder()
                    .timeout(Duration::from_secs(self.config.timeout_secs))
                    .build()
                    .map_err(|e| CompletionError::Transport(e.to_string()))
            })
            .await
    }

    fn headers(&self) -> Result<HeaderMap, CompletionError> {
        let mut headers = HeaderMap::new();
        if let Some(ref api_key) = self.api_key {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", api_key))?);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(HTTP_REFERER, HeaderValue::from_str(&self.config.referer)?);
        headers.insert(X_TITLE, HeaderValue::from_str(&self.config.app_title)?);
        Ok(headers)
    }

    fn build_request<'a>(&'a self, history: &[ChatTurn]) -> ChatCompletionRequest<'a> {
        let sampling = self.config.sampling;
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatTurn::system(self.system_prompt.as_str()));
        messages.extend_from_slice(history);

        ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
            top_p: sampling.top_p,
            frequency_penalty: sampling.frequency_penalty,
            presence_penalty: sampling.presence_penalty,
        }
    }

    async fn request_completion(
        &self,
        client: &Client,
        headers: HeaderMap,
        history: &[ChatTurn],
    ) -> Result<String, CompletionError> {
        let request = self.build_request(history);
        debug!(
            model = request.model,
            messages = request.messages.len(),
            "🚀 Sending completion request"
        );

        let response = client
            .post(&self.config.endpoint)
            .headers(headers)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            CompletionError::InvalidResponse(format!("Failed to parse response: {} - Body: {}", e, body))
        })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::InvalidResponse("No choices in response".to_string()))?;

        Ok(choice.message.content.trim().to_string())
    }

    fn fallback(&self) -> String {
        let replies = &prompts_builtin::FALLBACK_REPLIES;
        let index = self.picker.pick(replies.len()).min(replies.len() - 1);
        replies[index].to_string()
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn generate_response(&self, history: &[ChatTurn]) -> Result<String, CompletionError> {
        let headers = self.headers()?;
        let client = self.transport().await?;

        match self.request_completion(client, headers, history).await {
            Ok(content) => {
                debug!(chars = content.chars().count(), "🤖 Completion received");
                Ok(content)
            }
            Err(e) => {
                warn!(error = %e, "Completion failed, answering with fallback");
                Ok(self.fallback())
            }
        }
    }
}
