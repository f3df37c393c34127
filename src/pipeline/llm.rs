//! Text completion: send one prompt to a chat-completions endpoint.
//!
//! The pipeline only needs "prompt in, reply text out", so that is all
//! [`CompletionClient`] promises. [`OpenAiChatClient`] implements it over
//! HTTP; tests substitute scripted fakes.
//!
//! There is no retry. A timeout, a non-2xx status or an undecodable body is
//! logged and returned as an error, and the caller abandons the document.

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Anything that can turn a prompt into reply text.
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` and return the raw text of the reply.
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ExtractError>>;
}

/// Chat-completions client speaking the OpenAI wire format.
pub struct OpenAiChatClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl std::fmt::Debug for OpenAiChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OpenAiChatClient {
    /// Build a client from the configuration. Fails without a non-empty API key.
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ExtractError::MissingCredential)?
            .to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            timeout_secs: config.api_timeout_secs,
        })
    }

    async fn send(&self, prompt: &str) -> Result<String, ExtractError> {
        let start = Instant::now();
        let request = build_request(&self.model, prompt);
        info!("Calling LLM ({}) with {} prompt characters", self.model, prompt.chars().count());

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = api_error_message(&body);
            let err = if status.as_u16() == 401 || status.as_u16() == 403 {
                ExtractError::AuthError {
                    status: status.as_u16(),
                    detail,
                }
            } else {
                ExtractError::LlmApiError {
                    status: Some(status.as_u16()),
                    message: format!("HTTP {}: {}", status, detail),
                }
            };
            error!("Error calling LLM API: {}", err);
            return Err(err);
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            let err = if e.is_timeout() {
                ExtractError::ApiTimeout {
                    secs: self.timeout_secs,
                }
            } else {
                ExtractError::LlmApiError {
                    status: Some(status.as_u16()),
                    message: format!("undecodable response body: {}", e),
                }
            };
            error!("Error calling LLM API: {}", err);
            err
        })?;

        let reply = reply_text(body)?;
        debug!(
            "LLM replied with {} characters in {:?}",
            reply.chars().count(),
            start.elapsed()
        );
        Ok(reply)
    }

    fn transport_error(&self, e: reqwest::Error) -> ExtractError {
        let err = if e.is_timeout() {
            ExtractError::ApiTimeout {
                secs: self.timeout_secs,
            }
        } else {
            ExtractError::LlmApiError {
                status: None,
                message: e.to_string(),
            }
        };
        error!("Error calling LLM API: {}", err);
        err
    }
}

impl CompletionClient for OpenAiChatClient {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ExtractError>> {
        Box::pin(self.send(prompt))
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// One user message carrying the whole prompt, JSON-object output requested.
fn build_request<'a>(model: &'a str, prompt: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
        response_format: ResponseFormat {
            kind: "json_object",
        },
    }
}

/// Content of the first choice.
fn reply_text(body: ChatResponse) -> Result<String, ExtractError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| {
            error!("LLM API returned no content");
            ExtractError::EmptyReply
        })
}

/// Prefer the API's own error message; fall back to the raw body, truncated.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.chars().take(300).collect(),
    }
}
