//! One chat-completion round trip against the endpoint under test.
//!
//! Probes talk to the endpoint only through the [`Exchange`] trait so they can
//! be driven by canned responses in tests. [`HttpExchange`] is the real
//! implementation: it applies the per-request timeout and the retry/backoff
//! policy, and folds streamed and non-streamed bodies into one
//! [`ExchangeResponse`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ChatCompletion, ChatRequest};
use crate::core::stream::collect_stream_chunks;
use crate::utils::url::construct_api_url;

const UNSUPPORTED_MODEL_CODE: &str = "model_not_supported";
const UNSUPPORTED_MODEL_TEXT: &str = "The requested model is not supported";
const UNSUPPORTED_MODEL_MESSAGE: &str = "Model not supported";

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Transport(reqwest::Error),

    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout
        } else {
            ExchangeError::Transport(err)
        }
    }
}

impl ExchangeError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ExchangeError::Status { status: 429, .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExchangeError::Timeout)
    }

    /// Whether the endpoint rejected the model itself rather than the request.
    pub fn is_unsupported_model(&self) -> bool {
        let message = self.to_string();
        message.to_lowercase().contains(UNSUPPORTED_MODEL_CODE)
            || message.contains(UNSUPPORTED_MODEL_TEXT)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeResponse {
    /// A single JSON document, which may carry `error` instead of `choices`.
    Completion(Value),
    /// Decoded `data:` events in arrival order.
    Stream(Vec<Value>),
    /// Synthesised when the endpoint reports the model as unsupported.
    Unsupported { message: String },
}

impl ExchangeResponse {
    /// The endpoint-declared error, if the response carries one.
    pub fn error_message(&self) -> Option<String> {
        match self {
            ExchangeResponse::Completion(value) => match value.get("error") {
                None | Some(Value::Null) => None,
                Some(_) => Some(
                    extract_error_summary(value)
                        .filter(|summary| !summary.is_empty())
                        .unwrap_or_else(|| "Unknown error".to_string()),
                ),
            },
            ExchangeResponse::Stream(_) => None,
            ExchangeResponse::Unsupported { message } => Some(message.clone()),
        }
    }

    pub fn completion(&self) -> Result<ChatCompletion, ExchangeError> {
        match self {
            ExchangeResponse::Completion(value) => {
                Ok(serde_json::from_value::<ChatCompletion>(value.clone())?)
            }
            ExchangeResponse::Stream(_) | ExchangeResponse::Unsupported { .. } => {
                Ok(ChatCompletion::default())
            }
        }
    }

    pub fn chunks(&self) -> &[Value] {
        match self {
            ExchangeResponse::Stream(chunks) => chunks,
            _ => &[],
        }
    }
}

fn extract_error_summary(value: &Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                Value::String(s) => Some(s.to_string()),
                Value::Object(map) => map
                    .get("code")
                    .and_then(|code| code.as_str().map(str::to_owned)),
                _ => None,
            })
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Performs one chat-completion exchange. Streaming is selected by
/// [`ChatRequest::stream`].
#[async_trait]
pub trait Exchange: Send + Sync {
    async fn exchange(&self, request: &ChatRequest) -> Result<ExchangeResponse, ExchangeError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Backoff after the zero-based `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(1))
    }
}

pub struct HttpExchange {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpExchange {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            timeout,
            retry,
        }
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<ExchangeResponse, ExchangeError> {
        let chat_url = construct_api_url(&self.base_url, "chat/completions");
        let mut http_request = self
            .client
            .post(chat_url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json");

        if let Some(api_key) = &self.api_key {
            http_request = http_request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = http_request.json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(ExchangeError::Status { status, body });
        }

        if request.stream {
            let chunks = collect_stream_chunks(response).await?;
            debug!(model = %request.model, chunks = chunks.len(), "Stream finished");
            Ok(ExchangeResponse::Stream(chunks))
        } else {
            let body = response.bytes().await?;
            let value = serde_json::from_slice::<Value>(&body)?;
            Ok(ExchangeResponse::Completion(value))
        }
    }
}

#[async_trait]
impl Exchange for HttpExchange {
    async fn exchange(&self, request: &ChatRequest) -> Result<ExchangeResponse, ExchangeError> {
        let mut attempt = 0;
        loop {
            let err = match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if !err.is_timeout() && err.is_unsupported_model() {
                debug!(model = %request.model, error = %err, "Endpoint does not support model");
                return Ok(ExchangeResponse::Unsupported {
                    message: UNSUPPORTED_MODEL_MESSAGE.to_string(),
                });
            }

            attempt += 1;
            if attempt >= self.retry.max_attempts {
                return Err(err);
            }

            let delay = self.retry.delay_for(attempt - 1);
            warn!(
                model = %request.model,
                attempt,
                max_attempts = self.retry.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Exchange failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
