//! `OpenAI`-compatible chat completions over plain HTTP.
//!
//! One POST to `{base_url}/chat/completions` per turn, no streaming. Any
//! server speaking the same wire format works by pointing `base_url` at it.

use std::time::{Duration, Instant};

use aida_core::ChatMessage;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::provider::{ChatProvider, CompletionOptions, ProviderError, ProviderResult};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const PROVIDER_NAME: &str = "openai";
const DEFAULT_RETRY_AFTER_MS: u64 = 1_000;

/// Connection settings for [`OpenAiChatProvider`].
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Bearer token.
    pub api_key: String,
    /// API root without the trailing `/chat/completions`.
    pub base_url: String,
    /// Default model id.
    pub model: String,
    /// Whole-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl OpenAiConfig {
    /// Config against the public endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            timeout: None,
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Non-streaming `OpenAI` chat completions client.
pub struct OpenAiChatProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
    url: String,
}

impl OpenAiChatProvider {
    /// Build the HTTP client.
    pub fn new(config: OpenAiConfig) -> ProviderResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        info!(model = %config.model, base_url = %config.base_url, "OpenAI provider initialized");

        Ok(Self {
            config,
            client,
            url,
        })
    }

    fn build_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", self.config.api_key);
        let _ = headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| ProviderError::Auth {
                message: format!("Invalid authorization header: {e}"),
            })?,
        );
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> ProviderResult<Option<String>> {
        let request = ChatCompletionRequest {
            model: &options.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .headers(self.build_headers()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = retry_after_ms(response.headers());
            let body_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body_text, retry_after_ms));
        }

        let body: ChatCompletionResponse = serde_json::from_str(&response.text().await?)?;
        Ok(first_content(body))
    }
}

fn first_content(body: ChatCompletionResponse) -> Option<String> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn retry_after_ms(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or(DEFAULT_RETRY_AFTER_MS, |secs| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let ms = (secs * 1000.0).round() as u64;
            ms
        })
}

fn status_error(status: StatusCode, body: &str, retry_after_ms: u64) -> ProviderError {
    let (message, code, retryable) = parse_api_error(body, status.as_u16());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth { message },
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            retry_after_ms,
            message,
        },
        _ => ProviderError::Api {
            status: status.as_u16(),
            message,
            code,
            retryable,
        },
    }
}

/// Parse an API error response body.
fn parse_api_error(body: &str, status: u16) -> (String, Option<String>, bool) {
    let retryable = status == 429 || status >= 500;
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let error = &json["error"];
        let message = error["message"]
            .as_str()
            .unwrap_or("Unknown error")
            .to_string();
        let code = error["code"]
            .as_str()
            .or_else(|| error["type"].as_str())
            .map(String::from);
        (message, code, retryable)
    } else {
        (format!("HTTP {status}: {body}"), None, retryable)
    }
}

#[async_trait]
impl ChatProvider for OpenAiChatProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> ProviderResult<Option<String>> {
        debug!(
            model = %options.model,
            message_count = messages.len(),
            "requesting chat completion"
        );
        let started = Instant::now();
        let result = self.send(messages, options).await;

        let status = match &result {
            Ok(_) => "ok",
            Err(e) => e.category(),
        };
        metrics::counter!("provider_requests_total", "provider" => PROVIDER_NAME, "status" => status)
            .increment(1);
        metrics::histogram!("provider_request_duration_seconds", "provider" => PROVIDER_NAME)
            .record(started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            warn!(error = %e, category = e.category(), "chat completion failed");
        }
        result
    }
}
