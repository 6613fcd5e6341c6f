//! Anthropic provider implementation.
//!
//! Talks to the Messages API. Content blocks already use the Anthropic wire
//! shape, so messages are forwarded as-is.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::{ContentBlock, Message, StopReason, ToolSchema};
use serde::{Deserialize, Serialize};
use syllabus_core::{AppError, AppResult};

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
const DEFAULT_API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 800;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [ToolSchema],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    model: String,
    #[serde(default)]
    stop_reason: Option<StopReason>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    api_version: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a client against the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_ENDPOINT, api_key)
    }

    /// Create a client against a custom endpoint (proxies, test servers).
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the `anthropic-version` header.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    fn to_messages_request<'a>(&self, request: &'a LlmRequest) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: &request.messages,
            system: request.system.as_deref(),
            tools: &request.tools,
            tool_choice: request
                .tools_enabled()
                .then_some(ToolChoice { kind: "auto" }),
            temperature: request.temperature,
        }
    }

    fn convert_response(&self, response: MessagesResponse) -> LlmResponse {
        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        LlmResponse {
            content: response
                .content
                .into_iter()
                .filter(|block| !matches!(block, ContentBlock::Unsupported))
                .collect(),
            model: response.model,
            stop_reason: response.stop_reason.unwrap_or_default(),
            usage,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(
            model = %request.model,
            tools = request.tools.len(),
            messages = request.messages.len(),
            "Sending request to Anthropic"
        );

        let body = self.to_messages_request(request);
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::GenerationBackend(format!("Failed to send request to Anthropic: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = match serde_json::from_str::<ErrorEnvelope>(&error_text) {
                Ok(envelope) => format!("{}: {}", envelope.error.kind, envelope.error.message),
                Err(_) => error_text,
            };
            return Err(AppError::GenerationBackend(format!(
                "Anthropic API error ({}): {}",
                status, detail
            )));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            AppError::GenerationBackend(format!("Failed to parse Anthropic response: {}", e))
        })?;

        tracing::debug!(stop_reason = ?parsed.stop_reason, "Received response from Anthropic");

        Ok(self.convert_response(parsed))
    }
}
