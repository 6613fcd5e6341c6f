//! Ollama provider implementation.
//!
//! Uses the chat endpoint, which accepts function tools.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::{ContentBlock, StopReason, ToolSchema};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use syllabus_core::{AppError, AppResult};

/// Ollama chat request format.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OllamaTool>,
    options: OllamaOptions,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OllamaFunction,
}

#[derive(Debug, Serialize)]
struct OllamaFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Ollama chat response format.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: OllamaMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama generation client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:11434")
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Convert LlmRequest to Ollama chat format.
    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaChatRequest {
        let mut messages = Vec::new();

        if let Some(system) = &request.system {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system.clone(),
                tool_calls: Vec::new(),
            });
        }

        for message in &request.messages {
            let mut text = String::new();
            let mut tool_calls = Vec::new();

            for block in &message.content {
                match block {
                    ContentBlock::Text { text: t } => text.push_str(t),
                    ContentBlock::ToolUse { name, input, .. } => tool_calls.push(OllamaToolCall {
                        function: OllamaFunctionCall {
                            name: name.clone(),
                            arguments: input.clone(),
                        },
                    }),
                    // Ollama expects each tool result as its own "tool" message
                    ContentBlock::ToolResult { content, .. } => messages.push(OllamaMessage {
                        role: "tool".to_string(),
                        content: content.clone(),
                        tool_calls: Vec::new(),
                    }),
                    ContentBlock::Unsupported => {}
                }
            }

            if !text.is_empty() || !tool_calls.is_empty() {
                messages.push(OllamaMessage {
                    role: message.role.as_str().to_string(),
                    content: text,
                    tool_calls,
                });
            }
        }

        OllamaChatRequest {
            model: request.model.clone(),
            messages,
            tools: request.tools.iter().map(to_ollama_tool).collect(),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream: false,
        }
    }

    /// Convert Ollama response to LlmResponse.
    fn convert_response(&self, response: OllamaChatResponse) -> LlmResponse {
        let usage = LlmUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        let mut content = Vec::new();
        if !response.message.content.is_empty() {
            content.push(ContentBlock::text(response.message.content));
        }

        // Ollama does not assign call ids; number them so results can be paired
        let has_tool_calls = !response.message.tool_calls.is_empty();
        for (i, call) in response.message.tool_calls.into_iter().enumerate() {
            content.push(ContentBlock::ToolUse {
                id: format!("call_{}", i),
                name: call.function.name,
                input: call.function.arguments,
            });
        }

        let stop_reason = if has_tool_calls {
            StopReason::ToolUse
        } else if response.done_reason.as_deref() == Some("length") {
            StopReason::MaxTokens
        } else {
            StopReason::EndTurn
        };

        LlmResponse {
            content,
            model: response.model,
            stop_reason,
            usage,
        }
    }
}

fn to_ollama_tool(schema: &ToolSchema) -> OllamaTool {
    OllamaTool {
        kind: "function",
        function: OllamaFunction {
            name: schema.name.clone(),
            description: schema.description.clone(),
            parameters: schema.input_schema.clone(),
        },
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(
            tools = request.tools.len(),
            messages = request.messages.len(),
            "Sending chat request to Ollama"
        );
        tracing::debug!("Request: {:?}", request);

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| {
                AppError::GenerationBackend(format!("Failed to send request to Ollama: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::GenerationBackend(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let ollama_response: OllamaChatResponse = response.json().await.map_err(|e| {
            AppError::GenerationBackend(format!("Failed to parse Ollama response: {}", e))
        })?;

        tracing::info!("Received chat response from Ollama");
        tracing::debug!("Response: {:?}", ollama_response);

        Ok(self.convert_response(ollama_response))
    }
}
