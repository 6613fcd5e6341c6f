//! Generation client abstraction and request/response types.

use crate::types::{collect_text, ContentBlock, Message, StopReason, ToolCall, ToolSchema};
use serde::{Deserialize, Serialize};
use syllabus_core::AppResult;

/// Generation request: conversation, system instruction and optional tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Model identifier (e.g., "llama3.2", "claude-sonnet-4-20250514")
    pub model: String,

    /// Ordered conversation
    pub messages: Vec<Message>,

    /// System instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Tools the backend may invoke; empty disables tool use
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// Create a request for `model` with the given conversation.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: None,
            tools: Vec::new(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Set the system instruction.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Offer tools to the backend.
    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Whether tool use is enabled for this request.
    pub fn tools_enabled(&self) -> bool {
        !self.tools.is_empty()
    }
}

/// Generation response: either a final answer or tool invocation requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Content blocks produced by the model
    pub content: Vec<ContentBlock>,

    /// Model that generated the response
    pub model: String,

    /// Why generation stopped
    #[serde(default)]
    pub stop_reason: StopReason,

    /// Usage statistics
    #[serde(default)]
    pub usage: LlmUsage,
}

impl LlmResponse {
    /// A plain text answer.
    pub fn text(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            model: model.into(),
            stop_reason: StopReason::EndTurn,
            usage: LlmUsage::default(),
        }
    }

    /// Concatenated text blocks.
    pub fn answer(&self) -> String {
        collect_text(&self.content)
    }

    /// Tool invocations requested in this response, in order.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// True when the model stopped to have tools run and carries at least one request.
    pub fn requests_tools(&self) -> bool {
        self.stop_reason == StopReason::ToolUse
            && self
                .content
                .iter()
                .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Trait for generation backends.
///
/// Implementations translate [`LlmRequest`] to a provider's wire format and
/// map transport or API failures to `AppError::GenerationBackend`.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "ollama", "claude").
    fn provider_name(&self) -> &str;

    /// Perform one request/response round-trip.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}
