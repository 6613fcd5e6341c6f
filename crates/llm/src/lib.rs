//! Generation backend crate for Syllabus.
//!
//! Provides a provider-agnostic abstraction for a language model that can
//! request tool invocations. Messages are ordered lists of content blocks
//! (text, tool use, tool result) and every provider maps that model onto its
//! own wire format.
//!
//! # Providers
//! - **Ollama**: Local runtime (default)
//! - **Anthropic**: Messages API
//!
//! # Example
//! ```no_run
//! use syllabus_llm::{LlmClient, LlmRequest, Message, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("llama3.2", vec![Message::user("Hello, world!")]);
//! let response = client.complete(&request).await?;
//! println!("{}", response.answer());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, create_configured_client};
pub use providers::{AnthropicClient, OllamaClient};
pub use types::{ContentBlock, Message, Role, StopReason, ToolCall, ToolSchema};
