//! Generation backend implementations.

pub mod anthropic;
pub mod ollama;

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;
