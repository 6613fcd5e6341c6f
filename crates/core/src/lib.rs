//! Syllabus Core Library
//!
//! Foundational utilities shared by every Syllabus crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management, including the retrieval limits (`RagConfig`)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, RagConfig};
pub use error::{AppError, AppResult};
