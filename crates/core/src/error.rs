//! Error types for Syllabus.
//!
//! A single error enum covers configuration, I/O, document parsing, course
//! resolution, tool dispatch, generation backend and storage failures.

use thiserror::Error;

/// Unified error type for Syllabus.
///
/// Parsing and resolution errors are recoverable and usually turned into
/// user-facing text by the caller. Backend errors abort the current query.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A course document whose header is missing or out of order
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Course-name resolution found no candidate
    #[error("No course found matching '{0}'")]
    NoMatch(String),

    /// Dispatch of a tool name that was never registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The generation backend was unreachable or returned an error
    #[error("Generation backend error: {0}")]
    GenerationBackend(String),

    /// Similarity store and index errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Session bookkeeping errors
    #[error("Session error: {0}")]
    Session(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
