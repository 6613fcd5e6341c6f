//! Command handlers for the Syllabus CLI.
//!
//! Each command lives in its own submodule.

pub mod ask;
pub mod chat;
pub mod courses;
pub mod ingest;
pub mod outline;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use courses::CoursesCommand;
pub use ingest::IngestCommand;
pub use outline::OutlineCommand;
