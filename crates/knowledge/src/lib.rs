//! Course-materials retrieval and question answering.
//!
//! Course documents are parsed, chunked and stored in a local SQLite
//! similarity index. Queries go through a two-round tool-calling exchange
//! with a generation backend that may search course content or fetch a
//! course outline before answering.

pub mod assistant;
pub mod catalog;
pub mod chunker;
pub mod content;
pub mod embeddings;
pub mod orchestrator;
pub mod parser;
pub mod resolver;
pub mod session;
pub mod store;
pub mod tools;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use assistant::CourseAssistant;
pub use catalog::CatalogIndex;
pub use chunker::Chunker;
pub use content::{ContentFilter, ContentIndex};
pub use embeddings::{Embedder, TrigramEmbedder};
pub use orchestrator::{Orchestrator, OrchestratorReply};
pub use resolver::CourseResolver;
pub use session::{SessionStore, Turn};
pub use store::{SimilarityStore, SqliteStore};
pub use tools::{
    CourseTool, OutlineTool, SearchTool, SourceLedger, ToolInvocationRecord, ToolManager,
    ToolOutput,
};
pub use types::{
    Course, CourseAnalytics, CourseChunk, IngestStats, Lesson, ParsedDocument, QueryResponse,
    SearchHit, SearchResults, Source,
};
