//! Course-material type definitions.

use serde::{Deserialize, Serialize};

/// A course, keyed by its exact title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Exact title, unique across the catalog
    pub title: String,

    /// External course link
    #[serde(default)]
    pub course_link: Option<String>,

    /// Instructor name
    #[serde(default)]
    pub instructor: Option<String>,

    /// Lessons in source order
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Find a lesson by number.
    pub fn lesson(&self, lesson_number: u32) -> Option<&Lesson> {
        self.lessons
            .iter()
            .find(|lesson| lesson.lesson_number == lesson_number)
    }
}

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number, unique within its course
    pub lesson_number: u32,

    /// Lesson title
    pub title: String,

    /// Lesson link
    #[serde(default)]
    pub lesson_link: Option<String>,
}

/// A context-prefixed slice of course text ready for the content index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseChunk {
    /// Prefixed chunk text
    pub content: String,

    /// Owning course title
    pub course_title: String,

    /// Lesson number, absent for ungrouped prose
    pub lesson_number: Option<u32>,

    /// Zero-based index, unique within one ingestion run
    pub chunk_index: u32,
}

impl CourseChunk {
    /// Identifier used in the content collection.
    pub fn id(&self) -> String {
        format!("{}_{}", self.course_title, self.chunk_index)
    }
}

/// Raw text of one lesson as found in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonText {
    pub lesson_number: u32,
    pub body: String,
}

/// Result of parsing one course document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// Course descriptor, lessons included
    pub course: Course,

    /// Text before the first lesson marker (or the whole body without markers)
    pub prose: String,

    /// Per-lesson bodies in source order
    pub lesson_texts: Vec<LessonText>,
}

/// One retrieved chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub content: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub distance: f32,
}

/// Ordered hits of a single content search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// Provenance of a piece of retrieved context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Display label, e.g. "Intro to X - Lesson 1"
    pub label: String,

    /// Lesson or course link when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Source {
    pub fn new(label: impl Into<String>, url: Option<String>) -> Self {
        Self {
            label: label.into(),
            url,
        }
    }
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// Courses added or replaced
    pub courses_added: u32,

    /// Chunks written to the content index
    pub chunks_written: u32,

    /// Documents rejected as malformed or unreadable
    pub documents_skipped: u32,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Catalog overview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// Answer to one user query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Final answer text
    pub answer: String,

    /// Provenance of the context the answer was built from
    pub sources: Vec<Source>,

    /// Session the exchange was recorded in
    pub session_id: String,
}
