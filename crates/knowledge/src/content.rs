//! Content index: every chunk of every course, filterable by course and lesson.

use crate::store::{MetadataFilter, Replacement, SimilarityStore, StoreRecord};
use crate::types::{CourseChunk, SearchHit, SearchResults};
use serde_json::json;
use std::sync::Arc;
use syllabus_core::AppResult;

/// Collection holding course chunks.
pub const CONTENT_COLLECTION: &str = "course_content";

/// Conjunctive restriction of a content search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl ContentFilter {
    pub fn new(course_title: Option<String>, lesson_number: Option<u32>) -> Self {
        Self {
            course_title,
            lesson_number,
        }
    }

    fn to_metadata_filter(&self) -> Option<MetadataFilter> {
        let mut filters = Vec::new();
        if let Some(title) = &self.course_title {
            filters.push(MetadataFilter::eq("course_title", title.as_str()));
        }
        if let Some(lesson) = self.lesson_number {
            filters.push(MetadataFilter::eq("lesson_number", lesson));
        }
        MetadataFilter::all(filters)
    }
}

#[derive(Clone)]
pub struct ContentIndex {
    store: Arc<dyn SimilarityStore>,
}

impl ContentIndex {
    pub fn new(store: Arc<dyn SimilarityStore>) -> Self {
        Self { store }
    }

    /// Store chunks under `<course title>_<chunk index>`.
    pub fn add_chunks(&self, chunks: &[CourseChunk]) -> AppResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        self.store.upsert(CONTENT_COLLECTION, &chunk_records(chunks))
    }

    /// Store change that swaps `chunks` in for every stored chunk of `course_title`.
    pub fn replacement(course_title: &str, chunks: &[CourseChunk]) -> Replacement {
        Replacement {
            collection: CONTENT_COLLECTION.to_string(),
            filter: MetadataFilter::eq("course_title", course_title),
            records: chunk_records(chunks),
        }
    }

    /// Top `limit` chunks for `query` within `filter`.
    pub fn search(
        &self,
        query: &str,
        filter: &ContentFilter,
        limit: usize,
    ) -> AppResult<SearchResults> {
        let metadata_filter = filter.to_metadata_filter();
        let hits = self
            .store
            .query(CONTENT_COLLECTION, query, limit, metadata_filter.as_ref())?;

        let hits = hits
            .into_iter()
            .map(|hit| SearchHit {
                course_title: hit
                    .record
                    .metadata
                    .get("course_title")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                lesson_number: hit
                    .record
                    .metadata
                    .get("lesson_number")
                    .and_then(|v| v.as_u64())
                    .and_then(|n| u32::try_from(n).ok()),
                content: hit.record.text,
                distance: hit.distance,
            })
            .collect();

        Ok(SearchResults { hits })
    }

    /// Drop every chunk of a course.
    pub fn remove_course(&self, course_title: &str) -> AppResult<usize> {
        self.store.delete_where(
            CONTENT_COLLECTION,
            &MetadataFilter::eq("course_title", course_title),
        )
    }

    pub fn chunk_count(&self) -> AppResult<usize> {
        Ok(self.store.ids(CONTENT_COLLECTION)?.len())
    }
}

fn chunk_records(chunks: &[CourseChunk]) -> Vec<StoreRecord> {
    chunks
        .iter()
        .map(|chunk| {
            StoreRecord::new(
                chunk.id(),
                &chunk.content,
                json!({
                    "course_title": chunk.course_title,
                    "lesson_number": chunk.lesson_number,
                    "chunk_index": chunk.chunk_index,
                }),
            )
        })
        .collect()
}
