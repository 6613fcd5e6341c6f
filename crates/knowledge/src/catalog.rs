//! Course catalog: one record per course, keyed by exact title.

use crate::store::{MetadataFilter, Replacement, SimilarityStore, StoreRecord};
use crate::types::Course;
use serde_json::json;
use std::sync::Arc;
use syllabus_core::AppResult;

/// Collection holding course descriptors.
pub const CATALOG_COLLECTION: &str = "course_catalog";

/// Course-level index used for name resolution and course metadata.
#[derive(Clone)]
pub struct CatalogIndex {
    store: Arc<dyn SimilarityStore>,
}

impl CatalogIndex {
    pub fn new(store: Arc<dyn SimilarityStore>) -> Self {
        Self { store }
    }

    /// Add or replace a course. The title is embedded for name resolution.
    pub fn add_course(&self, course: &Course) -> AppResult<()> {
        self.store.upsert(CATALOG_COLLECTION, &[course_record(course)])
    }

    /// Store change that swaps `course` in for its previous catalog entry.
    pub fn replacement(course: &Course) -> Replacement {
        Replacement {
            collection: CATALOG_COLLECTION.to_string(),
            filter: MetadataFilter::eq("title", course.title.as_str()),
            records: vec![course_record(course)],
        }
    }

    /// Catalog title equal to `name`, ignoring case and surrounding whitespace.
    pub fn exact_title(&self, name: &str) -> AppResult<Option<String>> {
        let name = name.trim();
        if self.store.get(CATALOG_COLLECTION, name)?.is_some() {
            return Ok(Some(name.to_string()));
        }

        let wanted = name.to_lowercase();
        Ok(self
            .course_titles()?
            .into_iter()
            .find(|title| title.to_lowercase() == wanted))
    }

    /// Best-matching title for a partial name, if any passes the store's floor.
    pub fn closest_title(&self, name: &str) -> AppResult<Option<String>> {
        let hits = self.store.query(CATALOG_COLLECTION, name, 1, None)?;
        Ok(hits.into_iter().next().map(|hit| hit.record.id))
    }

    /// Full course descriptor by exact title.
    pub fn get_course(&self, title: &str) -> AppResult<Option<Course>> {
        match self.store.get(CATALOG_COLLECTION, title)? {
            Some(record) => Ok(Some(serde_json::from_value(record.metadata)?)),
            None => Ok(None),
        }
    }

    /// Link of one lesson, when both the course and the link are known.
    pub fn lesson_link(&self, title: &str, lesson_number: u32) -> AppResult<Option<String>> {
        Ok(self
            .get_course(title)?
            .and_then(|course| course.lesson(lesson_number).and_then(|l| l.lesson_link.clone())))
    }

    /// Every course title in the catalog.
    pub fn course_titles(&self) -> AppResult<Vec<String>> {
        self.store.ids(CATALOG_COLLECTION)
    }

    pub fn course_count(&self) -> AppResult<usize> {
        Ok(self.course_titles()?.len())
    }

    pub fn remove_course(&self, title: &str) -> AppResult<usize> {
        self.store
            .delete_where(CATALOG_COLLECTION, &MetadataFilter::eq("title", title))
    }
}

fn course_record(course: &Course) -> StoreRecord {
    let metadata = json!({
        "title": course.title,
        "instructor": course.instructor,
        "course_link": course.course_link,
        "lessons": course.lessons,
    });
    StoreRecord::new(&course.title, &course.title, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::TrigramEmbedder;
    use crate::store::SqliteStore;
    use crate::types::Lesson;

    fn catalog() -> CatalogIndex {
        let store = SqliteStore::in_memory(Box::new(TrigramEmbedder::new(384)), 0.2).unwrap();
        CatalogIndex::new(Arc::new(store))
    }

    fn course(title: &str) -> Course {
        Course {
            title: title.to_string(),
            course_link: Some("https://example.com/c".to_string()),
            instructor: Some("Ada".to_string()),
            lessons: vec![Lesson {
                lesson_number: 1,
                title: "Basics".to_string(),
                lesson_link: Some("https://example.com/c/1".to_string()),
            }],
        }
    }

    #[test]
    fn test_course_metadata_round_trip() {
        let catalog = catalog();
        catalog.add_course(&course("Intro to X")).unwrap();

        let stored = catalog.get_course("Intro to X").unwrap().unwrap();
        assert_eq!(stored, course("Intro to X"));
        assert_eq!(
            catalog.lesson_link("Intro to X", 1).unwrap().as_deref(),
            Some("https://example.com/c/1")
        );
        assert_eq!(catalog.lesson_link("Intro to X", 9).unwrap(), None);
        assert_eq!(catalog.lesson_link("Missing", 1).unwrap(), None);
    }

    #[test]
    fn test_titles_count_and_removal() {
        let catalog = catalog();
        catalog.add_course(&course("Intro to X")).unwrap();
        catalog.add_course(&course("Advanced Retrieval")).unwrap();
        catalog.add_course(&course("Intro to X")).unwrap();

        assert_eq!(catalog.course_count().unwrap(), 2);
        assert_eq!(catalog.remove_course("Intro to X").unwrap(), 1);
        assert_eq!(
            catalog.course_titles().unwrap(),
            vec!["Advanced Retrieval".to_string()]
        );
    }

    #[test]
    fn test_exact_title_ignores_case() {
        let catalog = catalog();
        catalog.add_course(&course("Python 3")).unwrap();

        assert_eq!(catalog.exact_title("Python 3").unwrap().as_deref(), Some("Python 3"));
        assert_eq!(catalog.exact_title(" python 3 ").unwrap().as_deref(), Some("Python 3"));
        assert_eq!(catalog.exact_title("Python").unwrap(), None);
    }

    #[test]
    fn test_closest_title() {
        let catalog = catalog();
        catalog.add_course(&course("Intro to X")).unwrap();
        catalog.add_course(&course("Advanced Retrieval")).unwrap();

        assert_eq!(
            catalog.closest_title("retrieval").unwrap().as_deref(),
            Some("Advanced Retrieval")
        );
        assert_eq!(catalog.closest_title("Quantum Chemistry").unwrap(), None);
    }
}
