//! Fuzzy course-name resolution against the catalog.

use crate::catalog::CatalogIndex;
use syllabus_core::{AppError, AppResult};

/// Maps a partial course name to an exact catalog title.
///
/// A name equal to a catalog title (ignoring case) resolves to that title.
/// Otherwise the top catalog match is accepted as-is; the only cutoff is the
/// store's relevance floor.
#[derive(Clone)]
pub struct CourseResolver {
    catalog: CatalogIndex,
}

impl CourseResolver {
    pub fn new(catalog: CatalogIndex) -> Self {
        Self { catalog }
    }

    /// Resolve `name`, failing with [`AppError::NoMatch`] when nothing qualifies.
    pub fn resolve(&self, name: &str) -> AppResult<String> {
        if let Some(title) = self.catalog.exact_title(name)? {
            return Ok(title);
        }

        match self.catalog.closest_title(name)? {
            Some(title) => {
                tracing::debug!("Resolved course name '{}' to '{}'", name, title);
                Ok(title)
            }
            None => Err(AppError::NoMatch(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::TrigramEmbedder;
    use crate::store::SqliteStore;
    use crate::types::Course;
    use std::sync::Arc;

    fn resolver(titles: &[&str]) -> CourseResolver {
        let store = SqliteStore::in_memory(Box::new(TrigramEmbedder::new(384)), 0.2).unwrap();
        let catalog = CatalogIndex::new(Arc::new(store));
        for title in titles {
            catalog
                .add_course(&Course {
                    title: title.to_string(),
                    course_link: None,
                    instructor: None,
                    lessons: Vec::new(),
                })
                .unwrap();
        }
        CourseResolver::new(catalog)
    }

    #[test]
    fn test_exact_title_resolves_to_itself() {
        let resolver = resolver(&["Intro to X", "Building Retrieval Systems"]);
        assert_eq!(resolver.resolve("Intro to X").unwrap(), "Intro to X");
        assert_eq!(
            resolver.resolve("Building Retrieval Systems").unwrap(),
            "Building Retrieval Systems"
        );
    }

    #[test]
    fn test_titles_differing_in_short_tokens_resolve_exactly() {
        let versions = resolver(&["Python 2", "Python 3"]);
        assert_eq!(versions.resolve("Python 3").unwrap(), "Python 3");
        assert_eq!(versions.resolve("Python 2").unwrap(), "Python 2");
        assert_eq!(versions.resolve("python 3").unwrap(), "Python 3");

        let topics = resolver(&["Intro to AI", "Intro to ML"]);
        assert_eq!(topics.resolve("Intro to ML").unwrap(), "Intro to ML");
        assert_eq!(topics.resolve("intro to ai").unwrap(), "Intro to AI");
    }

    #[test]
    fn test_two_letter_title_resolves() {
        let resolver = resolver(&["Go", "Intro to X"]);
        assert_eq!(resolver.resolve("Go").unwrap(), "Go");
        assert_eq!(resolver.resolve("go").unwrap(), "Go");
    }

    #[test]
    fn test_partial_name_resolves() {
        let resolver = resolver(&["Intro to X", "Building Retrieval Systems"]);
        assert_eq!(resolver.resolve("Intro").unwrap(), "Intro to X");
        assert_eq!(
            resolver.resolve("retrieval").unwrap(),
            "Building Retrieval Systems"
        );
    }

    #[test]
    fn test_absent_name_is_no_match() {
        let resolver = resolver(&["Intro to X"]);
        match resolver.resolve("Quantum Chemistry") {
            Err(AppError::NoMatch(name)) => assert_eq!(name, "Quantum Chemistry"),
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_catalog_is_no_match() {
        let resolver = resolver(&[]);
        assert!(matches!(resolver.resolve("Intro"), Err(AppError::NoMatch(_))));
    }
}
