//! Filtered semantic search over course content.

use super::ToolOutput;
use crate::catalog::CatalogIndex;
use crate::content::{ContentFilter, ContentIndex};
use crate::resolver::CourseResolver;
use crate::types::{Course, SearchResults, Source};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use syllabus_core::AppError;
use syllabus_llm::ToolSchema;

pub const SEARCH_TOOL_NAME: &str = "search_course_content";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<u32>,
}

/// One filtered search per invocation, formatted with course/lesson headers.
#[derive(Clone)]
pub struct SearchTool {
    resolver: CourseResolver,
    catalog: CatalogIndex,
    content: ContentIndex,
    max_results: usize,
}

impl SearchTool {
    pub fn new(catalog: CatalogIndex, content: ContentIndex, max_results: usize) -> Self {
        Self {
            resolver: CourseResolver::new(catalog.clone()),
            catalog,
            content,
            max_results,
        }
    }

    pub fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: SEARCH_TOOL_NAME.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    pub fn execute(&self, input: &Value) -> ToolOutput {
        match serde_json::from_value::<SearchArgs>(input.clone()) {
            Ok(args) => self.search(&args.query, args.course_name.as_deref(), args.lesson_number),
            Err(e) => ToolOutput::error(format!(
                "Invalid arguments for {}: {}",
                SEARCH_TOOL_NAME, e
            )),
        }
    }

    /// Resolve the course (if named), search, and format the hits.
    pub fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> ToolOutput {
        let course_title = match course_name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => match self.resolver.resolve(name) {
                Ok(title) => Some(title),
                Err(err @ AppError::NoMatch(_)) => return ToolOutput::ok(err.to_string(), Vec::new()),
                Err(e) => return search_error(e),
            },
            None => None,
        };

        let filter = ContentFilter::new(course_title, lesson_number);
        let results = match self.content.search(query, &filter, self.max_results) {
            Ok(results) => results,
            Err(e) => return search_error(e),
        };

        tracing::debug!(
            query = %query,
            course = ?filter.course_title,
            lesson = ?filter.lesson_number,
            hits = results.len(),
            "Content search finished"
        );

        if results.is_empty() {
            return ToolOutput::ok(empty_message(&filter), Vec::new());
        }

        self.format_results(&results)
    }

    fn format_results(&self, results: &SearchResults) -> ToolOutput {
        let mut courses: HashMap<&str, Option<Course>> = HashMap::new();
        let mut sections = Vec::with_capacity(results.len());
        let mut sources = Vec::with_capacity(results.len());

        for hit in &results.hits {
            let course = courses
                .entry(hit.course_title.as_str())
                .or_insert_with(|| match self.catalog.get_course(&hit.course_title) {
                    Ok(course) => course,
                    Err(e) => {
                        tracing::warn!(
                            "Course lookup for '{}' failed, sources lack links: {}",
                            hit.course_title,
                            e
                        );
                        None
                    }
                });

            let (label, url) = match hit.lesson_number {
                Some(n) => (
                    format!("{} - Lesson {}", hit.course_title, n),
                    course
                        .as_ref()
                        .and_then(|c| c.lesson(n))
                        .and_then(|l| l.lesson_link.clone()),
                ),
                None => (
                    hit.course_title.clone(),
                    course.as_ref().and_then(|c| c.course_link.clone()),
                ),
            };

            sections.push(format!("[{}]\n{}", label, hit.content));
            sources.push(Source::new(label, url));
        }

        ToolOutput::ok(sections.join("\n\n"), sources)
    }
}

fn empty_message(filter: &ContentFilter) -> String {
    let mut message = String::from("No relevant content found");
    if let Some(title) = &filter.course_title {
        message.push_str(&format!(" in course '{}'", title));
    }
    if let Some(lesson) = filter.lesson_number {
        message.push_str(&format!(" in lesson {}", lesson));
    }
    message.push('.');
    message
}

fn search_error(err: AppError) -> ToolOutput {
    tracing::warn!("Search failed: {}", err);
    ToolOutput::error(format!("Search error: {}", err))
}
