//! Course outline lookup.

use super::ToolOutput;
use crate::catalog::CatalogIndex;
use crate::resolver::CourseResolver;
use crate::types::{Course, Source};
use serde::Deserialize;
use serde_json::{json, Value};
use syllabus_core::AppError;
use syllabus_llm::ToolSchema;

pub const OUTLINE_TOOL_NAME: &str = "get_course_outline";

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_name: String,
}

/// Returns title, link, instructor and the numbered lesson list of a course.
#[derive(Clone)]
pub struct OutlineTool {
    resolver: CourseResolver,
    catalog: CatalogIndex,
}

impl OutlineTool {
    pub fn new(catalog: CatalogIndex) -> Self {
        Self {
            resolver: CourseResolver::new(catalog.clone()),
            catalog,
        }
    }

    pub fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: OUTLINE_TOOL_NAME.to_string(),
            description: "Get the complete outline of a course: title, link, instructor and every lesson"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work)"
                    }
                },
                "required": ["course_name"]
            }),
        }
    }

    pub fn execute(&self, input: &Value) -> ToolOutput {
        match serde_json::from_value::<OutlineArgs>(input.clone()) {
            Ok(args) => self.outline(&args.course_name),
            Err(e) => ToolOutput::error(format!(
                "Invalid arguments for {}: {}",
                OUTLINE_TOOL_NAME, e
            )),
        }
    }

    pub fn outline(&self, course_name: &str) -> ToolOutput {
        let no_match = || {
            ToolOutput::ok(AppError::NoMatch(course_name.to_string()).to_string(), Vec::new())
        };

        let title = match self.resolver.resolve(course_name) {
            Ok(title) => title,
            Err(AppError::NoMatch(_)) => return no_match(),
            Err(e) => return ToolOutput::error(format!("Outline error: {}", e)),
        };

        match self.catalog.get_course(&title) {
            Ok(Some(course)) => ToolOutput::ok(
                format_outline(&course),
                vec![Source::new(course.title.clone(), course.course_link.clone())],
            ),
            Ok(None) => no_match(),
            Err(e) => {
                tracing::warn!("Outline lookup failed: {}", e);
                ToolOutput::error(format!("Outline error: {}", e))
            }
        }
    }
}

/// Render an outline; missing link or instructor lines are left out.
pub fn format_outline(course: &Course) -> String {
    let mut lines = vec![format!("Course: {}", course.title)];
    if let Some(link) = &course.course_link {
        lines.push(format!("Link: {}", link));
    }
    if let Some(instructor) = &course.instructor {
        lines.push(format!("Instructor: {}", instructor));
    }
    lines.push(format!("Lessons ({}):", course.lessons.len()));
    for lesson in &course.lessons {
        lines.push(format!("{}. {}", lesson.lesson_number, lesson.title));
    }
    lines.join("\n")
}
