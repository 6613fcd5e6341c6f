//! Course document parsing.
//!
//! A course document starts with three header lines:
//!
//! ```text
//! Course Title: Intro to X
//! Course Link: https://example.com/x
//! Course Instructor: Ada
//! ```
//!
//! followed by lesson sections introduced by `Lesson <n>: <title>` markers,
//! each optionally followed on the very next line by `Lesson Link: <url>`.

use crate::types::{Course, Lesson, LessonText, ParsedDocument};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use syllabus_core::{AppError, AppResult};

static LESSON_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^lesson\s+(\d+):\s*(.*)$").expect("lesson marker pattern"));

static LESSON_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^lesson\s+link:\s*(.*)$").expect("lesson link pattern"));

/// File extensions accepted as course documents.
pub const COURSE_EXTENSIONS: &[&str] = &["txt", "md", "text"];

/// Check whether a path looks like a course document.
pub fn is_course_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            COURSE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Read a course document from disk and parse it.
pub fn parse_file(path: &Path) -> AppResult<ParsedDocument> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    if bytes.contains(&0) {
        tracing::warn!("Skipping likely binary file: {:?}", path);
        return Err(AppError::Knowledge("Binary file not supported".to_string()));
    }

    let text = String::from_utf8(bytes).map_err(|_| {
        AppError::MalformedDocument(format!("{:?} is not valid UTF-8", path))
    })?;

    parse_document(&text)
}

/// Parse a course document into a course descriptor and raw lesson text.
pub fn parse_document(text: &str) -> AppResult<ParsedDocument> {
    let lines: Vec<&str> = text.lines().collect();

    let mut header = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let title = header_value(header.next(), "Course Title")?;
    let course_link = header_value(header.next(), "Course Link")?;
    let (last_header, instructor) = match header.next() {
        Some((idx, line)) => (idx, expect_key(line, "Course Instructor")?),
        None => {
            return Err(AppError::MalformedDocument(
                "missing 'Course Instructor' line".to_string(),
            ))
        }
    };

    if title.is_empty() {
        return Err(AppError::MalformedDocument("course title is empty".to_string()));
    }

    let mut lessons: Vec<Lesson> = Vec::new();
    let mut lesson_texts: Vec<LessonText> = Vec::new();
    let mut seen = HashSet::new();
    let mut prose: Vec<&str> = Vec::new();
    let mut body: Vec<&str> = Vec::new();
    let mut in_lesson = false;

    let mut i = last_header + 1;
    while i < lines.len() {
        let line = lines[i];

        let Some(caps) = LESSON_MARKER.captures(line.trim()) else {
            if in_lesson {
                body.push(line);
            } else {
                prose.push(line);
            }
            i += 1;
            continue;
        };

        if in_lesson {
            close_lesson(&mut lesson_texts, &lessons, &mut body);
        }

        let lesson_number: u32 = caps[1].parse().map_err(|_| {
            AppError::MalformedDocument(format!("lesson number out of range: {}", &caps[1]))
        })?;
        if !seen.insert(lesson_number) {
            return Err(AppError::MalformedDocument(format!(
                "duplicate lesson number {} in '{}'",
                lesson_number, title
            )));
        }

        let mut lesson_link = None;
        if let Some(link) = lines
            .get(i + 1)
            .and_then(|next| LESSON_LINK.captures(next.trim()))
        {
            lesson_link = non_empty(link[1].trim());
            i += 1;
        }

        lessons.push(Lesson {
            lesson_number,
            title: caps[2].trim().to_string(),
            lesson_link,
        });
        in_lesson = true;
        i += 1;
    }

    if in_lesson {
        close_lesson(&mut lesson_texts, &lessons, &mut body);
    }

    tracing::debug!(
        "Parsed course '{}' with {} lessons",
        title,
        lessons.len()
    );

    Ok(ParsedDocument {
        course: Course {
            title,
            course_link: non_empty(&course_link),
            instructor: non_empty(&instructor),
            lessons,
        },
        prose: prose.join("\n").trim().to_string(),
        lesson_texts,
    })
}

fn close_lesson(lesson_texts: &mut Vec<LessonText>, lessons: &[Lesson], body: &mut Vec<&str>) {
    if let Some(lesson) = lessons.last() {
        lesson_texts.push(LessonText {
            lesson_number: lesson.lesson_number,
            body: body.join("\n").trim().to_string(),
        });
    }
    body.clear();
}

fn header_value(line: Option<(usize, &&str)>, key: &str) -> AppResult<String> {
    match line {
        Some((_, line)) => expect_key(line, key),
        None => Err(AppError::MalformedDocument(format!("missing '{}' line", key))),
    }
}

fn expect_key(line: &str, key: &str) -> AppResult<String> {
    match line.split_once(':') {
        Some((found, value)) if found.trim().eq_ignore_ascii_case(key) => {
            Ok(value.trim().to_string())
        }
        _ => Err(AppError::MalformedDocument(format!(
            "expected '{}:' but found '{}'",
            key,
            line.trim()
        ))),
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
