//! Sentence-based chunking with overlap and course context prefixes.

use crate::types::{CourseChunk, ParsedDocument};
use syllabus_core::RagConfig;

/// Splits lesson text into overlapping, context-prefixed chunks.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Create a chunker. Sizes are measured in characters.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Chunk a whole document: prose first, then lessons in source order.
    ///
    /// Indices run from zero across the document.
    pub fn chunk_document(&self, doc: &ParsedDocument) -> Vec<CourseChunk> {
        let mut next_index = 0u32;
        let mut chunks = self.chunk_text(&doc.prose, &doc.course.title, None, &mut next_index);

        for lesson in &doc.lesson_texts {
            chunks.extend(self.chunk_text(
                &lesson.body,
                &doc.course.title,
                Some(lesson.lesson_number),
                &mut next_index,
            ));
        }

        tracing::debug!(
            "Chunked '{}' into {} chunks (size: {}, overlap: {})",
            doc.course.title,
            chunks.len(),
            self.chunk_size,
            self.chunk_overlap
        );

        chunks
    }

    /// Chunk one body of text, continuing the index sequence at `next_index`.
    pub fn chunk_text(
        &self,
        text: &str,
        course_title: &str,
        lesson_number: Option<u32>,
        next_index: &mut u32,
    ) -> Vec<CourseChunk> {
        let prefix = context_prefix(course_title, lesson_number);

        self.split(text)
            .into_iter()
            .map(|body| {
                let chunk = CourseChunk {
                    content: format!("{}{}", prefix, body),
                    course_title: course_title.to_string(),
                    lesson_number,
                    chunk_index: *next_index,
                };
                *next_index += 1;
                chunk
            })
            .collect()
    }

    /// Split text into unprefixed chunk bodies.
    pub fn split(&self, text: &str) -> Vec<String> {
        let normalized = normalize_whitespace(text);
        let mut bodies = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for sentence in split_sentences(&normalized) {
            let sentence_len = sentence.chars().count();

            if current.is_empty() {
                current.push_str(sentence);
                current_len = sentence_len;
                continue;
            }

            if current_len + 1 + sentence_len <= self.chunk_size {
                current.push(' ');
                current.push_str(sentence);
                current_len += 1 + sentence_len;
                continue;
            }

            let next = self.start_after(&current, current_len, sentence, sentence_len);
            bodies.push(std::mem::replace(&mut current, next));
            current_len = current.chars().count();
        }

        if !current.is_empty() {
            bodies.push(current);
        }

        bodies
    }

    /// Open a new chunk with the tail of `previous` followed by `sentence`.
    fn start_after(
        &self,
        previous: &str,
        previous_len: usize,
        sentence: &str,
        sentence_len: usize,
    ) -> String {
        // room left for the tail once the sentence and its separator are in
        let room = self.chunk_size.saturating_sub(sentence_len + 1);
        let take = self.chunk_overlap.min(room).min(previous_len);

        if take == 0 {
            return sentence.to_string();
        }

        let tail = char_suffix(previous, take);
        format!("{} {}", tail, sentence)
    }
}

/// Prefix stored in front of every chunk body.
pub fn context_prefix(course_title: &str, lesson_number: Option<u32>) -> String {
    match lesson_number {
        Some(n) => format!("Course {} Lesson {} content: ", course_title, n),
        None => format!("Course {} content: ", course_title),
    }
}

/// Collapse whitespace runs to a single space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split normalized text after `.`, `?` or `!` followed by whitespace or end of text.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if !matches!(ch, '.' | '?' | '!') {
            continue;
        }

        let at_boundary = match chars.peek() {
            Some((_, next)) => next.is_whitespace(),
            None => true,
        };

        if at_boundary {
            let end = idx + ch.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }

    sentences
}

/// Last `n` characters of `s`, respecting char boundaries.
fn char_suffix(s: &str, n: usize) -> &str {
    let total = s.chars().count();
    if n >= total {
        return s;
    }
    match s.char_indices().nth(total - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
