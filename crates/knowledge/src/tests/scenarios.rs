//! End-to-end behaviour of the course assistant against a scripted backend.

use super::support::{tool_use_response, FlakyStore, ScriptedClient};
use crate::content::CONTENT_COLLECTION;
use crate::store::{SimilarityStore, SqliteStore};
use crate::{CourseAssistant, Source, TrigramEmbedder};
use serde_json::json;
use std::sync::Arc;
use syllabus_core::{AppConfig, AppError, RagConfig};
use syllabus_llm::{ContentBlock, LlmResponse};
use tempfile::TempDir;

const INTRO_TO_X: &str = "\
Course Title: Intro to X
Course Link: https://example.com/x
Course Instructor: Ada

Lesson 1: Basics
Lesson Link: https://example.com/x/1
X is a language. It has closures. Closures capture variables.
";

const PYTHON_101: &str = "\
Course Title: Python 101
Course Link: https://example.com/python101
Course Instructor: John Doe

Lesson 1: Introduction
Python is friendly.

Lesson 2: Loops
Loops repeat work. Iteration visits every item.
";

fn store() -> Arc<dyn SimilarityStore> {
    Arc::new(SqliteStore::in_memory(Box::new(TrigramEmbedder::new(384)), 0.2).unwrap())
}

fn assistant(client: Arc<ScriptedClient>) -> CourseAssistant {
    CourseAssistant::in_memory(client, "test-model", &RagConfig::default()).unwrap()
}

fn text(answer: &str) -> Result<LlmResponse, AppError> {
    Ok(LlmResponse::text("scripted", answer))
}

fn tool_result_text(block: &ContentBlock) -> &str {
    match block {
        ContentBlock::ToolResult { content, .. } => content.as_str(),
        other => panic!("expected tool result, got {:?}", other),
    }
}

#[tokio::test]
async fn test_short_lesson_becomes_single_chunk() {
    let store = store();
    let client = Arc::new(ScriptedClient::new(Vec::new()));
    let assistant =
        CourseAssistant::with_store(store.clone(), client, "test-model", &RagConfig::default());

    let (course, chunks) = assistant.add_course_document(INTRO_TO_X).unwrap();
    assert_eq!(course.title, "Intro to X");
    assert_eq!(course.instructor.as_deref(), Some("Ada"));
    assert_eq!(chunks, 1);

    let record = store.get(CONTENT_COLLECTION, "Intro to X_0").unwrap().unwrap();
    assert_eq!(
        record.text,
        "Course Intro to X Lesson 1 content: X is a language. It has closures. Closures capture variables."
    );
    assert_eq!(record.metadata["chunk_index"], 0);
    assert_eq!(record.metadata["lesson_number"], 1);
}

#[tokio::test]
async fn test_partial_name_resolves_and_empty_content_still_answers() {
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_use_response(vec![(
            "toolu_1",
            "search_course_content",
            json!({"query": "closures", "course_name": "Intro"}),
        )])),
        text("That course has no material on closures yet."),
    ]));
    let assistant = assistant(client.clone());

    let (_, chunks) = assistant
        .add_course_document("Course Title: Intro to X\nCourse Link:\nCourse Instructor:\n")
        .unwrap();
    assert_eq!(chunks, 0);

    let response = assistant.query("What are closures?", None).await.unwrap();
    assert_eq!(response.answer, "That course has no material on closures yet.");
    assert!(response.sources.is_empty());

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        tool_result_text(&requests[1].messages[2].content[0]),
        "No relevant content found in course 'Intro to X'."
    );
}

#[tokio::test]
async fn test_search_answer_carries_lesson_sources() {
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_use_response(vec![(
            "toolu_1",
            "search_course_content",
            json!({"query": "closures", "course_name": "Intro", "lesson_number": 1}),
        )])),
        text("Closures capture variables."),
    ]));
    let assistant = assistant(client.clone());
    assistant.add_course_document(INTRO_TO_X).unwrap();
    assistant.add_course_document(PYTHON_101).unwrap();

    let response = assistant.query("What are closures?", None).await.unwrap();

    assert_eq!(
        response.sources,
        vec![Source::new(
            "Intro to X - Lesson 1",
            Some("https://example.com/x/1".to_string())
        )]
    );

    let requests = client.requests();
    assert_eq!(
        requests[0].messages[0].text(),
        "Answer this question about course materials: What are closures?"
    );
    assert!(tool_result_text(&requests[1].messages[2].content[0])
        .starts_with("[Intro to X - Lesson 1]\n"));

    let turns = assistant.sessions().history(&response.session_id).unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].user, "What are closures?");
    assert_eq!(turns[0].assistant, "Closures capture variables.");
}

#[tokio::test]
async fn test_outline_answer_cites_course_link() {
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(tool_use_response(vec![(
            "toolu_1",
            "get_course_outline",
            json!({"course_name": "python"}),
        )])),
        text("Python 101 has two lessons."),
    ]));
    let assistant = assistant(client.clone());
    assistant.add_course_document(PYTHON_101).unwrap();

    let response = assistant.query("Outline of the python course?", None).await.unwrap();
    assert_eq!(
        response.sources,
        vec![Source::new(
            "Python 101",
            Some("https://example.com/python101".to_string())
        )]
    );
    assert!(tool_result_text(&client.requests()[1].messages[2].content[0])
        .ends_with("Lessons (2):\n1. Introduction\n2. Loops"));
}

#[tokio::test]
async fn test_concurrent_queries_on_one_session_record_both_turns() {
    let client = Arc::new(ScriptedClient::new(vec![text("first"), text("second")]));
    let assistant = assistant(client.clone());
    let session_id = assistant.sessions().create_session().unwrap();

    let (a, b) = tokio::join!(
        assistant.query("q1", Some(session_id.as_str())),
        assistant.query("q2", Some(session_id.as_str()))
    );
    assert_eq!(a.unwrap().session_id, session_id);
    assert_eq!(b.unwrap().session_id, session_id);

    // Both queries read the empty history before either recorded its turn.
    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert!(!request.system.as_deref().unwrap().contains("Previous conversation"));
    }

    let turns = assistant.sessions().history(&session_id).unwrap();
    assert_eq!(turns.len(), 2);
    let mut users: Vec<&str> = turns.iter().map(|t| t.user.as_str()).collect();
    users.sort();
    assert_eq!(users, vec!["q1", "q2"]);
}

#[tokio::test]
async fn test_history_window_and_eviction() {
    let client = Arc::new(ScriptedClient::new(vec![
        text("a1"),
        text("a2"),
        text("a3"),
    ]));
    let assistant = assistant(client.clone());

    let first = assistant.query("q1", None).await.unwrap();
    let session = first.session_id;
    assistant.query("q2", Some(session.as_str())).await.unwrap();
    assistant.query("q3", Some(session.as_str())).await.unwrap();

    let requests = client.requests();
    assert!(!requests[0].system.as_deref().unwrap().contains("Previous conversation"));
    assert!(requests[2]
        .system
        .as_deref()
        .unwrap()
        .ends_with("Previous conversation:\nUser: q1\nAssistant: a1\nUser: q2\nAssistant: a2"));

    let turns = assistant.sessions().history(&session).unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].user, "q2");
    assert_eq!(turns[1].user, "q3");

    assistant.clear_session(&session).unwrap();
    assert!(assistant.sessions().history(&session).unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_tool_fails_query_without_recording_turn() {
    let client = Arc::new(ScriptedClient::new(vec![Ok(tool_use_response(vec![(
        "toolu_1",
        "delete_course",
        json!({}),
    )]))]));
    let assistant = assistant(client);
    let session = assistant.sessions().create_session().unwrap();

    let result = assistant.query("q", Some(session.as_str())).await;
    assert!(matches!(result, Err(AppError::UnknownTool(name)) if name == "delete_course"));
    assert!(assistant.sessions().history(&session).unwrap().is_empty());
}

#[tokio::test]
async fn test_backend_failure_propagates() {
    let client = Arc::new(ScriptedClient::new(vec![Err(AppError::Other(
        "socket closed".to_string(),
    ))]));
    let assistant = assistant(client);

    let result = assistant.query("q", None).await;
    assert!(matches!(result, Err(AppError::GenerationBackend(msg)) if msg.contains("socket closed")));
    assert_eq!(assistant.sessions().session_count().unwrap(), 0);
}

#[tokio::test]
async fn test_reingesting_a_course_replaces_its_chunks() {
    let client = Arc::new(ScriptedClient::new(Vec::new()));
    let assistant = assistant(client);

    assistant.add_course_document(PYTHON_101).unwrap();
    assistant.add_course_document(PYTHON_101).unwrap();
    assert_eq!(assistant.chunk_count().unwrap(), 2);

    let shorter = "Course Title: Python 101\nCourse Link:\nCourse Instructor: Jane\n\nLesson 1: Only\nOne lesson now.\n";
    assistant.add_course_document(shorter).unwrap();
    assert_eq!(assistant.chunk_count().unwrap(), 1);

    let course = assistant.course("Python 101").unwrap().unwrap();
    assert_eq!(course.instructor.as_deref(), Some("Jane"));
    assert_eq!(course.lessons.len(), 1);
    assert_eq!(assistant.course_analytics().unwrap().total_courses, 1);
}

#[tokio::test]
async fn test_failed_reingest_keeps_previous_course() {
    let store = Arc::new(FlakyStore::new());
    let client = Arc::new(ScriptedClient::new(Vec::new()));
    let assistant =
        CourseAssistant::with_store(store.clone(), client, "test-model", &RagConfig::default());

    assistant.add_course_document(PYTHON_101).unwrap();
    assert_eq!(assistant.chunk_count().unwrap(), 2);

    store.fail_writes(true);
    let shorter = "Course Title: Python 101\nCourse Link:\nCourse Instructor: Jane\n\nLesson 1: Only\nOne lesson now.\n";
    let result = assistant.add_course_document(shorter);
    assert!(matches!(result, Err(AppError::Knowledge(_))));

    assert_eq!(assistant.chunk_count().unwrap(), 2);
    let course = assistant.course("Python 101").unwrap().unwrap();
    assert_eq!(course.instructor.as_deref(), Some("John Doe"));
    assert_eq!(course.lessons.len(), 2);
    assert_eq!(
        assistant.course_analytics().unwrap().course_titles,
        vec!["Python 101".to_string()]
    );
}

#[tokio::test]
async fn test_folder_ingestion_skips_malformed_documents() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("intro.txt"), INTRO_TO_X).unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("nested").join("python.md"), PYTHON_101).unwrap();
    std::fs::write(dir.path().join("broken.txt"), "Course Link: nowhere\n").unwrap();
    std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();

    let client = Arc::new(ScriptedClient::new(Vec::new()));
    let assistant = assistant(client);

    let stats = assistant.add_course_folder(dir.path(), false).unwrap();
    assert_eq!(stats.courses_added, 2);
    assert_eq!(stats.chunks_written, 3);
    assert_eq!(stats.documents_skipped, 1);

    let analytics = assistant.course_analytics().unwrap();
    assert_eq!(analytics.total_courses, 2);
    assert!(analytics.course_titles.contains(&"Intro to X".to_string()));

    std::fs::remove_file(dir.path().join("intro.txt")).unwrap();
    let stats = assistant.add_course_folder(dir.path(), true).unwrap();
    assert_eq!(stats.courses_added, 1);
    assert_eq!(
        assistant.course_analytics().unwrap().course_titles,
        vec!["Python 101".to_string()]
    );
    assert_eq!(assistant.chunk_count().unwrap(), 2);

    let missing = assistant.add_course_folder(&dir.path().join("absent"), false);
    assert!(matches!(missing, Err(AppError::Knowledge(_))));
}

#[tokio::test]
async fn test_index_persists_under_workspace() {
    let workspace = TempDir::new().unwrap();
    let config = AppConfig {
        workspace: workspace.path().to_path_buf(),
        ..AppConfig::default()
    };

    {
        let client = Arc::new(ScriptedClient::new(Vec::new()));
        let assistant = CourseAssistant::new(&config, client).unwrap();
        assistant.add_course_document(INTRO_TO_X).unwrap();
    }

    assert!(workspace.path().join(".syllabus").join("index.sqlite").exists());

    let client = Arc::new(ScriptedClient::new(Vec::new()));
    let assistant = CourseAssistant::new(&config, client).unwrap();
    assert_eq!(
        assistant.course_analytics().unwrap().course_titles,
        vec!["Intro to X".to_string()]
    );
    assert_eq!(assistant.chunk_count().unwrap(), 1);
}
