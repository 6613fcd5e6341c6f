//! Tools the generation backend may invoke, and their registry.
//!
//! Tools form a closed set ([`CourseTool`]). The [`ToolManager`] maps names to
//! tools and runs one batch of invocations per orchestration round, recording
//! provenance in a caller-owned [`SourceLedger`].

pub mod outline;
pub mod search;

pub use outline::{OutlineTool, OUTLINE_TOOL_NAME};
pub use search::{SearchTool, SEARCH_TOOL_NAME};

use crate::types::Source;
use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use syllabus_core::{AppError, AppResult};
use syllabus_llm::{ContentBlock, ToolCall, ToolSchema};

/// Text handed back to the backend plus the provenance behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub sources: Vec<Source>,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(text: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            text: text.into(),
            sources,
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
            is_error: true,
        }
    }
}

/// The tools known to the assistant.
#[derive(Clone)]
pub enum CourseTool {
    Search(SearchTool),
    Outline(OutlineTool),
}

impl CourseTool {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Search(_) => SEARCH_TOOL_NAME,
            Self::Outline(_) => OUTLINE_TOOL_NAME,
        }
    }

    pub fn schema(&self) -> ToolSchema {
        match self {
            Self::Search(tool) => tool.schema(),
            Self::Outline(tool) => tool.schema(),
        }
    }

    /// Run the tool on the blocking pool. Argument and retrieval problems
    /// come back as text.
    pub async fn execute(&self, input: &Value) -> ToolOutput {
        let tool = self.clone();
        let input = input.clone();
        match tokio::task::spawn_blocking(move || tool.run(&input)).await {
            Ok(output) => output,
            Err(e) => ToolOutput::error(format!("Tool {} failed: {}", self.name(), e)),
        }
    }

    fn run(&self, input: &Value) -> ToolOutput {
        match self {
            Self::Search(tool) => tool.execute(input),
            Self::Outline(tool) => tool.execute(input),
        }
    }
}

impl From<SearchTool> for CourseTool {
    fn from(tool: SearchTool) -> Self {
        Self::Search(tool)
    }
}

impl From<OutlineTool> for CourseTool {
    fn from(tool: OutlineTool) -> Self {
        Self::Outline(tool)
    }
}

/// One tool invocation made during a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocationRecord {
    pub tool_name: String,
    pub arguments: Value,
    pub sources: Vec<Source>,
    pub is_error: bool,
}

/// Provenance gathered by the tool invocations of a single query.
#[derive(Debug, Default)]
pub struct SourceLedger {
    records: Vec<ToolInvocationRecord>,
}

impl SourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: ToolInvocationRecord) {
        self.records.push(record);
    }

    /// Sources of every recorded invocation, in invocation order.
    pub fn sources(&self) -> Vec<Source> {
        self.records
            .iter()
            .flat_map(|record| record.sources.iter().cloned())
            .collect()
    }

    pub fn records(&self) -> &[ToolInvocationRecord] {
        &self.records
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub fn into_sources(self) -> Vec<Source> {
        self.records
            .into_iter()
            .flat_map(|record| record.sources)
            .collect()
    }
}

/// Name-to-tool registry.
#[derive(Default)]
pub struct ToolManager {
    tools: BTreeMap<String, CourseTool>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its schema name, replacing any previous holder.
    pub fn register(&mut self, tool: impl Into<CourseTool>) {
        let tool = tool.into();
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("Replaced previously registered tool '{}'", name);
        }
    }

    /// Schemas of every registered tool, ordered by name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(CourseTool::schema).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Run a single tool by name.
    pub async fn dispatch(&self, name: &str, input: &Value) -> AppResult<ToolOutput> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AppError::UnknownTool(name.to_string()))?;
        Ok(tool.execute(input).await)
    }

    /// Run a batch of calls concurrently, each on its own blocking task.
    ///
    /// Returns one tool-result block per call, in call order, and records each
    /// invocation in `ledger`. An unknown tool name fails the whole batch
    /// before anything runs.
    pub async fn execute_round(
        &self,
        calls: &[ToolCall],
        ledger: &mut SourceLedger,
    ) -> AppResult<Vec<ContentBlock>> {
        if let Some(unknown) = calls.iter().find(|call| !self.contains(&call.name)) {
            return Err(AppError::UnknownTool(unknown.name.clone()));
        }

        tracing::info!(calls = calls.len(), "Executing tool round");

        let outputs = join_all(calls.iter().map(|call| self.dispatch(&call.name, &call.input))).await;

        let mut blocks = Vec::with_capacity(calls.len());
        for (call, output) in calls.iter().zip(outputs) {
            let output = output?;
            if output.is_error {
                tracing::warn!(tool = %call.name, "Tool returned an error: {}", output.text);
            }

            blocks.push(ContentBlock::tool_result(
                &call.id,
                &output.text,
                output.is_error,
            ));
            ledger.record(ToolInvocationRecord {
                tool_name: call.name.clone(),
                arguments: call.input.clone(),
                sources: output.sources,
                is_error: output.is_error,
            });
        }

        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogIndex;
    use crate::content::ContentIndex;
    use crate::embeddings::TrigramEmbedder;
    use crate::store::{
        MetadataFilter, Replacement, SimilarityStore, SqliteStore, StoreHit, StoreRecord,
    };
    use crate::types::{Course, CourseChunk, Lesson};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn manager() -> ToolManager {
        let store: Arc<dyn SimilarityStore> = Arc::new(
            SqliteStore::in_memory(Box::new(TrigramEmbedder::new(384)), 0.2).unwrap(),
        );
        let catalog = CatalogIndex::new(store.clone());
        let content = ContentIndex::new(store);

        catalog
            .add_course(&Course {
                title: "Intro to X".to_string(),
                course_link: Some("https://example.com/x".to_string()),
                instructor: Some("Ada".to_string()),
                lessons: vec![Lesson {
                    lesson_number: 1,
                    title: "Basics".to_string(),
                    lesson_link: Some("https://example.com/x/1".to_string()),
                }],
            })
            .unwrap();
        content
            .add_chunks(&[CourseChunk {
                content: "Course Intro to X Lesson 1 content: Closures capture variables."
                    .to_string(),
                course_title: "Intro to X".to_string(),
                lesson_number: Some(1),
                chunk_index: 0,
            }])
            .unwrap();

        let mut manager = ToolManager::new();
        manager.register(SearchTool::new(catalog.clone(), content, 5));
        manager.register(OutlineTool::new(catalog));
        manager
    }

    fn call(id: &str, name: &str, input: Value) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }
    }

    #[test]
    fn test_schemas_sorted_by_name() {
        let names: Vec<String> = manager().schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec![OUTLINE_TOOL_NAME, SEARCH_TOOL_NAME]);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let result = manager().dispatch("delete_everything", &json!({})).await;
        assert!(matches!(result, Err(AppError::UnknownTool(name)) if name == "delete_everything"));
    }

    #[tokio::test]
    async fn test_execute_round_keeps_call_order_and_records_sources() {
        let manager = manager();
        let mut ledger = SourceLedger::new();
        let calls = vec![
            call("t1", OUTLINE_TOOL_NAME, json!({"course_name": "Intro"})),
            call("t2", SEARCH_TOOL_NAME, json!({"query": "closures", "lesson_number": 1})),
            call("t3", SEARCH_TOOL_NAME, json!({"lesson_number": "one"})),
        ];

        let blocks = manager.execute_round(&calls, &mut ledger).await.unwrap();

        let ids: Vec<&str> = blocks
            .iter()
            .map(|block| match block {
                ContentBlock::ToolResult { tool_use_id, .. } => tool_use_id.as_str(),
                other => panic!("unexpected block {:?}", other),
            })
            .collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);
        assert!(matches!(&blocks[2], ContentBlock::ToolResult { is_error: true, .. }));

        assert_eq!(ledger.records().len(), 3);
        let labels: Vec<String> = ledger.sources().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["Intro to X", "Intro to X - Lesson 1"]);

        ledger.reset();
        assert!(ledger.sources().is_empty());
    }

    #[tokio::test]
    async fn test_execute_round_rejects_unknown_before_running() {
        let manager = manager();
        let mut ledger = SourceLedger::new();
        let calls = vec![
            call("t1", SEARCH_TOOL_NAME, json!({"query": "closures"})),
            call("t2", "nope", json!({})),
        ];

        let result = manager.execute_round(&calls, &mut ledger).await;
        assert!(matches!(result, Err(AppError::UnknownTool(_))));
        assert!(ledger.records().is_empty());
    }

    /// Store whose queries take a while and count how many run at once.
    #[derive(Default)]
    struct SlowStore {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SimilarityStore for SlowStore {
        fn upsert(&self, _: &str, _: &[StoreRecord]) -> AppResult<()> {
            Ok(())
        }
        fn query(
            &self,
            _: &str,
            _: &str,
            _: usize,
            _: Option<&MetadataFilter>,
        ) -> AppResult<Vec<StoreHit>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
        fn get(&self, _: &str, _: &str) -> AppResult<Option<StoreRecord>> {
            Ok(None)
        }
        fn delete_where(&self, _: &str, _: &MetadataFilter) -> AppResult<usize> {
            Ok(0)
        }
        fn ids(&self, _: &str) -> AppResult<Vec<String>> {
            Ok(Vec::new())
        }
        fn replace(&self, _: &[Replacement]) -> AppResult<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_execute_round_overlaps_store_calls() {
        let slow = Arc::new(SlowStore::default());
        let store: Arc<dyn SimilarityStore> = slow.clone();
        let mut manager = ToolManager::new();
        manager.register(SearchTool::new(
            CatalogIndex::new(store.clone()),
            ContentIndex::new(store),
            5,
        ));

        let mut ledger = SourceLedger::new();
        let calls = vec![
            call("t1", SEARCH_TOOL_NAME, json!({"query": "closures"})),
            call("t2", SEARCH_TOOL_NAME, json!({"query": "loops"})),
        ];
        let blocks = manager.execute_round(&calls, &mut ledger).await.unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(slow.peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_ledger_into_sources_flattens() {
        let mut ledger = SourceLedger::new();
        for label in ["a", "b"] {
            ledger.record(ToolInvocationRecord {
                tool_name: SEARCH_TOOL_NAME.to_string(),
                arguments: json!({}),
                sources: vec![Source::new(label, None)],
                is_error: false,
            });
        }
        let labels: Vec<String> = ledger.into_sources().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["a", "b"]);
    }
}
