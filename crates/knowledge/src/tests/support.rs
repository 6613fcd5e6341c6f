//! Test doubles for the generation backend and the similarity store.

use crate::embeddings::TrigramEmbedder;
use crate::store::{MetadataFilter, Replacement, SimilarityStore, SqliteStore, StoreHit, StoreRecord};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use syllabus_core::{AppError, AppResult};
use syllabus_llm::{ContentBlock, LlmClient, LlmRequest, LlmResponse, LlmUsage, StopReason};

/// Replays canned responses in order and records every request it receives.
pub(crate) struct ScriptedClient {
    responses: Mutex<VecDeque<AppResult<LlmResponse>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new(responses: Vec<AppResult<LlmResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        // Let other in-flight queries run up to their own backend call.
        tokio::task::yield_now().await;

        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::GenerationBackend("script exhausted".to_string())))
    }
}

/// A response asking for the given `(id, tool name, arguments)` invocations.
pub(crate) fn tool_use_response(calls: Vec<(&str, &str, serde_json::Value)>) -> LlmResponse {
    LlmResponse {
        content: calls
            .into_iter()
            .map(|(id, name, input)| ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            })
            .collect(),
        model: "scripted".to_string(),
        stop_reason: StopReason::ToolUse,
        usage: LlmUsage::default(),
    }
}

/// In-memory store whose writes can be switched to fail.
pub(crate) struct FlakyStore {
    inner: SqliteStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory(Box::new(TrigramEmbedder::new(384)), 0.2).unwrap(),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Knowledge("disk full".to_string()));
        }
        Ok(())
    }
}

impl SimilarityStore for FlakyStore {
    fn upsert(&self, collection: &str, records: &[StoreRecord]) -> AppResult<()> {
        self.check_writable()?;
        self.inner.upsert(collection, records)
    }

    fn query(
        &self,
        collection: &str,
        text: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> AppResult<Vec<StoreHit>> {
        self.inner.query(collection, text, top_k, filter)
    }

    fn get(&self, collection: &str, id: &str) -> AppResult<Option<StoreRecord>> {
        self.inner.get(collection, id)
    }

    fn delete_where(&self, collection: &str, filter: &MetadataFilter) -> AppResult<usize> {
        self.check_writable()?;
        self.inner.delete_where(collection, filter)
    }

    fn ids(&self, collection: &str) -> AppResult<Vec<String>> {
        self.inner.ids(collection)
    }

    fn replace(&self, batch: &[Replacement]) -> AppResult<usize> {
        self.check_writable()?;
        self.inner.replace(batch)
    }
}
