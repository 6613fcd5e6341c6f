//! Course assistant: ingestion, querying and analytics over one index.

use crate::catalog::CatalogIndex;
use crate::chunker::Chunker;
use crate::content::ContentIndex;
use crate::embeddings::TrigramEmbedder;
use crate::orchestrator::Orchestrator;
use crate::parser;
use crate::session::SessionStore;
use crate::store::{SimilarityStore, SqliteStore};
use crate::tools::{OutlineTool, SearchTool, ToolManager};
use crate::types::{Course, CourseAnalytics, IngestStats, ParsedDocument, QueryResponse};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use syllabus_core::{AppConfig, AppError, AppResult, RagConfig};
use syllabus_llm::{create_configured_client, LlmClient};
use walkdir::WalkDir;

/// Wires parser, chunker, indexes, tools, orchestrator and sessions together.
pub struct CourseAssistant {
    store: Arc<dyn SimilarityStore>,
    chunker: Chunker,
    catalog: CatalogIndex,
    content: ContentIndex,
    tools: ToolManager,
    orchestrator: Orchestrator,
    sessions: SessionStore,
}

impl CourseAssistant {
    /// Build an assistant on the configured on-disk index.
    pub fn new(config: &AppConfig, client: Arc<dyn LlmClient>) -> AppResult<Self> {
        config.rag.validate()?;

        let store = SqliteStore::open(
            &config.index_path(),
            Box::new(TrigramEmbedder::new(config.rag.embedding_dim)),
            config.rag.min_similarity,
        )?;

        Ok(Self::with_store(
            Arc::new(store),
            client,
            &config.model,
            &config.rag,
        ))
    }

    /// Build an assistant, creating the generation client from configuration.
    pub fn open(config: &AppConfig) -> AppResult<Self> {
        let provider_config = config.get_provider_config(&config.provider);
        let api_key = config.resolve_api_key(&config.provider);

        let client = create_configured_client(
            &config.provider,
            provider_config.as_ref(),
            api_key.as_deref(),
        )?;
        tracing::info!(
            provider = client.provider_name(),
            model = %config.model,
            "Generation backend ready"
        );

        Self::new(config, client)
    }

    /// Build an assistant on an in-memory index.
    pub fn in_memory(
        client: Arc<dyn LlmClient>,
        model: &str,
        rag: &RagConfig,
    ) -> AppResult<Self> {
        rag.validate()?;
        let store = SqliteStore::in_memory(
            Box::new(TrigramEmbedder::new(rag.embedding_dim)),
            rag.min_similarity,
        )?;
        Ok(Self::with_store(Arc::new(store), client, model, rag))
    }

    pub fn with_store(
        store: Arc<dyn SimilarityStore>,
        client: Arc<dyn LlmClient>,
        model: &str,
        rag: &RagConfig,
    ) -> Self {
        let catalog = CatalogIndex::new(store.clone());
        let content = ContentIndex::new(store.clone());

        let mut tools = ToolManager::new();
        tools.register(SearchTool::new(
            catalog.clone(),
            content.clone(),
            rag.max_results,
        ));
        tools.register(OutlineTool::new(catalog.clone()));

        Self {
            store,
            chunker: Chunker::from_config(rag),
            catalog,
            content,
            tools,
            orchestrator: Orchestrator::new(client, model, rag),
            sessions: SessionStore::new(rag.max_history),
        }
    }

    /// Parse and index one course document, replacing any course with the same title.
    ///
    /// On failure the previously indexed version of the course is left intact.
    pub fn add_course_document(&self, text: &str) -> AppResult<(Course, usize)> {
        let doc = parser::parse_document(text)?;
        self.index_document(doc)
    }

    /// Parse and index one course file.
    pub fn add_course_file(&self, path: &Path) -> AppResult<(Course, usize)> {
        tracing::debug!("Ingesting course file {:?}", path);
        let doc = parser::parse_file(path)?;
        self.index_document(doc)
    }

    /// Index every course document under `dir`.
    ///
    /// Files that fail to parse are skipped. With `clear_existing` every
    /// indexed course is removed first.
    pub fn add_course_folder(&self, dir: &Path, clear_existing: bool) -> AppResult<IngestStats> {
        let start = Instant::now();

        if !dir.is_dir() {
            return Err(AppError::Knowledge(format!(
                "Course folder does not exist: {:?}",
                dir
            )));
        }

        if clear_existing {
            self.clear_all()?;
        }

        let mut stats = IngestStats::default();

        for entry in WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || !parser::is_course_document(path) {
                continue;
            }

            let doc = match parser::parse_file(path) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {}", path, e);
                    stats.documents_skipped += 1;
                    continue;
                }
            };

            let (course, chunks) = self.index_document(doc)?;
            tracing::info!("Added course '{}' ({} chunks)", course.title, chunks);
            stats.courses_added += 1;
            stats.chunks_written += chunks as u32;
        }

        stats.duration_secs = start.elapsed().as_secs_f64();
        tracing::info!(
            "Ingestion completed: {} courses, {} chunks, {} skipped in {:.2}s",
            stats.courses_added,
            stats.chunks_written,
            stats.documents_skipped,
            stats.duration_secs
        );

        Ok(stats)
    }

    fn index_document(&self, doc: ParsedDocument) -> AppResult<(Course, usize)> {
        let chunks = self.chunker.chunk_document(&doc);

        // Catalog first: every stored chunk must name a known course.
        let removed = self.store.replace(&[
            CatalogIndex::replacement(&doc.course),
            ContentIndex::replacement(&doc.course.title, &chunks),
        ])?;
        if removed > 0 {
            tracing::info!("Replaced previously indexed course '{}'", doc.course.title);
        }

        Ok((doc.course, chunks.len()))
    }

    fn clear_all(&self) -> AppResult<()> {
        let titles = self.catalog.course_titles()?;
        for title in &titles {
            self.content.remove_course(title)?;
            self.catalog.remove_course(title)?;
        }
        tracing::info!("Cleared {} indexed courses", titles.len());
        Ok(())
    }

    /// Answer a question, recording the exchange in the given or a new session.
    ///
    /// A failed query records nothing.
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> AppResult<QueryResponse> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.sessions.create_session()?,
        };

        let history = self.sessions.format_history(&session_id)?;
        let prompt = format!("Answer this question about course materials: {}", query);

        tracing::info!(session = %session_id, "Answering query");
        let reply = self
            .orchestrator
            .run(&prompt, history.as_deref(), &self.tools)
            .await?;

        self.sessions.append_turn(&session_id, query, &reply.answer)?;

        Ok(QueryResponse {
            answer: reply.answer,
            sources: reply.sources,
            session_id,
        })
    }

    /// Number and titles of indexed courses.
    pub fn course_analytics(&self) -> AppResult<CourseAnalytics> {
        let course_titles = self.catalog.course_titles()?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    /// Full descriptor of an indexed course, by exact title.
    pub fn course(&self, title: &str) -> AppResult<Option<Course>> {
        self.catalog.get_course(title)
    }

    pub fn chunk_count(&self) -> AppResult<usize> {
        self.content.chunk_count()
    }

    pub fn clear_session(&self, session_id: &str) -> AppResult<()> {
        self.sessions.clear_session(session_id)
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }
}
