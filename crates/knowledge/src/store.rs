//! SQLite-backed similarity store.
//!
//! Records live in named collections. Each record has an id, the embedded
//! text, an embedding and JSON metadata. Queries embed the query text, rank
//! every record of the collection by cosine similarity and return the top
//! matches above the store's relevance floor.

use crate::embeddings::{cosine_similarity, Embedder};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use syllabus_core::{AppError, AppResult};

/// A stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRecord {
    pub id: String,
    pub text: String,
    pub metadata: Value,
}

impl StoreRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: Value) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
        }
    }
}

/// A query match. `distance` is `1 - cosine similarity`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreHit {
    pub record: StoreRecord,
    pub distance: f32,
}

/// Metadata predicate applied before ranking.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataFilter {
    /// Field equals value
    Eq(String, Value),
    /// Every inner filter matches
    And(Vec<MetadataFilter>),
}

impl MetadataFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    /// Combine filters; a single filter is returned unwrapped, none yields `None`.
    pub fn all(mut filters: Vec<MetadataFilter>) -> Option<Self> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Self::And(filters)),
        }
    }

    /// Check a metadata object against this filter.
    pub fn matches(&self, metadata: &Value) -> bool {
        match self {
            Self::Eq(field, expected) => metadata.get(field) == Some(expected),
            Self::And(filters) => filters.iter().all(|f| f.matches(metadata)),
        }
    }
}

/// Records swapped into a collection in place of those matching `filter`.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub collection: String,
    pub filter: MetadataFilter,
    pub records: Vec<StoreRecord>,
}

/// Similarity search over named collections.
///
/// Implementations are blocking; callers hold no async locks across calls.
pub trait SimilarityStore: Send + Sync {
    /// Insert or replace records by id.
    fn upsert(&self, collection: &str, records: &[StoreRecord]) -> AppResult<()>;

    /// Top `top_k` records by similarity to `text`, most similar first.
    fn query(
        &self,
        collection: &str,
        text: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> AppResult<Vec<StoreHit>>;

    /// Fetch one record by id.
    fn get(&self, collection: &str, id: &str) -> AppResult<Option<StoreRecord>>;

    /// Delete every record matching `filter`; returns the number removed.
    fn delete_where(&self, collection: &str, filter: &MetadataFilter) -> AppResult<usize>;

    /// All record ids in insertion order.
    fn ids(&self, collection: &str) -> AppResult<Vec<String>>;

    /// Apply every replacement or none of them; returns the number of records removed.
    fn replace(&self, batch: &[Replacement]) -> AppResult<usize>;
}

/// [`SimilarityStore`] over a single SQLite table.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    embedder: Box<dyn Embedder>,
    min_similarity: f32,
}

impl SqliteStore {
    /// Open (or create) a store at `db_path`.
    pub fn open(
        db_path: &Path,
        embedder: Box<dyn Embedder>,
        min_similarity: f32,
    ) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        tracing::debug!("Opened similarity store at {:?}", db_path);
        Self::with_connection(conn, embedder, min_similarity)
    }

    /// Open a store that lives only in memory.
    pub fn in_memory(embedder: Box<dyn Embedder>, min_similarity: f32) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        Self::with_connection(conn, embedder, min_similarity)
    }

    fn with_connection(
        conn: Connection,
        embedder: Box<dyn Embedder>,
        min_similarity: f32,
    ) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );
            "#,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
            min_similarity,
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("Similarity store lock poisoned".to_string()))
    }

    /// Every record of a collection with its embedding.
    fn scan(conn: &Connection, collection: &str) -> AppResult<Vec<(StoreRecord, Vec<f32>)>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, text, embedding, metadata FROM records
                 WHERE collection = ?1 ORDER BY rowid",
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query records: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, text, embedding, metadata) =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read record: {}", e)))?;
            let metadata: Value = serde_json::from_str(&metadata)?;
            records.push((
                StoreRecord { id, text, metadata },
                bytes_to_embedding(&embedding)?,
            ));
        }

        Ok(records)
    }

    fn insert_records(
        &self,
        conn: &Connection,
        collection: &str,
        records: &[StoreRecord],
    ) -> AppResult<()> {
        for record in records {
            let embedding = embedding_to_bytes(&self.embedder.embed(&record.text));
            let metadata = serde_json::to_string(&record.metadata)?;
            conn.execute(
                "INSERT OR REPLACE INTO records (collection, id, text, embedding, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![collection, record.id, record.text, embedding, metadata],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert record: {}", e)))?;
        }
        Ok(())
    }

    fn delete_matching(
        conn: &Connection,
        collection: &str,
        filter: &MetadataFilter,
    ) -> AppResult<usize> {
        let doomed: Vec<String> = Self::scan(conn, collection)?
            .into_iter()
            .filter(|(record, _)| filter.matches(&record.metadata))
            .map(|(record, _)| record.id)
            .collect();

        for id in &doomed {
            conn.execute(
                "DELETE FROM records WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to delete record: {}", e)))?;
        }
        Ok(doomed.len())
    }
}

impl SimilarityStore for SqliteStore {
    fn upsert(&self, collection: &str, records: &[StoreRecord]) -> AppResult<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

        self.insert_records(&tx, collection, records)?;

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit records: {}", e)))?;

        tracing::debug!("Upserted {} records into '{}'", records.len(), collection);
        Ok(())
    }

    fn query(
        &self,
        collection: &str,
        text: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> AppResult<Vec<StoreHit>> {
        let query_embedding = self.embedder.embed(text);
        let conn = self.lock()?;

        let mut scored: Vec<(StoreRecord, f32)> = Self::scan(&conn, collection)?
            .into_iter()
            .filter(|(record, _)| filter.map_or(true, |f| f.matches(&record.metadata)))
            .map(|(record, embedding)| {
                let score = cosine_similarity(&query_embedding, &embedding);
                (record, score)
            })
            .collect();

        let candidates = scored.len();
        scored.retain(|(_, score)| *score >= self.min_similarity);
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        tracing::debug!(
            "Query on '{}' kept {} of {} candidates (floor {:.2})",
            collection,
            scored.len(),
            candidates,
            self.min_similarity
        );

        Ok(scored
            .into_iter()
            .map(|(record, score)| StoreHit {
                record,
                distance: 1.0 - score,
            })
            .collect())
    }

    fn get(&self, collection: &str, id: &str) -> AppResult<Option<StoreRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT text, metadata FROM records WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|e| AppError::Knowledge(format!("Failed to get record: {}", e)))?;

        match row {
            Some((text, metadata)) => Ok(Some(StoreRecord {
                id: id.to_string(),
                text,
                metadata: serde_json::from_str(&metadata)?,
            })),
            None => Ok(None),
        }
    }

    fn delete_where(&self, collection: &str, filter: &MetadataFilter) -> AppResult<usize> {
        let conn = self.lock()?;
        let removed = Self::delete_matching(&conn, collection, filter)?;

        if removed > 0 {
            tracing::debug!("Deleted {} records from '{}'", removed, collection);
        }
        Ok(removed)
    }

    fn ids(&self, collection: &str) -> AppResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id FROM records WHERE collection = ?1 ORDER BY rowid")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let ids = stmt
            .query_map(params![collection], |row| row.get::<_, String>(0))
            .map_err(|e| AppError::Knowledge(format!("Failed to list ids: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Knowledge(format!("Failed to list ids: {}", e)))?;

        Ok(ids)
    }

    fn replace(&self, batch: &[Replacement]) -> AppResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

        let mut removed = 0;
        for replacement in batch {
            removed += Self::delete_matching(&tx, &replacement.collection, &replacement.filter)?;
            self.insert_records(&tx, &replacement.collection, &replacement.records)?;
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit replacement: {}", e)))?;

        tracing::debug!(
            "Replaced records in {} collections ({} removed)",
            batch.len(),
            removed
        );
        Ok(removed)
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
