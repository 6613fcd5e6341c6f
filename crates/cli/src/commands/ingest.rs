//! Ingest command handler.
//!
//! Parses course documents and indexes them for retrieval.

use clap::Args;
use std::path::PathBuf;
use syllabus_core::{config::AppConfig, AppError, AppResult};
use syllabus_knowledge::{CourseAssistant, IngestStats};

/// Index course documents from files or folders
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Course files or folders to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Remove every indexed course before ingesting
    #[arg(long)]
    pub clear: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {} path(s)", self.paths.len());

        let assistant = CourseAssistant::open(config)?;
        let mut total = IngestStats::default();
        let mut clear = self.clear;

        for path in &self.paths {
            if path.is_dir() {
                let stats = assistant.add_course_folder(path, clear)?;
                clear = false;

                total.courses_added += stats.courses_added;
                total.chunks_written += stats.chunks_written;
                total.documents_skipped += stats.documents_skipped;
                total.duration_secs += stats.duration_secs;
            } else if path.is_file() {
                let (course, chunks) = assistant.add_course_file(path)?;
                tracing::info!("Added course '{}' ({} chunks)", course.title, chunks);

                total.courses_added += 1;
                total.chunks_written += chunks as u32;
            } else {
                return Err(AppError::Config(format!("Path does not exist: {:?}", path)));
            }
        }

        if clear {
            tracing::warn!("--clear only applies to folders; nothing was cleared");
        }

        if self.json {
            let output = serde_json::json!({
                "coursesAdded": total.courses_added,
                "chunksWritten": total.chunks_written,
                "documentsSkipped": total.documents_skipped,
                "durationSecs": total.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Ingested {} courses ({} chunks, {} skipped) in {:.2}s",
                total.courses_added,
                total.chunks_written,
                total.documents_skipped,
                total.duration_secs
            );
        }

        Ok(())
    }
}
