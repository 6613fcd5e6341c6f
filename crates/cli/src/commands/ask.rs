//! Ask command handler.
//!
//! Answers one question about the indexed course materials.

use clap::Args;
use std::path::PathBuf;
use syllabus_core::{config::AppConfig, AppError, AppResult};
use syllabus_knowledge::{CourseAssistant, QueryResponse};

/// Ask a question about the course materials
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Session id to continue
    #[arg(short, long)]
    pub session: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let question = self.get_question()?;
        let assistant = CourseAssistant::open(config)?;

        let response = assistant
            .query(&question, self.session.as_deref())
            .await?;

        print_response(&response, self.json)
    }

    fn get_question(&self) -> AppResult<String> {
        if let Some(question) = &self.question {
            return Ok(question.clone());
        }

        match &self.file {
            Some(path) => Ok(std::fs::read_to_string(path)?.trim().to_string()),
            None => Err(AppError::Config("No question provided".to_string())),
        }
    }
}

/// Print an answer and its sources to stdout.
pub fn print_response(response: &QueryResponse, json: bool) -> AppResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    println!("{}", response.answer);

    if !response.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &response.sources {
            match &source.url {
                Some(url) => println!("- {} ({})", source.label, url),
                None => println!("- {}", source.label),
            }
        }
    }

    tracing::debug!("Session: {}", response.session_id);
    Ok(())
}
