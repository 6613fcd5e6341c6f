//! Chat command handler.
//!
//! Interactive question loop sharing one session.

use super::ask::print_response;
use clap::Args;
use syllabus_core::{config::AppConfig, AppResult};
use syllabus_knowledge::CourseAssistant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Chat about the course materials, keeping conversation history
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Session id to continue
    #[arg(short, long)]
    pub session: Option<String>,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Starting chat session");

        let assistant = CourseAssistant::open(config)?;
        let mut session = self.session.clone();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        println!("Ask about the course materials. Type /clear to reset history, /quit to leave.");

        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match line.trim() {
                "" => continue,
                "/quit" | "/exit" => break,
                "/clear" => {
                    if let Some(id) = &session {
                        assistant.clear_session(id)?;
                    }
                    println!("History cleared.");
                }
                question => match assistant.query(question, session.as_deref()).await {
                    Ok(response) => {
                        print_response(&response, false)?;
                        session = Some(response.session_id);
                    }
                    Err(e) => {
                        tracing::error!("Query failed: {}", e);
                        eprintln!("Error: {}", e);
                    }
                },
            }
        }

        Ok(())
    }
}
