//! Outline command handler.

use clap::Args;
use syllabus_core::{config::AppConfig, AppResult};
use syllabus_knowledge::{tools::OUTLINE_TOOL_NAME, CourseAssistant};

/// Show the outline of a course
#[derive(Args, Debug)]
pub struct OutlineCommand {
    /// Course title, or part of it
    pub course: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl OutlineCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing outline command for '{}'", self.course);

        let assistant = CourseAssistant::open(config)?;
        let output = assistant
            .tools()
            .dispatch(
                OUTLINE_TOOL_NAME,
                &serde_json::json!({ "course_name": self.course }),
            )
            .await?;

        if self.json {
            let value = serde_json::json!({
                "outline": output.text,
                "sources": output.sources,
                "isError": output.is_error,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            println!("{}", output.text);
        }

        Ok(())
    }
}
