//! Courses command handler.

use clap::Args;
use syllabus_core::{config::AppConfig, AppResult};
use syllabus_knowledge::CourseAssistant;

/// List indexed courses
#[derive(Args, Debug)]
pub struct CoursesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CoursesCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing courses command");

        let assistant = CourseAssistant::open(config)?;
        let analytics = assistant.course_analytics()?;

        if self.json {
            let output = serde_json::json!({
                "totalCourses": analytics.total_courses,
                "courseTitles": analytics.course_titles,
                "totalChunks": assistant.chunk_count()?,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Courses: {}", analytics.total_courses);
            for title in &analytics.course_titles {
                println!("  - {}", title);
            }
        }

        Ok(())
    }
}
