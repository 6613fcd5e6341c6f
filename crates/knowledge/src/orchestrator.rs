//! Two-round tool-calling protocol with the generation backend.
//!
//! Round 1 offers every tool. If the backend answers directly the answer is
//! returned. If it asks for tools, the whole batch is executed, the results
//! are appended to the conversation and round 2 is sent with tools disabled.
//! A query therefore costs at most two backend calls and one tool round.

use crate::tools::{SourceLedger, ToolManager};
use crate::types::Source;
use std::sync::Arc;
use syllabus_core::{AppError, AppResult, RagConfig};
use syllabus_llm::{LlmClient, LlmRequest, LlmResponse, Message};

/// System instruction for course-material questions.
pub const SYSTEM_PROMPT: &str = "\
You are an assistant specialised in course materials and educational content, with tools for course information.

Tool usage:
- search_course_content: questions about specific course content or detailed educational material
- get_course_outline: questions about course structure, lesson lists or course outlines
- You get one round of tool calls per question; request every search you need in that round
- Synthesise tool results into accurate, fact-based answers
- If a tool yields no results, say so plainly without offering alternatives

When answering outline questions, include the course title, the course link and the complete numbered lesson list.

Response protocol:
- General knowledge questions: answer from your own knowledge without tools
- Course content questions: search first, then answer
- No meta-commentary: do not explain your reasoning or mention the search results or the outline

Answers must be brief, educational, clear and supported by examples when they help. Provide only the direct answer to what was asked.";

#[derive(Debug)]
enum Phase {
    AwaitingFirstResponse,
    AwaitingFinalResponse,
    Done(String),
}

/// Final result of one orchestrated query.
#[derive(Debug, Clone)]
pub struct OrchestratorReply {
    pub answer: String,
    pub sources: Vec<Source>,
    /// Number of backend round-trips made (1 or 2)
    pub backend_calls: usize,
}

pub struct Orchestrator {
    client: Arc<dyn LlmClient>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, config: &RagConfig) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Answer `query`, optionally in the context of prior conversation.
    pub async fn run(
        &self,
        query: &str,
        history: Option<&str>,
        tools: &ToolManager,
    ) -> AppResult<OrchestratorReply> {
        let system = match history {
            Some(history) => format!("{}\n\nPrevious conversation:\n{}", SYSTEM_PROMPT, history),
            None => SYSTEM_PROMPT.to_string(),
        };

        let mut messages = vec![Message::user(query)];
        let mut ledger = SourceLedger::new();
        let mut backend_calls = 0;
        let mut phase = Phase::AwaitingFirstResponse;

        loop {
            tracing::debug!(?phase, "Orchestrator step");
            phase = match phase {
                Phase::AwaitingFirstResponse => {
                    let request = self
                        .request(&system, messages.clone())
                        .with_tools(tools.schemas());
                    let response = self.send(&request, &mut backend_calls).await?;

                    if !response.requests_tools() {
                        Phase::Done(final_text(&response)?)
                    } else {
                        let calls = response.tool_calls();
                        let results = tools.execute_round(&calls, &mut ledger).await?;

                        messages.push(Message::assistant(response.content));
                        messages.push(Message::tool_results(results));
                        Phase::AwaitingFinalResponse
                    }
                }
                Phase::AwaitingFinalResponse => {
                    let request = self.request(&system, messages.clone());
                    let response = self.send(&request, &mut backend_calls).await?;

                    if response.requests_tools() {
                        tracing::warn!(
                            calls = response.tool_calls().len(),
                            "Ignoring tool requests in the final round"
                        );
                    }
                    Phase::Done(final_text(&response)?)
                }
                Phase::Done(answer) => {
                    let sources = ledger.into_sources();
                    tracing::info!(
                        backend_calls,
                        sources = sources.len(),
                        "Query answered"
                    );
                    return Ok(OrchestratorReply {
                        answer,
                        sources,
                        backend_calls,
                    });
                }
            };
        }
    }

    fn request(&self, system: &str, messages: Vec<Message>) -> LlmRequest {
        LlmRequest::new(&self.model, messages)
            .with_system(system)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }

    async fn send(&self, request: &LlmRequest, calls: &mut usize) -> AppResult<LlmResponse> {
        *calls += 1;
        self.client.complete(request).await.map_err(|e| match e {
            AppError::GenerationBackend(_) => e,
            other => AppError::GenerationBackend(other.to_string()),
        })
    }
}

fn final_text(response: &LlmResponse) -> AppResult<String> {
    let answer = response.answer();
    if answer.trim().is_empty() {
        return Err(AppError::GenerationBackend(
            "backend returned an empty answer".to_string(),
        ));
    }
    Ok(answer)
}
