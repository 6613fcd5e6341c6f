//! Bounded per-session conversation history.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use syllabus_core::{AppError, AppResult};

/// One user/assistant exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

type History = Arc<Mutex<VecDeque<Turn>>>;

/// Keeps the most recent `max_turns` exchanges of every session.
///
/// Each session has its own lock, so appends to one session never wait on
/// another and an append is atomic per turn.
pub struct SessionStore {
    max_turns: usize,
    sessions: RwLock<HashMap<String, History>>,
}

impl SessionStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Start a session with a fresh id.
    ///
    /// Nothing is stored until the first turn is appended.
    pub fn create_session(&self) -> AppResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        tracing::debug!("Created session {}", id);
        Ok(id)
    }

    /// Number of sessions holding an entry.
    pub fn session_count(&self) -> AppResult<usize> {
        Ok(self.sessions.read().map_err(|_| poisoned())?.len())
    }

    /// Turns of a session, oldest first. Unknown ids have no history.
    pub fn history(&self, session_id: &str) -> AppResult<Vec<Turn>> {
        match self.existing(session_id)? {
            Some(history) => {
                let turns = history.lock().map_err(|_| poisoned())?;
                Ok(turns.iter().cloned().collect())
            }
            None => Ok(Vec::new()),
        }
    }

    /// Record an exchange, evicting the oldest turns beyond the limit.
    pub fn append_turn(&self, session_id: &str, user: &str, assistant: &str) -> AppResult<()> {
        let history = self.get_or_create(session_id)?;
        let mut turns = history.lock().map_err(|_| poisoned())?;

        turns.push_back(Turn {
            user: user.to_string(),
            assistant: assistant.to_string(),
        });
        while turns.len() > self.max_turns {
            turns.pop_front();
        }

        Ok(())
    }

    /// History rendered as `User:`/`Assistant:` lines, `None` when empty.
    pub fn format_history(&self, session_id: &str) -> AppResult<Option<String>> {
        let turns = self.history(session_id)?;
        if turns.is_empty() {
            return Ok(None);
        }

        let lines: Vec<String> = turns
            .iter()
            .flat_map(|turn| {
                [
                    format!("User: {}", turn.user),
                    format!("Assistant: {}", turn.assistant),
                ]
            })
            .collect();
        Ok(Some(lines.join("\n")))
    }

    /// Forget the turns of a session. The id stays usable.
    pub fn clear_session(&self, session_id: &str) -> AppResult<()> {
        if let Some(history) = self.existing(session_id)? {
            history.lock().map_err(|_| poisoned())?.clear();
        }
        Ok(())
    }

    fn existing(&self, session_id: &str) -> AppResult<Option<History>> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        Ok(sessions.get(session_id).cloned())
    }

    fn get_or_create(&self, session_id: &str) -> AppResult<History> {
        if let Some(history) = self.existing(session_id)? {
            return Ok(history);
        }
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        Ok(sessions
            .entry(session_id.to_string())
            .or_default()
            .clone())
    }
}

fn poisoned() -> AppError {
    AppError::Session("session lock poisoned".to_string())
}
