use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use crate::cache::{CachedResultSet, ResultCache};
use crate::error::{Result, SpliceError};
use crate::models::{ConversationMemory, Row, TableSchema};

/// Per-conversation state handed to every tool call: conversation memory, the
/// single-slot result cache, an optional schema snapshot and the turn counter.
///
/// Keyed by conversation identity, so concurrent conversations never observe
/// each other's cached data.
pub struct SessionContext {
    pub id: String,
    state: Mutex<SessionState>,
}

struct SessionState {
    memory: ConversationMemory,
    cache: ResultCache,
    schema_snapshot: Option<Vec<TableSchema>>,
    completed_turns: u64,
}

impl SessionContext {
    pub fn new(id: impl Into<String>, memory_char_budget: usize) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(SessionState {
                memory: ConversationMemory::new(memory_char_budget),
                cache: ResultCache::default(),
                schema_snapshot: None,
                completed_turns: 0,
            }),
        }
    }

    pub fn store_result(&self, rows: Vec<Row>, columns: Vec<String>, query: &str) {
        let mut state = self.state.lock().unwrap();
        state.cache.store(rows, columns, query);
    }

    pub fn cached_result(&self) -> Option<CachedResultSet> {
        self.state.lock().unwrap().cache.read().cloned()
    }

    /// Snapshot of the cached result set, enforcing the two-stage
    /// no-data/staleness precondition shared by the renderer and exporter.
    pub fn fresh_result(&self, threshold_secs: i64) -> Result<CachedResultSet> {
        let state = self.state.lock().unwrap();
        let Some(cached) = state.cache.read() else {
            return Err(SpliceError::NoData);
        };

        let now = Utc::now();
        if !cached.is_fresh(now, threshold_secs) {
            return Err(SpliceError::StaleData {
                age_secs: cached.age_secs(now),
            });
        }

        Ok(cached.clone())
    }

    pub fn schema_snapshot(&self) -> Option<Vec<TableSchema>> {
        self.state.lock().unwrap().schema_snapshot.clone()
    }

    pub fn set_schema_snapshot(&self, tables: Vec<TableSchema>) {
        self.state.lock().unwrap().schema_snapshot = Some(tables);
    }

    pub fn memory_rendered(&self) -> String {
        self.state.lock().unwrap().memory.render()
    }

    /// Record a completed (user, agent) exchange and return the new turn count.
    pub fn record_turn(&self, user: &str, agent: &str) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.memory.record(user, agent);
        state.completed_turns += 1;
        state.completed_turns
    }

    pub fn completed_turns(&self) -> u64 {
        self.state.lock().unwrap().completed_turns
    }

    /// Wholesale reset: conversation memory, schema snapshot and the result
    /// cache. The turn counter is preserved so periodic resets stay periodic.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.memory.clear();
        state.schema_snapshot = None;
        state.cache.clear();
        tracing::info!(session_id = %self.id, "Session state reset");
    }
}

/// Maps conversation identifiers to their contexts.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<Mutex<HashMap<String, Arc<SessionContext>>>>,
    memory_char_budget: usize,
}

impl SessionManager {
    pub fn new(memory_char_budget: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            memory_char_budget,
        }
    }

    /// Existing session for `id`, or a fresh one (with a generated id when
    /// none was supplied).
    pub fn get_or_create(&self, id: Option<&str>) -> Arc<SessionContext> {
        let id = match id {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .entry(id.clone())
            .or_insert_with(|| Arc::new(SessionContext::new(id, self.memory_char_budget)))
            .clone()
    }
}
