// src/memory/mod.rs

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FlowError;
use crate::protocol::ExecutionResult;

/// One prompt/response exchange with the generation capability.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub agent: String,
}

/// One executed step: the code that ran and what came back.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub timestamp: DateTime<Utc>,
    pub step: u32,
    pub code: String,
    pub result: ExecutionResult,
}

/// Everything the run accumulates. Owned and mutated exclusively by the
/// flow controller; other components return data and never hold a
/// reference to this. Append-only within a run, serialized once at run
/// end as a single full rewrite.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunMemory {
    pub created_at: DateTime<Utc>,
    pub state: Map<String, Value>,
    #[serde(rename = "conversations")]
    pub conversation_history: Vec<ConversationTurn>,
    #[serde(rename = "executions")]
    pub execution_log: Vec<ExecutionRecord>,
}

impl RunMemory {
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            state: Map::new(),
            conversation_history: Vec::new(),
            execution_log: Vec::new(),
        }
    }

    /// Last write wins per key.
    pub fn store(&mut self, key: &str, value: Value) {
        self.state.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    pub fn add_conversation(&mut self, user: &str, agent: &str) {
        self.conversation_history.push(ConversationTurn {
            timestamp: Utc::now(),
            user: user.to_string(),
            agent: agent.to_string(),
        });
    }

    pub fn log_execution(&mut self, step: u32, code: String, result: ExecutionResult) {
        self.execution_log.push(ExecutionRecord {
            timestamp: Utc::now(),
            step,
            code,
            result,
        });
    }

    /// Persist the whole memory as one pretty-printed JSON document.
    pub fn save(&self, path: &Path) -> Result<(), FlowError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| FlowError::Persist {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), executions = self.execution_log.len(), "run memory saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, FlowError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl Default for RunMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn store_overwrites_per_key() {
        let mut memory = RunMemory::new();
        memory.store("plan", json!({"steps": 1}));
        memory.store("plan", json!({"steps": 2}));
        assert_eq!(memory.get("plan"), Some(&json!({"steps": 2})));
    }

    #[test]
    fn execution_log_is_append_only_and_ordered() {
        let mut memory = RunMemory::new();
        for step in 1..=3 {
            memory.log_execution(step, format!("code {step}"), ExecutionResult::failure("x"));
        }
        let steps: Vec<u32> = memory.execution_log.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![1, 2, 3]);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow_log.json");

        let mut memory = RunMemory::new();
        memory.store("goal", json!("close timing"));
        memory.add_conversation("generate code", "from openroad import Design");
        memory.log_execution(1, "code".to_string(), ExecutionResult::failure("boom"));
        memory.save(&path).unwrap();

        let loaded = RunMemory::load(&path).unwrap();
        assert_eq!(loaded.get("goal"), Some(&json!("close timing")));
        assert_eq!(loaded.conversation_history.len(), 1);
        assert_eq!(loaded.execution_log.len(), 1);
        assert_eq!(loaded.execution_log[0].result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn persisted_document_has_the_expected_keys() {
        let memory = RunMemory::new();
        let value = serde_json::to_value(&memory).unwrap();
        for key in ["created_at", "state", "conversations", "executions"] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
    }
}
