// src/protocol/mod.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod planner;

/// An ordered multi-step execution plan for one iteration. Replanning
/// replaces the whole plan; plans are never merged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Plan {
    pub goal: String,
    pub steps: Vec<PlanStep>,
}

/// One step of a plan. `action` is an open label ("read_design",
/// "floorplan", ...); execution order is ascending by `step`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanStep {
    pub step: u32,
    pub action: String,
    pub description: String,
}

/// Report kinds the metrics extractor understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Timing,
    Congestion,
    Drc,
}

/// Outcome of executing one step's generated code.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reports: BTreeMap<ReportKind, String>,
}

impl ExecutionResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: None,
            stderr: None,
            error: Some(error.into()),
            exit_code: None,
            reports: BTreeMap::new(),
        }
    }
}

/// Terminal status of a whole run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Incomplete,
}

/// What the controller hands back after the loop ends.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub goal: String,
    pub iterations: u32,
    pub status: RunStatus,
    pub total_steps: usize,
}
