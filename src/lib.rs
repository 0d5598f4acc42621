// src/lib.rs

pub mod agent;
pub mod corrector;
pub mod decision;
pub mod error;
pub mod executor;
pub mod llm;
pub mod memory;
pub mod metrics;
pub mod protocol;
pub mod validation;

pub use agent::{ExecMode, FlowAgent, FlowConfig};
pub use error::FlowError;
pub use protocol::{Plan, PlanStep, RunStatus, RunSummary};
