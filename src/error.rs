// src/error.rs

use std::path::PathBuf;

/// Errors that escape a component instead of being folded into a result
/// value. Most failure modes in the flow (plan parse failures, validation
/// errors, step timeouts) are recovered locally and recorded in the run
/// memory; only transport, I/O, and persistence problems surface here.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] reqwest::Error),

    #[error("LLM response missing 'response' field")]
    MalformedLlmResponse,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to serialize run memory: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to persist run memory to {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}
