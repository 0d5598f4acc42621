// src/llm/mod.rs

use serde_json::{Value, json};

use crate::error::FlowError;

/// The external text-generation capability. The flow controller and the
/// planner are the only callers; no structure is guaranteed in the output,
/// all structure is recovered downstream by best-effort parsing.
pub trait Generator {
    fn generate(&self, prompt: &str) -> Result<String, FlowError>;
}

/// Blocking client for an Ollama-compatible `/api/generate` endpoint.
/// Constructed once at startup and reused across iterations.
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new("http://localhost:11434", "llama3")
    }
}

impl Generator for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String, FlowError> {
        let url = format!("{}/api/generate", self.endpoint);
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "sending generation request");

        let response: Value = self.client.post(&url).json(&payload).send()?.json()?;

        match response.get("response").and_then(|v| v.as_str()) {
            Some(text) => Ok(text.trim().to_string()),
            None => Err(FlowError::MalformedLlmResponse),
        }
    }
}
