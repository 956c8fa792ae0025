use crate::llm::Provider;
use std::fmt;

/// A failed provider call, keeping the raw output around for diagnostics.
#[derive(Debug, Clone)]
pub struct LlmCallError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl fmt::Display for LlmCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={:?}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmCallError {}
