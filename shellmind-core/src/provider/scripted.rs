//! Deterministic provider that replays queued responses.
//!
//! Used by the agent tests and for dry runs without network access. Every
//! request it receives is recorded so callers can assert on what was sent.

use super::*;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Stable provider identifier
pub const SCRIPTED_PROVIDER_ID: &str = "scripted";

#[derive(Debug, Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text reply
    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.push(Ok(CompletionResponse::text(content)));
        self
    }

    /// Queue a reply invoking `name` with raw `arguments`
    pub fn with_tool_call(self, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        let id = format!("call_{}", lock(&self.responses).len() + 1);
        self.push(Ok(CompletionResponse::tool_call(ToolCall::new(id, name, arguments))));
        self
    }

    /// Queue a failure
    pub fn with_error(self, error: ProviderError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, response: Result<CompletionResponse, ProviderError>) {
        lock(&self.responses).push_back(response);
    }

    /// Number of queued responses not yet consumed
    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }

    /// Snapshot of every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        SCRIPTED_PROVIDER_ID
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        lock(&self.requests).push(request);
        lock(&self.responses)
            .pop_front()
            .unwrap_or(Err(ProviderError::Exhausted))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
