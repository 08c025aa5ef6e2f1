//! OpenAI-compatible provider implementation
//!
//! Works with OpenAI, Azure OpenAI, vLLM, Ollama, and other OpenAI-compatible APIs.

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn map_send_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout { secs: self.config.timeout_secs }
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let model = request.model.as_deref().unwrap_or(self.default_model());

        let api_request = OpenAIRequest {
            model: model.to_string(),
            messages: request.messages.into_iter().map(OpenAIMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools: request.tools.as_ref().map(|tools| {
                tools.iter().map(|t| OpenAITool {
                    r#type: "function".into(),
                    function: OpenAIFunction {
                        name: t.name.clone(),
                        description: Some(t.description.clone()),
                        parameters: Some(t.parameters.clone()),
                    },
                }).collect()
            }),
            tool_choice: request.tool_choice.as_ref().map(|tc| match tc {
                ToolChoice::Auto => serde_json::json!("auto"),
                ToolChoice::None => serde_json::json!("none"),
                ToolChoice::Required => serde_json::json!("required"),
                ToolChoice::Function { name } => serde_json::json!({
                    "type": "function",
                    "function": { "name": name }
                }),
            }),
        };

        debug!(
            model = %api_request.model,
            messages = api_request.messages.len(),
            "sending completion request"
        );

        let mut req = self.client
            .post(self.endpoint())
            .json(&api_request);

        if let Some(api_key) = &self.config.api_key {
            if !api_key.is_empty() {
                req = req.bearer_auth(api_key);
            }
        }

        let response = req.send().await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let text = response.text().await.unwrap_or_default();

            return Err(match status {
                429 => ProviderError::RateLimited { retry_after },
                401 => ProviderError::AuthenticationFailed,
                _ => ProviderError::Api { status, message: text },
            });
        }

        let api_response: OpenAIResponse = response.json().await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout { secs: self.config.timeout_secs }
                } else {
                    ProviderError::Parse(e.to_string())
                }
            })?;

        let choice = api_response.choices.into_iter().next()
            .ok_or_else(|| ProviderError::Parse("No choices in response".into()))?;

        let mut tool_calls: Vec<ToolCall> = choice.message.tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        // Servers implementing the older functions API reply with a single
        // `function_call` instead of `tool_calls`.
        if let Some(fc) = choice.message.function_call {
            tool_calls.push(ToolCall {
                id: String::new(),
                name: fc.name,
                arguments: fc.arguments,
            });
        }

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }).unwrap_or_default();

        Ok(CompletionResponse {
            id: api_response.id,
            model: api_response.model,
            content: choice.message.content,
            tool_calls,
            finish_reason: FinishReason::parse(choice.finish_reason.as_deref()),
            usage,
        })
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<OpenAIFunctionCall>,
}

impl From<ChatMessage> for OpenAIMessage {
    fn from(msg: ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().to_string(),
            content: msg.content,
            tool_calls: msg.tool_calls.map(|tcs| {
                tcs.into_iter().map(|tc| OpenAIToolCall {
                    id: tc.id,
                    r#type: "function".into(),
                    function: OpenAIFunctionCall {
                        name: tc.name,
                        arguments: tc.arguments,
                    },
                }).collect()
            }),
            tool_call_id: msg.tool_call_id,
            function_call: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAITool {
    r#type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: OpenAIFunctionCall,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}
