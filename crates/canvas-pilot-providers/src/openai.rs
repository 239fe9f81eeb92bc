//! OpenAI Chat Completions adapter.
//!
//! Sends one non-streaming request to `/v1/chat/completions` with the
//! `createShape` tool attached. Tool calls in the reply are decoded directly;
//! a reply without tool calls falls through to the text normalizer.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use canvas_pilot_core::DebugInfo;

use crate::normalize::normalize_text;
use crate::prompt::{direct_user_message, system_prompt};
use crate::tool_calls::{ToolCall, canvas_tools, decode_tool_calls};
use crate::{CanvasProvider, CanvasRequest, CanvasResult, ProviderError, elapsed_ms};

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const PROVIDER: &str = "OpenAI";
const MAX_COMPLETION_TOKENS: u32 = 16000;
const TEMPERATURE: f64 = 1.0;

pub struct OpenAiCanvasProvider {
    pub base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl OpenAiCanvasProvider {
    pub fn new(
        client: reqwest::Client,
        api_key: Option<String>,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            client,
            timeout,
        }
    }

    fn build_request(&self, request: &CanvasRequest) -> ChatRequest {
        ChatRequest {
            model: request.model.clone(),
            messages: vec![
                json!({
                    "role": "system",
                    "content": system_prompt(request.selected_content.as_ref()),
                }),
                json!({
                    "role": "user",
                    "content": direct_user_message(&request.prompt),
                }),
            ],
            tools: canvas_tools(),
            tool_choice: "auto",
            max_completion_tokens: MAX_COMPLETION_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

// --- OpenAI request/response types ---

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    tools: Vec<Value>,
    tool_choice: &'static str,
    max_completion_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[async_trait]
impl CanvasProvider for OpenAiCanvasProvider {
    fn id(&self) -> &str {
        "openai"
    }

    async fn invoke(&self, request: &CanvasRequest) -> Result<CanvasResult, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential("OpenAI API key"))?;

        let start = Instant::now();
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request(request);
        debug!(url = %url, model = %body.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, self.timeout, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: PROVIDER,
                status,
                body,
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(PROVIDER, e.to_string()))?;

        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "no choices"))?;

        let calls: Vec<ToolCall> = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| ToolCall::new(c.function.name, c.function.arguments))
            .collect();

        let mut debug_info = DebugInfo {
            provider: Some(self.id().to_string()),
            model: Some(request.model.clone()),
            function_calls: Some(calls.len()),
            ..Default::default()
        };
        if let Some(usage) = completion.usage {
            debug_info.tokens_used = Some(usage.total_tokens);
            debug_info.prompt_tokens = Some(usage.prompt_tokens);
            debug_info.completion_tokens = Some(usage.completion_tokens);
        }

        let commands = if calls.is_empty() {
            let content = message.content.unwrap_or_default();
            debug!(len = content.len(), "No tool calls, normalizing message content");
            let normalized = normalize_text(&content);
            debug_info.parse_strategy = Some(normalized.strategy.to_string());
            debug_info.raw_response_length = Some(content.chars().count());
            debug_info.processed_response = Some(content);
            normalized.commands
        } else {
            decode_tool_calls(&calls)
        };

        debug_info.response_time_ms = Some(elapsed_ms(start));
        Ok(CanvasResult {
            commands,
            debug: debug_info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_pilot_core::SelectedContent;

    fn provider(base_url: Option<&str>) -> OpenAiCanvasProvider {
        OpenAiCanvasProvider::new(
            reqwest::Client::new(),
            Some("sk-test".into()),
            base_url,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_openai_provider_creation() {
        let provider = provider(None);
        assert_eq!(provider.id(), "openai");
        assert_eq!(provider.base_url, OPENAI_BASE_URL);
    }

    #[test]
    fn test_custom_base_url() {
        let provider = provider(Some("https://my-proxy.example.com/"));
        assert_eq!(provider.base_url, "https://my-proxy.example.com");
    }

    #[test]
    fn test_request_body_shape() {
        let provider = provider(None);
        let request = CanvasRequest::new("draw a red square", "gpt-5-mini");
        let body = serde_json::to_value(provider.build_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-5-mini");
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["max_completion_tokens"], 16000);
        assert_eq!(body["temperature"], 1.0);
        assert_eq!(body["tools"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.starts_with("draw a red square"));
        assert!(user.ends_with("Please generate ALL requested shapes in this single response."));
    }

    #[test]
    fn test_request_includes_selection() {
        let provider = provider(None);
        let request = CanvasRequest::new("make it blue", "gpt-5-mini")
            .with_selected_content(Some(SelectedContent(json!({"id": "r1", "fill": "#FF0000"}))));
        let body = serde_json::to_value(provider.build_request(&request)).unwrap();
        let system = body["messages"][0]["content"].as_str().unwrap();
        assert!(system.contains("\"id\": \"r1\""));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let provider = OpenAiCanvasProvider::new(
            reqwest::Client::new(),
            None,
            Some("http://127.0.0.1:9"),
            Duration::from_secs(1),
        );
        let err = provider
            .invoke(&CanvasRequest::new("hi", "gpt-5-mini"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "OpenAI API key not configured");
    }

    #[test]
    fn test_response_without_tool_calls_deserializes() {
        let raw = json!({
            "choices": [{"message": {"role": "assistant", "content": "[]"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        assert!(parsed.choices[0].message.tool_calls.is_none());
        assert_eq!(parsed.usage.unwrap().total_tokens, 12);
    }
}
