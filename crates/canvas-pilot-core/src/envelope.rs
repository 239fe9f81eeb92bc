//! JSON response envelopes returned by every endpoint.

use serde::{Deserialize, Deserializer, Serialize};

use crate::command::CanvasCommand;

/// `{success, data?, debug?, error?}` with exactly one of `data`/`error` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_debug"
    )]
    pub debug: Option<DebugInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A malformed `debug` block decodes as absent instead of failing the envelope.
fn lenient_debug<'de, D>(deserializer: D) -> Result<Option<DebugInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl<T> ResponseEnvelope<T> {
    pub fn ok(data: T, debug: Option<DebugInfo>) -> Self {
        Self {
            success: true,
            data: Some(data),
            debug,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            debug: None,
            error: Some(message.into()),
        }
    }
}

pub type CanvasResponse = ResponseEnvelope<CommandData>;
pub type ImageResponse = ResponseEnvelope<ImageData>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    pub commands: Vec<CanvasCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub image_url: String,
    pub prompt: String,
}

/// Advisory diagnostics. Consumers must not depend on any field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_calls: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
}
