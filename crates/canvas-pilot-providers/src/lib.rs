//! Provider adapters that turn prompts into canvas commands.
//!
//! Each adapter implements [`CanvasProvider`]: it builds a provider-specific
//! request, performs the round-trip, and hands the result to the
//! [`tool_calls`] decoder or the [`normalize`] cascade. Adapters never raise
//! past [`CanvasProvider::text_to_canvas`]; failures become error envelopes.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use canvas_pilot_core::{
    CanvasCommand, CanvasResponse, CommandData, DebugInfo, ResponseEnvelope, SelectedContent,
};

pub mod error;
pub mod image;
pub mod normalize;
pub mod openai;
pub mod prompt;
pub mod replicate;
pub mod tool_calls;

pub use error::ProviderError;

/// A prompt to translate, with optional editing context.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasRequest {
    pub prompt: String,
    pub model: String,
    pub selected_content: Option<SelectedContent>,
}

impl CanvasRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            selected_content: None,
        }
    }

    pub fn with_selected_content(mut self, selected: Option<SelectedContent>) -> Self {
        self.selected_content = selected;
        self
    }
}

/// Commands recovered from one provider round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasResult {
    pub commands: Vec<CanvasCommand>,
    pub debug: DebugInfo,
}

/// A backend that turns a [`CanvasRequest`] into canvas commands.
#[async_trait]
pub trait CanvasProvider: Send + Sync {
    /// Provider identifier (e.g., "openai", "replicate").
    fn id(&self) -> &str;

    /// Perform one round-trip.
    async fn invoke(&self, request: &CanvasRequest) -> Result<CanvasResult, ProviderError>;

    /// Perform one round-trip and wrap the outcome in a response envelope.
    async fn text_to_canvas(&self, request: &CanvasRequest) -> CanvasResponse {
        match self.invoke(request).await {
            Ok(result) => {
                info!(
                    provider = self.id(),
                    model = %request.model,
                    commands = result.commands.len(),
                    editing = request.selected_content.is_some(),
                    "Canvas commands generated"
                );
                ResponseEnvelope::ok(
                    CommandData {
                        commands: result.commands,
                        message: None,
                    },
                    Some(result.debug),
                )
            }
            Err(e) => {
                warn!(provider = self.id(), model = %request.model, %e, "Provider call failed");
                ResponseEnvelope::err(e.to_string())
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Short name of a JSON value's kind, for diagnostics.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
