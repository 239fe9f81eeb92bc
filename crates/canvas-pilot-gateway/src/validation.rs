//! Request body validation for the prompt endpoints.

use serde_json::Value;
use thiserror::Error;

use canvas_pilot_core::SelectedContent;

/// Reasons a request is rejected with 400 before reaching a provider.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing prompt in request body")]
    MissingPrompt,

    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("Prompt too long (max {max} characters)")]
    PromptTooLong { max: usize },

    #[error("Invalid request: {0}")]
    Invalid(String),
}

/// A validated `{prompt, model?, selectedContent?}` body.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub selected_content: Option<SelectedContent>,
}

impl PromptRequest {
    /// Parse and validate a raw request body.
    ///
    /// The prompt length limit counts characters, not bytes.
    pub fn parse(body: &[u8], max_prompt_chars: usize) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| ValidationError::Invalid(e.to_string()))?;

        let Some(object) = value.as_object() else {
            return Err(ValidationError::MissingPrompt);
        };
        let prompt = match object.get("prompt") {
            None => return Err(ValidationError::MissingPrompt),
            Some(Value::String(p)) if !p.trim().is_empty() => p,
            Some(_) => return Err(ValidationError::EmptyPrompt),
        };
        if prompt.chars().count() > max_prompt_chars {
            return Err(ValidationError::PromptTooLong {
                max: max_prompt_chars,
            });
        }

        let model = match object.get("model") {
            None | Some(Value::Null) => None,
            Some(Value::String(m)) if m.trim().is_empty() => None,
            Some(Value::String(m)) => Some(m.clone()),
            Some(_) => return Err(ValidationError::Invalid("model must be a string".into())),
        };

        let selected_content = match object.get("selectedContent") {
            None | Some(Value::Null) => None,
            Some(selected) => Some(SelectedContent(selected.clone())),
        };

        Ok(Self {
            prompt: prompt.clone(),
            model,
            selected_content,
        })
    }
}
