//! Recovery of canvas commands from free-text model output.
//!
//! Models are asked for a bare JSON array but do not always comply. The
//! normalizer tries progressively looser strategies and, when nothing can be
//! recovered, degrades to a single text shape holding the start of the raw
//! response. It never fails and never returns an empty list.
//!
//! The object scan only matches flat objects. A command containing a nested
//! object is not recovered by that stage.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use canvas_pilot_core::CanvasCommand;

static ACTION_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{[^{}]*"action"[^{}]*\}"#).expect("static regex"));

/// Raw model output as delivered by the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum RawText {
    /// Streamed pieces, joined in order with no separator.
    Chunks(Vec<String>),
    Single(String),
}

impl RawText {
    /// Interpret a provider output value: an array becomes chunks, a string
    /// stays as-is, anything else is rendered as JSON text.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => RawText::Chunks(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            Value::String(s) => RawText::Single(s.clone()),
            Value::Null => RawText::Single(String::new()),
            other => RawText::Single(other.to_string()),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            RawText::Chunks(chunks) => chunks.concat(),
            RawText::Single(text) => text,
        }
    }
}

/// The stage that produced the final command list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    DirectParse,
    BracketExtraction,
    ObjectScan,
    Fallback,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::DirectParse => "direct_parse",
            Strategy::BracketExtraction => "bracket_extraction",
            Strategy::ObjectScan => "object_scan",
            Strategy::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub commands: Vec<CanvasCommand>,
    pub strategy: Strategy,
}

pub fn normalize(raw: RawText) -> Normalized {
    normalize_text(&raw.into_text())
}

pub fn normalize_text(text: &str) -> Normalized {
    let (commands, strategy) = direct_parse(text)
        .map(|c| (c, Strategy::DirectParse))
        .or_else(|| bracket_extraction(text).map(|c| (c, Strategy::BracketExtraction)))
        .unwrap_or_else(|| (object_scan(text), Strategy::ObjectScan));

    if commands.is_empty() {
        debug!(
            attempted = %strategy,
            raw_len = text.len(),
            "No commands recovered, using fallback text shape"
        );
        return Normalized {
            commands: vec![CanvasCommand::fallback_text(text)],
            strategy: Strategy::Fallback,
        };
    }

    debug!(%strategy, count = commands.len(), "Recovered commands from text");
    Normalized { commands, strategy }
}

/// Stage 1: the whole trimmed text is JSON.
fn direct_parse(text: &str) -> Option<Vec<CanvasCommand>> {
    serde_json::from_str::<Value>(text.trim())
        .ok()
        .map(into_commands)
}

/// Stage 2: the first balanced `[...]` span is JSON.
fn bracket_extraction(text: &str) -> Option<Vec<CanvasCommand>> {
    let span = first_array_span(text)?;
    serde_json::from_str::<Value>(span).ok().map(into_commands)
}

/// Stage 3: every flat object mentioning `"action"`, parsed independently.
fn object_scan(text: &str) -> Vec<CanvasCommand> {
    ACTION_OBJECT
        .find_iter(text)
        .filter_map(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .filter_map(CanvasCommand::from_value)
        .collect()
}

fn into_commands(value: Value) -> Vec<CanvasCommand> {
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    items
        .into_iter()
        .filter_map(CanvasCommand::from_value)
        .collect()
}

/// Span from the first `[` to its matching `]`.
///
/// Brackets inside JSON string literals do not count toward the balance.
fn first_array_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                // The scan starts on a `[`, so depth is at least 1 here.
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
