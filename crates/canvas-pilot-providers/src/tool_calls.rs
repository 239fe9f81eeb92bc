//! Structured tool-call decoding.
//!
//! The direct API path exposes canvas operations as function tools. Each call
//! the model makes is mapped to one [`CanvasCommand`] through a fixed
//! argument-to-field table.

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use canvas_pilot_core::command::DEFAULT_FONT_SIZE;
use canvas_pilot_core::{Action, CanvasCommand};

/// One function call emitted by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    /// JSON-encoded argument object, as sent by the provider.
    pub arguments: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

struct ToolMapping {
    names: &'static [&'static str],
    action: Action,
    /// (tool argument, command field)
    fields: &'static [(&'static str, &'static str)],
}

const SHAPE_FIELDS: &[(&str, &str)] = &[
    ("shapeType", "type"),
    ("x", "x"),
    ("y", "y"),
    ("width", "width"),
    ("height", "height"),
    ("radius", "radius"),
    ("fill", "fill"),
    ("stroke", "stroke"),
    ("strokeWidth", "strokeWidth"),
    ("rotation", "rotation"),
    ("text", "text"),
    ("fontSize", "fontSize"),
    ("fontFamily", "fontFamily"),
    ("fontStyle", "fontStyle"),
];

const TOOL_MAPPINGS: &[ToolMapping] = &[
    ToolMapping {
        names: &["createShape", "create_shape"],
        action: Action::Create,
        fields: SHAPE_FIELDS,
    },
    ToolMapping {
        names: &["moveShape", "move_shape"],
        action: Action::Move,
        fields: &[("shapeId", "shapeId"), ("x", "x"), ("y", "y")],
    },
    ToolMapping {
        names: &["resizeShape", "resize_shape"],
        action: Action::Resize,
        fields: &[("shapeId", "shapeId"), ("width", "width"), ("height", "height")],
    },
    ToolMapping {
        names: &["rotateShape", "rotate_shape"],
        action: Action::Rotate,
        fields: &[("shapeId", "shapeId"), ("rotation", "rotation")],
    },
];

/// Tool definitions sent with direct API requests.
///
/// Only shape creation is offered as a tool; move/resize/rotate are still
/// decoded if a model emits them.
pub fn canvas_tools() -> Vec<Value> {
    vec![json!({
        "type": "function",
        "function": {
            "name": "createShape",
            "description": "Create a new shape on the canvas",
            "parameters": {
                "type": "object",
                "properties": {
                    "shapeType": {"type": "string", "enum": ["rectangle", "circle", "text"]},
                    "x": {"type": "number"},
                    "y": {"type": "number"},
                    "width": {"type": "number"},
                    "height": {"type": "number"},
                    "fill": {"type": "string"},
                    "text": {"type": "string"},
                    "fontSize": {"type": "number"},
                },
                "required": ["shapeType", "x", "y", "width", "height", "fill"],
            },
        },
    })]
}

/// Map tool calls to commands, in order.
///
/// Unknown tools, unparseable arguments, and calls that do not yield a valid
/// command each drop only that call.
pub fn decode_tool_calls(calls: &[ToolCall]) -> Vec<CanvasCommand> {
    calls.iter().filter_map(decode_call).collect()
}

fn decode_call(call: &ToolCall) -> Option<CanvasCommand> {
    let Some(mapping) = TOOL_MAPPINGS
        .iter()
        .find(|m| m.names.contains(&call.name.as_str()))
    else {
        debug!(tool = %call.name, "Skipping unknown tool call");
        return None;
    };

    let args: Map<String, Value> = match serde_json::from_str(&call.arguments) {
        Ok(args) => args,
        Err(e) => {
            warn!(tool = %call.name, %e, "Skipping tool call with malformed arguments");
            return None;
        }
    };

    let mut fields = Map::new();
    fields.insert("action".into(), json!(mapping.action.as_str()));
    for (arg, field) in mapping.fields {
        if let Some(value) = args.get(*arg) {
            fields.insert((*field).to_string(), value.clone());
        }
    }

    if mapping.action == Action::Create && fields.get("type").and_then(Value::as_str) == Some("text") {
        fields.entry("text").or_insert_with(|| json!(""));
        fields.entry("fontSize").or_insert_with(|| json!(DEFAULT_FONT_SIZE));
    }

    let command = CanvasCommand::from_value(Value::Object(fields));
    if command.is_none() {
        debug!(tool = %call.name, "Dropping tool call without a valid command");
    }
    command
}
