//! Canvas command model and validation.
//!
//! A [`CanvasCommand`] is one instruction for the drawing client: create a
//! shape, or move/resize/rotate/edit an existing one. Only `action` (and
//! `type` for creates) are checked; every other property is carried through
//! verbatim so the renderer sees exactly what the model produced.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::CanvasPilotError;

/// Number of characters of raw model output kept in a fallback text shape.
pub const FALLBACK_TEXT_CHARS: usize = 100;

/// Default font size for text shapes.
pub const DEFAULT_FONT_SIZE: u32 = 16;

/// Properties an `edit` command may change.
pub const MUTABLE_PROPERTIES: [&str; 13] = [
    "x",
    "y",
    "width",
    "height",
    "radius",
    "fill",
    "stroke",
    "strokeWidth",
    "text",
    "fontSize",
    "fontFamily",
    "fontStyle",
    "rotation",
];

/// Command discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Move,
    Resize,
    Rotate,
    Edit,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Move,
        Action::Resize,
        Action::Rotate,
        Action::Edit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Move => "move",
            Action::Resize => "resize",
            Action::Rotate => "rotate",
            Action::Edit => "edit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape kinds the client can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Text,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 3] = [ShapeKind::Rectangle, ShapeKind::Circle, ShapeKind::Text];

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Text => "text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true iff `value` is an object with a known string `action` and,
/// for `create`, a known string `type`.
///
/// All other structure is advisory: a `resize` without `width` still passes.
pub fn is_valid_command(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    match obj.get("action").and_then(Value::as_str).and_then(Action::from_name) {
        Some(Action::Create) => obj
            .get("type")
            .and_then(Value::as_str)
            .and_then(ShapeKind::from_name)
            .is_some(),
        Some(_) => true,
        None => false,
    }
}

/// A single validated canvas command.
///
/// `action` and `type` live in typed fields; `properties` holds every other
/// key exactly as received. Serialization flattens everything back into one
/// wire object, so encoding and decoding a valid command is lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct CanvasCommand {
    pub action: Action,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub shape_type: Option<ShapeKind>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl CanvasCommand {
    /// Validate and convert a raw JSON value, discarding it if invalid.
    pub fn from_value(value: Value) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// The degraded text shape used when no commands can be recovered from a
    /// model response.
    pub fn fallback_text(raw: &str) -> Self {
        let text: String = raw.chars().take(FALLBACK_TEXT_CHARS).collect();
        let mut properties = Map::new();
        properties.insert("x".into(), json!(0));
        properties.insert("y".into(), json!(0));
        properties.insert("width".into(), json!(400));
        properties.insert("height".into(), json!(100));
        properties.insert("fill".into(), json!("#000000"));
        properties.insert("text".into(), json!(text));
        properties.insert("fontSize".into(), json!(DEFAULT_FONT_SIZE));
        Self {
            action: Action::Create,
            shape_type: Some(ShapeKind::Text),
            properties,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn shape_id(&self) -> Option<&str> {
        self.string("shapeId")
    }

    pub fn x(&self) -> Option<f64> {
        self.number("x")
    }

    pub fn y(&self) -> Option<f64> {
        self.number("y")
    }

    pub fn width(&self) -> Option<f64> {
        self.number("width")
    }

    pub fn height(&self) -> Option<f64> {
        self.number("height")
    }

    pub fn radius(&self) -> Option<f64> {
        self.number("radius")
    }

    pub fn rotation(&self) -> Option<f64> {
        self.number("rotation")
    }

    pub fn fill(&self) -> Option<&str> {
        self.string("fill")
    }

    pub fn text(&self) -> Option<&str> {
        self.string("text")
    }

    pub fn font_size(&self) -> Option<f64> {
        self.number("fontSize")
    }

    /// Mutable properties an `edit` command would change.
    pub fn changed_properties(&self) -> Vec<&'static str> {
        MUTABLE_PROPERTIES
            .into_iter()
            .filter(|p| self.properties.contains_key(*p))
            .collect()
    }
}

impl TryFrom<Value> for CanvasCommand {
    type Error = CanvasPilotError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut properties) = value else {
            return Err(CanvasPilotError::InvalidCommand(
                "expected a JSON object".into(),
            ));
        };

        let action = match properties.remove("action") {
            Some(Value::String(name)) => Action::from_name(&name).ok_or_else(|| {
                CanvasPilotError::InvalidCommand(format!("unknown action '{name}'"))
            })?,
            Some(_) => {
                return Err(CanvasPilotError::InvalidCommand(
                    "action must be a string".into(),
                ));
            }
            None => return Err(CanvasPilotError::InvalidCommand("missing action".into())),
        };

        let shape_type = properties
            .get("type")
            .and_then(Value::as_str)
            .and_then(ShapeKind::from_name);
        if shape_type.is_some() {
            properties.remove("type");
        } else if action == Action::Create {
            return Err(CanvasPilotError::InvalidCommand(
                "create requires a rectangle, circle or text type".into(),
            ));
        }

        Ok(Self {
            action,
            shape_type,
            properties,
        })
    }
}

/// Snapshot of the element currently selected on the canvas.
///
/// Forwarded verbatim into the edit-mode system prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedContent(pub Value);

impl SelectedContent {
    pub fn snapshot(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
    }
}
