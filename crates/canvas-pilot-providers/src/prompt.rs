//! System prompts sent to the model.
//!
//! The prompt fixes the output contract: a bare JSON array of command
//! objects using the field names of [`canvas_pilot_core::CanvasCommand`].

use canvas_pilot_core::SelectedContent;

pub const CANVAS_SYSTEM_PROMPT: &str = r##"You are a canvas assistant that turns drawing instructions into canvas commands.

You can create shapes and move, resize, or rotate existing shapes. Produce every shape the user asks for in this one response, however many there are.

Shape types:
- rectangle: uses width and height
- circle: use equal width and height (or radius)
- text: uses text and fontSize

Colors are hex strings such as "#FF0000" (red), "#0000FF" (blue), "#00FF00" (green), "#000000" (black).

Coordinates range from -2000 to 2000 on both axes. When asked for many shapes, lay them out on a grid with 50-100 pixels between them, starting at the top left and filling rows.

Break multi-part requests (for example "a login form") into individual elements, positioned and styled consistently.

Command format:
{
  "action": "create" | "move" | "resize" | "rotate",
  "type": "rectangle" | "circle" | "text",   (create only)
  "x": number,
  "y": number,
  "width": number,                           (create and resize)
  "height": number,                          (create and resize)
  "fill": "#RRGGBB",                         (create only)
  "text": string,                            (text shapes only)
  "fontSize": number,                        (text shapes only)
  "shapeId": string,                         (move, resize, rotate)
  "rotation": number                         (rotate only, degrees)
}

Every command must include "action", and every create must include "type". Leave out any item that would lack them; never substitute placeholders.

Respond with the JSON array only, no other text. Example:
[
  {"action": "create", "type": "rectangle", "x": 100, "y": 100, "width": 200, "height": 150, "fill": "#FF0000"}
]"##;

const EDIT_INSTRUCTIONS: &str = r##"The user has selected an existing element on the canvas. Its current properties are:

{selected}

Apply the user's request to this element. Respond with a JSON array holding a single command:
{"action": "edit", ...only the properties that change...}

Editable properties: x, y, width, height, radius, fill, stroke, strokeWidth, text, fontSize, fontFamily, fontStyle, rotation.
Do not repeat properties that stay the same, and do not include "type" or "shapeId". Respond with the JSON array only."##;

const DIRECT_USER_SUFFIX: &str = "Please generate ALL requested shapes in this single response.";

/// System prompt for a request, switched to edit semantics when an element is selected.
pub fn system_prompt(selected: Option<&SelectedContent>) -> String {
    match selected {
        None => CANVAS_SYSTEM_PROMPT.to_string(),
        Some(selected) => format!(
            "{CANVAS_SYSTEM_PROMPT}\n\n{}",
            EDIT_INSTRUCTIONS.replace("{selected}", &selected.snapshot())
        ),
    }
}

/// User message for the direct API path.
pub fn direct_user_message(prompt: &str) -> String {
    format!("{prompt}\n\n{DIRECT_USER_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_prompt_has_no_edit_section() {
        let prompt = system_prompt(None);
        assert_eq!(prompt, CANVAS_SYSTEM_PROMPT);
        assert!(!prompt.contains("\"action\": \"edit\""));
    }

    #[test]
    fn test_selected_content_switches_to_edit() {
        let selected = SelectedContent(json!({"id": "text-1", "text": "Hello", "fontSize": 16}));
        let prompt = system_prompt(Some(&selected));
        assert!(prompt.starts_with(CANVAS_SYSTEM_PROMPT));
        assert!(prompt.contains("\"action\": \"edit\""));
        assert!(prompt.contains("\"id\": \"text-1\""));
        assert!(!prompt.contains("{selected}"));
    }

    #[test]
    fn test_direct_user_message_suffix() {
        let msg = direct_user_message("draw 3 circles");
        assert!(msg.starts_with("draw 3 circles\n\n"));
        assert!(msg.ends_with("in this single response."));
    }
}
