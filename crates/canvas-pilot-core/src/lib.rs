//! Canvas command model, response envelopes, config, and errors for Canvas Pilot.

pub mod command;
pub mod config;
pub mod envelope;
pub mod error;

pub use command::{Action, CanvasCommand, SelectedContent, ShapeKind, is_valid_command};
pub use envelope::{CanvasResponse, CommandData, DebugInfo, ImageData, ImageResponse, ResponseEnvelope};
