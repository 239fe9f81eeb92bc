//! HTTP gateway for Canvas Pilot.
//!
//! Hosts the prompt-to-canvas and image generation endpoints on axum. The
//! gateway holds no mutable state: every handler reads the shared
//! [`GatewayState`] and delegates to a provider adapter.

pub mod handlers;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod server;
pub mod state;
pub mod validation;

pub use server::{router, serve, start_gateway};
pub use state::GatewayState;
