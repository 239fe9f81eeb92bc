//! HTTP endpoint handlers.
//!
//! Every prompt endpoint validates the body, delegates to one adapter, and
//! maps the envelope's `success` flag to the status code. Adapters never
//! raise, so handlers never produce a non-envelope error body.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use canvas_pilot_core::{CanvasResponse, ResponseEnvelope};
use canvas_pilot_providers::{CanvasProvider, CanvasRequest};

use crate::state::GatewayState;
use crate::validation::{PromptRequest, ValidationError};

pub async fn hello() -> Json<serde_json::Value> {
    Json(json!({"hello": "world"}))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn method_not_allowed() -> Response {
    envelope_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ResponseEnvelope::<()>::err("Method not allowed"),
    )
}

pub async fn text_to_canvas(State(state): State<Arc<GatewayState>>, body: Bytes) -> Response {
    let direct = state.direct.clone();
    canvas_endpoint("/ai-text-to-canvas", &state, direct.as_ref(), &body).await
}

pub async fn text_to_canvas_replicate(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> Response {
    let proxied = state.proxied.clone();
    canvas_endpoint("/ai-text-to-canvas-replicate", &state, proxied.as_ref(), &body).await
}

pub async fn generate_image(State(state): State<Arc<GatewayState>>, body: Bytes) -> Response {
    let start = Instant::now();
    let request = match PromptRequest::parse(&body, state.max_prompt_chars()) {
        Ok(request) => request,
        Err(e) => return validation_failure("/ai-generate-image", start, e),
    };
    let model = request.model.unwrap_or_else(|| state.default_image_model());

    info!(model = %model, prompt_len = request.prompt.len(), "Image generation request");
    let envelope = state.images.generate_image(&request.prompt, &model).await;
    finish("/ai-generate-image", start, &envelope)
}

async fn canvas_endpoint(
    endpoint: &'static str,
    state: &GatewayState,
    provider: &dyn CanvasProvider,
    body: &[u8],
) -> Response {
    let start = Instant::now();
    let request = match PromptRequest::parse(body, state.max_prompt_chars()) {
        Ok(request) => request,
        Err(e) => return validation_failure(endpoint, start, e),
    };

    let canvas_request = CanvasRequest::new(
        request.prompt,
        request.model.unwrap_or_else(|| state.default_model()),
    )
    .with_selected_content(request.selected_content);

    info!(
        endpoint,
        provider = provider.id(),
        model = %canvas_request.model,
        prompt_len = canvas_request.prompt.len(),
        "Canvas request"
    );
    let envelope: CanvasResponse = provider.text_to_canvas(&canvas_request).await;

    #[cfg(feature = "metrics")]
    if let Some(data) = &envelope.data {
        crate::metrics::record_commands(provider.id(), data.commands.len());
    }

    finish(endpoint, start, &envelope)
}

fn validation_failure(endpoint: &str, start: Instant, error: ValidationError) -> Response {
    debug!(endpoint, %error, "Rejected request");
    #[cfg(feature = "metrics")]
    crate::metrics::record_error("validation");
    let status = StatusCode::BAD_REQUEST;
    record(endpoint, status, start);
    envelope_response(status, &ResponseEnvelope::<()>::err(error.to_string()))
}

fn finish<T: Serialize>(endpoint: &str, start: Instant, envelope: &ResponseEnvelope<T>) -> Response {
    let status = if envelope.success {
        StatusCode::OK
    } else {
        #[cfg(feature = "metrics")]
        crate::metrics::record_error("provider");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    record(endpoint, status, start);
    envelope_response(status, envelope)
}

#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
fn record(endpoint: &str, status: StatusCode, start: Instant) {
    #[cfg(feature = "metrics")]
    crate::metrics::record_request(endpoint, status.as_u16(), start.elapsed().as_secs_f64());
}

fn envelope_response<T: Serialize>(status: StatusCode, envelope: &ResponseEnvelope<T>) -> Response {
    (status, Json(envelope)).into_response()
}

#[cfg(feature = "metrics")]
pub async fn metrics(State(state): State<Arc<GatewayState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => envelope_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &ResponseEnvelope::<()>::err("Metrics recorder not installed"),
        ),
    }
}
