//! Replicate predictions client and the proxied canvas adapter.
//!
//! A prediction is created with `Prefer: wait`, which usually returns the
//! finished result in one round-trip. If the prediction is still running the
//! client polls its `urls.get` until it reaches a terminal status or the
//! configured deadline passes.

use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, trace};

use canvas_pilot_core::DebugInfo;

use crate::normalize::{RawText, normalize_text};
use crate::prompt::system_prompt;
use crate::{
    CanvasProvider, CanvasRequest, CanvasResult, ProviderError, elapsed_ms, json_kind,
};

pub const REPLICATE_BASE_URL: &str = "https://api.replicate.com";
const PROVIDER: &str = "Replicate";
const DEFAULT_MODEL_OWNER: &str = "openai";

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: Option<String>,
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Value,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    get: Option<String>,
}

impl Prediction {
    fn is_pending(&self) -> bool {
        matches!(self.status.as_str(), "starting" | "processing")
    }

    fn error_detail(&self) -> String {
        match &self.error {
            Value::Null => "no error detail".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Where a model identifier's predictions are created.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ModelRef<'a> {
    /// `owner/name`, served by the model's latest version.
    Official(&'a str),
    /// `owner/name:version`, pinned to one version.
    Version(&'a str),
}

/// `owner/name` with an optional `:version`, each part a plain path-safe token.
static MODEL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)(?::([A-Za-z0-9_.-]+))?$").expect("static regex")
});

impl<'a> ModelRef<'a> {
    /// Parse a model identifier, rejecting anything that would not stay a
    /// single `owner/name` path under `/v1/models/`.
    fn parse(model: &'a str) -> Result<Self, ProviderError> {
        let unknown = || ProviderError::UnknownModel(model.to_string());
        let caps = MODEL_ID.captures(model).ok_or_else(|| unknown())?;
        let dots_only = caps
            .iter()
            .skip(1)
            .flatten()
            .any(|part| part.as_str().chars().all(|c| c == '.'));
        if dots_only {
            return Err(unknown());
        }
        Ok(match caps.get(3) {
            Some(version) => ModelRef::Version(version.as_str()),
            None => ModelRef::Official(model),
        })
    }
}

/// HTTP client for Replicate's predictions API.
pub struct ReplicateClient {
    pub base_url: String,
    token: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
    poll_interval: Duration,
}

impl ReplicateClient {
    pub fn new(
        client: reqwest::Client,
        token: Option<String>,
        base_url: Option<&str>,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(REPLICATE_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            token,
            client,
            timeout,
            poll_interval,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Run a model to completion and return its `output`.
    pub async fn run(&self, model: &str, input: Value) -> Result<Value, ProviderError> {
        let token = self
            .token
            .as_deref()
            .ok_or(ProviderError::MissingCredential("Replicate API token"))?;
        let deadline = Instant::now() + self.timeout;

        let (url, body) = match ModelRef::parse(model)? {
            ModelRef::Official(path) => (
                format!("{}/v1/models/{path}/predictions", self.base_url),
                json!({ "input": input }),
            ),
            ModelRef::Version(version) => (
                format!("{}/v1/predictions", self.base_url),
                json!({ "version": version, "input": input }),
            ),
        };
        debug!(url = %url, model, "Creating prediction");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Prefer", "wait")
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, self.timeout, e))?;
        let mut prediction = self.decode(response).await?;

        while prediction.is_pending() {
            let poll_url = prediction
                .urls
                .as_ref()
                .and_then(|u| u.get.clone())
                .ok_or_else(|| ProviderError::malformed(PROVIDER, "pending prediction has no poll URL"))?;

            let now = Instant::now();
            if now + self.poll_interval >= deadline {
                return Err(ProviderError::Timeout {
                    provider: PROVIDER,
                    secs: self.timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;

            trace!(id = ?prediction.id, status = %prediction.status, "Polling prediction");
            let remaining = deadline.saturating_duration_since(Instant::now());
            let response = self
                .client
                .get(&poll_url)
                .bearer_auth(token)
                .timeout(remaining)
                .send()
                .await
                .map_err(|e| ProviderError::transport(PROVIDER, self.timeout, e))?;
            prediction = self.decode(response).await?;
        }

        match prediction.status.as_str() {
            "succeeded" => {
                debug!(id = ?prediction.id, "Prediction succeeded");
                Ok(prediction.output)
            }
            "failed" | "canceled" => Err(ProviderError::Prediction {
                detail: prediction.error_detail(),
                status: prediction.status,
            }),
            other => Err(ProviderError::malformed(
                PROVIDER,
                format!("unexpected prediction status '{other}'"),
            )),
        }
    }

    async fn decode(&self, response: reqwest::Response) -> Result<Prediction, ProviderError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: PROVIDER,
                status,
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(PROVIDER, e.to_string()))
    }
}

/// Canvas adapter running OpenAI models hosted on Replicate.
pub struct ReplicateCanvasProvider {
    client: Arc<ReplicateClient>,
}

impl ReplicateCanvasProvider {
    pub fn new(client: Arc<ReplicateClient>) -> Self {
        Self { client }
    }
}

/// Hosted model path; bare model names are taken from the `openai` owner.
pub fn hosted_model_path(model: &str) -> String {
    if model.contains('/') {
        model.to_string()
    } else {
        format!("{DEFAULT_MODEL_OWNER}/{model}")
    }
}

fn prediction_input(request: &CanvasRequest) -> Value {
    json!({
        "prompt": request.prompt,
        "messages": [],
        "verbosity": "low",
        "image_input": [],
        "system_prompt": system_prompt(request.selected_content.as_ref()),
        "reasoning_effort": "minimal",
    })
}

#[async_trait]
impl CanvasProvider for ReplicateCanvasProvider {
    fn id(&self) -> &str {
        "replicate"
    }

    async fn invoke(&self, request: &CanvasRequest) -> Result<CanvasResult, ProviderError> {
        let start = Instant::now();
        let model = hosted_model_path(&request.model);
        let output = self.client.run(&model, prediction_input(request)).await?;

        let raw_output_type = json_kind(&output).to_string();
        let text = RawText::from_value(&output).into_text();
        let normalized = normalize_text(&text);

        let debug_info = DebugInfo {
            provider: Some(self.id().to_string()),
            model: Some(model),
            response_time_ms: Some(elapsed_ms(start)),
            parse_strategy: Some(normalized.strategy.to_string()),
            raw_response_length: Some(text.chars().count()),
            raw_output: Some(output),
            raw_output_type: Some(raw_output_type),
            processed_response: Some(text),
            ..Default::default()
        };

        Ok(CanvasResult {
            commands: normalized.commands,
            debug: debug_info,
        })
    }
}
