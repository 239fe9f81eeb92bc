//! Gateway shared state.

use std::sync::Arc;

use canvas_pilot_core::config::Config;
use canvas_pilot_providers::CanvasProvider;
use canvas_pilot_providers::image::ImageGenerator;
use canvas_pilot_providers::openai::OpenAiCanvasProvider;
use canvas_pilot_providers::replicate::{ReplicateCanvasProvider, ReplicateClient};

/// Shared state accessible from all handlers. Immutable once built.
pub struct GatewayState {
    pub config: Arc<Config>,
    /// Direct OpenAI API adapter.
    pub direct: Arc<dyn CanvasProvider>,
    /// Replicate-hosted adapter.
    pub proxied: Arc<dyn CanvasProvider>,
    pub images: Arc<ImageGenerator>,
    #[cfg(feature = "metrics")]
    pub metrics: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

impl GatewayState {
    pub fn new(
        config: Arc<Config>,
        direct: Arc<dyn CanvasProvider>,
        proxied: Arc<dyn CanvasProvider>,
        images: Arc<ImageGenerator>,
    ) -> Self {
        Self {
            config,
            direct,
            proxied,
            images,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Build every adapter from configuration around one shared HTTP client.
    ///
    /// Missing credentials are not an error here; requests report them.
    pub fn from_config(config: Arc<Config>, client: reqwest::Client) -> Self {
        let openai_base = config.openai().and_then(|p| p.base_url.clone());
        let direct = OpenAiCanvasProvider::new(
            client.clone(),
            config.openai_api_key(),
            openai_base.as_deref(),
            config.openai_timeout(),
        );

        let replicate_base = config.replicate().and_then(|p| p.base_url.clone());
        let replicate = Arc::new(ReplicateClient::new(
            client,
            config.replicate_api_token(),
            replicate_base.as_deref(),
            config.replicate_timeout(),
            config.replicate_poll_interval(),
        ));

        Self::new(
            config,
            Arc::new(direct),
            Arc::new(ReplicateCanvasProvider::new(replicate.clone())),
            Arc::new(ImageGenerator::new(replicate)),
        )
    }

    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, handle: metrics_exporter_prometheus::PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn default_model(&self) -> String {
        self.config.default_model()
    }

    pub fn default_image_model(&self) -> String {
        self.config.default_image_model()
    }

    pub fn max_prompt_chars(&self) -> usize {
        self.config.max_prompt_chars()
    }
}
