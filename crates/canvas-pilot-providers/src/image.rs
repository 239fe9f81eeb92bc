//! Image generation through a fixed set of Replicate-hosted models.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Value, json};
use tracing::{info, warn};

use canvas_pilot_core::{DebugInfo, ImageData, ImageResponse, ResponseEnvelope};

use crate::replicate::ReplicateClient;
use crate::{ProviderError, elapsed_ms, json_kind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageModel {
    Seedream4,
    NanoBanana,
    FluxKontextPro,
}

impl ImageModel {
    pub const ALL: [ImageModel; 3] = [
        ImageModel::Seedream4,
        ImageModel::NanoBanana,
        ImageModel::FluxKontextPro,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            ImageModel::Seedream4 => "seedream-4",
            ImageModel::NanoBanana => "nano-banana",
            ImageModel::FluxKontextPro => "flux-kontext-pro",
        }
    }

    pub fn replicate_path(self) -> &'static str {
        match self {
            ImageModel::Seedream4 => "bytedance/seedream-4",
            ImageModel::NanoBanana => "google/nano-banana",
            ImageModel::FluxKontextPro => "black-forest-labs/flux-kontext-pro",
        }
    }

    /// Prediction input: the prompt plus the model's fixed parameters.
    pub fn input(self, prompt: &str) -> Value {
        match self {
            ImageModel::Seedream4 => json!({
                "prompt": prompt,
                "size": "2K",
                "aspect_ratio": "1:1",
                "max_images": 1,
            }),
            ImageModel::NanoBanana => json!({
                "prompt": prompt,
                "output_format": "png",
            }),
            ImageModel::FluxKontextPro => json!({
                "prompt": prompt,
                "aspect_ratio": "1:1",
                "output_format": "png",
            }),
        }
    }
}

impl fmt::Display for ImageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The output shapes image models are known to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutput {
    /// `["https://..."]`
    UrlList(Vec<String>),
    /// `[{"url": "https://..."}]`
    FileList(Vec<String>),
    /// `"https://..."`
    Url(String),
    /// `{"url": "https://..."}`
    File(String),
}

impl ImageOutput {
    pub fn decode(output: &Value) -> Result<Self, ProviderError> {
        match output {
            Value::String(url) => Ok(ImageOutput::Url(url.clone())),
            Value::Object(_) => file_url(output)
                .map(ImageOutput::File)
                .ok_or_else(|| unrecognized(output)),
            Value::Array(items) if items.is_empty() => Err(ProviderError::ImageExtraction(
                "model returned an empty output list".into(),
            )),
            // The first element decides the shape; later elements of another
            // kind are skipped.
            Value::Array(items) => match &items[0] {
                Value::String(_) => Ok(ImageOutput::UrlList(
                    items.iter().filter_map(Value::as_str).map(String::from).collect(),
                )),
                first if file_url(first).is_some() => {
                    Ok(ImageOutput::FileList(items.iter().filter_map(file_url).collect()))
                }
                _ => Err(unrecognized(output)),
            },
            _ => Err(unrecognized(output)),
        }
    }

    /// The first image URL.
    pub fn url(&self) -> &str {
        match self {
            ImageOutput::UrlList(urls) | ImageOutput::FileList(urls) => &urls[0],
            ImageOutput::Url(url) | ImageOutput::File(url) => url,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ImageOutput::UrlList(_) => "url_list",
            ImageOutput::FileList(_) => "file_list",
            ImageOutput::Url(_) => "url",
            ImageOutput::File(_) => "file",
        }
    }
}

fn file_url(value: &Value) -> Option<String> {
    value.get("url").and_then(Value::as_str).map(String::from)
}

fn unrecognized(output: &Value) -> ProviderError {
    ProviderError::ImageExtraction(format!("unrecognized output shape ({})", json_kind(output)))
}

pub struct ImageGenerator {
    replicate: Arc<ReplicateClient>,
}

impl ImageGenerator {
    pub fn new(replicate: Arc<ReplicateClient>) -> Self {
        Self { replicate }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        model: &str,
    ) -> Result<(ImageData, DebugInfo), ProviderError> {
        let image_model =
            ImageModel::from_name(model).ok_or_else(|| ProviderError::UnknownModel(model.to_string()))?;

        let start = Instant::now();
        let output = self
            .replicate
            .run(image_model.replicate_path(), image_model.input(prompt))
            .await?;
        let decoded = ImageOutput::decode(&output)?;

        let data = ImageData {
            image_url: decoded.url().to_string(),
            prompt: prompt.to_string(),
        };
        let debug_info = DebugInfo {
            provider: Some("replicate".into()),
            model: Some(image_model.replicate_path().into()),
            response_time_ms: Some(elapsed_ms(start)),
            raw_output_type: Some(json_kind(&output).into()),
            output_type: Some(decoded.kind().into()),
            ..Default::default()
        };
        Ok((data, debug_info))
    }

    /// Generate an image and wrap the outcome in a response envelope.
    pub async fn generate_image(&self, prompt: &str, model: &str) -> ImageResponse {
        match self.generate(prompt, model).await {
            Ok((data, debug_info)) => {
                info!(model, url = %data.image_url, "Image generated");
                ResponseEnvelope::ok(data, Some(debug_info))
            }
            Err(e) => {
                warn!(model, %e, "Image generation failed");
                ResponseEnvelope::err(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_model_lookup() {
        for model in ImageModel::ALL {
            assert_eq!(ImageModel::from_name(model.name()), Some(model));
        }
        assert_eq!(ImageModel::from_name("dall-e"), None);
        assert_eq!(
            ImageModel::Seedream4.replicate_path(),
            "bytedance/seedream-4"
        );
    }

    #[test]
    fn test_model_inputs() {
        let seedream = ImageModel::Seedream4.input("a cat");
        assert_eq!(seedream["prompt"], "a cat");
        assert_eq!(seedream["size"], "2K");
        assert_eq!(seedream["max_images"], 1);

        let banana = ImageModel::NanoBanana.input("a cat");
        assert_eq!(banana["output_format"], "png");
        assert!(banana.get("aspect_ratio").is_none());

        let flux = ImageModel::FluxKontextPro.input("a cat");
        assert_eq!(flux["aspect_ratio"], "1:1");
    }

    #[test]
    fn test_decode_output_shapes() {
        let out = ImageOutput::decode(&json!(["https://a.png", "https://b.png"])).unwrap();
        assert_eq!(out.kind(), "url_list");
        assert_eq!(out.url(), "https://a.png");

        let out = ImageOutput::decode(&json!([{"url": "https://c.png"}])).unwrap();
        assert_eq!(out, ImageOutput::FileList(vec!["https://c.png".into()]));

        let out = ImageOutput::decode(&json!("https://d.png")).unwrap();
        assert_eq!(out, ImageOutput::Url("https://d.png".into()));

        let out = ImageOutput::decode(&json!({"url": "https://e.png"})).unwrap();
        assert_eq!(out.kind(), "file");
        assert_eq!(out.url(), "https://e.png");
    }

    #[test]
    fn test_decode_uses_first_element_kind() {
        let out = ImageOutput::decode(&json!(["https://a.png", null])).unwrap();
        assert_eq!(out, ImageOutput::UrlList(vec!["https://a.png".into()]));

        let out = ImageOutput::decode(&json!(["https://a.png", {"url": "https://b.png"}])).unwrap();
        assert_eq!(out.kind(), "url_list");
        assert_eq!(out.url(), "https://a.png");

        let out = ImageOutput::decode(&json!([{"url": "https://c.png"}, "https://d.png"])).unwrap();
        assert_eq!(out, ImageOutput::FileList(vec!["https://c.png".into()]));
    }

    #[test]
    fn test_decode_rejects_unknown_shapes() {
        assert!(ImageOutput::decode(&json!([])).is_err());
        assert!(ImageOutput::decode(&json!(42)).is_err());
        assert!(ImageOutput::decode(&json!({"href": "x"})).is_err());
        assert!(ImageOutput::decode(&json!([null, "https://a.png"])).is_err());
        assert!(ImageOutput::decode(&json!([{"href": "x"}])).is_err());
        let err = ImageOutput::decode(&Value::Null).unwrap_err();
        assert!(err.to_string().starts_with("Could not extract image URL"));
    }

    #[tokio::test]
    async fn test_unknown_model_makes_no_call() {
        // Unroutable base URL: any network attempt would surface a transport error.
        let client = ReplicateClient::new(
            reqwest::Client::new(),
            Some("r8_test".into()),
            Some("http://127.0.0.1:9"),
            Duration::from_secs(1),
            Duration::from_millis(10),
        );
        let generator = ImageGenerator::new(Arc::new(client));
        let env = generator.generate_image("a cat", "unknown-model").await;
        assert!(!env.success);
        assert_eq!(env.error.as_deref(), Some("Unknown model: unknown-model"));
    }
}
