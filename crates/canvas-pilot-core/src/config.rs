//! Configuration loading and validation.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_TEXT_MODEL: &str = "gpt-5-mini";
pub const DEFAULT_IMAGE_MODEL: &str = "seedream-4";
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 2000;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const REPLICATE_API_TOKEN_ENV: &str = "REPLICATE_API_TOKEN";

/// Top-level Canvas Pilot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers: Option<ProvidersConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas: Option<CanvasConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<ProviderConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicate: Option<ProviderConfig>,
}

/// Connection settings for one upstream provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Upper bound on one provider round-trip, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Delay between prediction status polls (Replicate only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
}

impl ProviderConfig {
    /// Resolve the API key: `api_key` first, then the `api_key_env` variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret_field(&self.api_key, &self.api_key_env)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_text_model")]
    pub default_model: String,

    #[serde(default = "default_image_model")]
    pub default_image_model: String,

    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            default_model: default_text_model(),
            default_image_model: default_image_model(),
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.into()
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.into()
}

fn default_max_prompt_chars() -> usize {
    DEFAULT_MAX_PROMPT_CHARS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "canvas_pilot_providers=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

/// Resolve a secret: check the direct value first, then the env-var reference.
pub fn resolve_secret_field(direct: &Option<String>, env_var: &Option<String>) -> Option<String> {
    if let Some(val) = direct {
        if !val.is_empty() {
            return Some(val.clone());
        }
    }
    if let Some(env) = env_var {
        if let Ok(val) = std::env::var(env) {
            if !val.is_empty() {
                return Some(val);
            }
        }
    }
    None
}

static ENV_VAR_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("static regex"));

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_default()
        })
        .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let substituted = substitute_env_vars(&raw);

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| crate::error::CanvasPilotError::Config(e.to_string()))?;

        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Default config file location.
    pub fn config_path() -> PathBuf {
        data_dir().join("config.json")
    }

    pub fn server_port(&self) -> u16 {
        self.server.as_ref().map(|s| s.port).unwrap_or(DEFAULT_PORT)
    }

    pub fn server_bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string())
    }

    pub fn openai(&self) -> Option<&ProviderConfig> {
        self.providers.as_ref().and_then(|p| p.openai.as_ref())
    }

    pub fn replicate(&self) -> Option<&ProviderConfig> {
        self.providers.as_ref().and_then(|p| p.replicate.as_ref())
    }

    /// OpenAI key from config, falling back to `OPENAI_API_KEY`.
    pub fn openai_api_key(&self) -> Option<String> {
        resolve_with_default_env(self.openai(), OPENAI_API_KEY_ENV)
    }

    /// Replicate token from config, falling back to `REPLICATE_API_TOKEN`.
    pub fn replicate_api_token(&self) -> Option<String> {
        resolve_with_default_env(self.replicate(), REPLICATE_API_TOKEN_ENV)
    }

    pub fn openai_timeout(&self) -> Duration {
        provider_timeout(self.openai())
    }

    pub fn replicate_timeout(&self) -> Duration {
        provider_timeout(self.replicate())
    }

    pub fn replicate_poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.replicate()
                .and_then(|p| p.poll_interval_ms)
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    pub fn default_model(&self) -> String {
        self.canvas
            .as_ref()
            .map(|c| c.default_model.clone())
            .unwrap_or_else(default_text_model)
    }

    pub fn default_image_model(&self) -> String {
        self.canvas
            .as_ref()
            .map(|c| c.default_image_model.clone())
            .unwrap_or_else(default_image_model)
    }

    pub fn max_prompt_chars(&self) -> usize {
        self.canvas
            .as_ref()
            .map(|c| c.max_prompt_chars)
            .unwrap_or(DEFAULT_MAX_PROMPT_CHARS)
    }

    /// Get a config value by dotted path (e.g. "server.port", "canvas.default_model").
    pub fn get_path(&self, path: &str) -> Option<serde_json::Value> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Validate config, returning (warnings, errors).
    ///
    /// Missing credentials are only warnings: the affected endpoints report
    /// them per request.
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if self.openai_api_key().is_none() {
            warnings.push(format!(
                "OpenAI has no API key configured (set providers.openai.api_key or {OPENAI_API_KEY_ENV})"
            ));
        }
        if self.replicate_api_token().is_none() {
            warnings.push(format!(
                "Replicate has no API token configured (set providers.replicate.api_key or {REPLICATE_API_TOKEN_ENV})"
            ));
        }

        if let Some(server) = &self.server {
            if server.port == 0 {
                errors.push("Server port cannot be 0".to_string());
            }
        }

        if self.max_prompt_chars() == 0 {
            errors.push("canvas.max_prompt_chars must be greater than 0".to_string());
        }

        for (name, provider) in [("openai", self.openai()), ("replicate", self.replicate())] {
            if provider.and_then(|p| p.timeout_secs) == Some(0) {
                errors.push(format!("providers.{name}.timeout_secs must be greater than 0"));
            }
        }

        (warnings, errors)
    }
}

fn resolve_with_default_env(provider: Option<&ProviderConfig>, default_env: &str) -> Option<String> {
    let direct = provider.and_then(|p| p.api_key.clone());
    let env = provider
        .and_then(|p| p.api_key_env.clone())
        .or_else(|| Some(default_env.to_string()));
    resolve_secret_field(&direct, &env)
}

fn provider_timeout(provider: Option<&ProviderConfig>) -> Duration {
    Duration::from_secs(
        provider
            .and_then(|p| p.timeout_secs)
            .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
    )
}

/// Base directory for Canvas Pilot data: `~/.canvas_pilot/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".canvas_pilot")
}
