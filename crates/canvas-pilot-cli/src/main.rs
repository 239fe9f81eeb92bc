use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;

use canvas_pilot_core::config::Config;
use canvas_pilot_gateway::GatewayState;
use canvas_pilot_providers::normalize::normalize_text;

mod logging;

#[derive(Parser)]
#[command(
    name = "canvas-pilot",
    about = "Gateway that turns natural-language prompts into canvas drawing commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to listen on (default: 8787)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (default: 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Normalize raw model output into canvas commands
    Normalize {
        /// File to read (omit to read stdin)
        file: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show system status
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get a specific config value
    Get { key: String },
    /// Check the configuration for problems
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::config_path);
    let config = Config::load(&config_path)?;

    logging::init(&config.logging.clone().unwrap_or_default(), cli.verbose)?;

    match cli.command {
        Commands::Serve { port, bind } => {
            let (warnings, errors) = config.validate();
            for warning in &warnings {
                tracing::warn!("{warning}");
            }
            if !errors.is_empty() {
                anyhow::bail!("Invalid configuration: {}", errors.join("; "));
            }

            let port = port.unwrap_or_else(|| config.server_port());
            let bind = bind.unwrap_or_else(|| config.server_bind());
            tracing::info!("Starting Canvas Pilot gateway on {bind}:{port}");

            let client = reqwest::Client::builder().build()?;
            let state = GatewayState::from_config(Arc::new(config), client);
            #[cfg(feature = "metrics")]
            let state = state.with_metrics(canvas_pilot_gateway::metrics::install_prometheus_recorder()?);

            canvas_pilot_gateway::start_gateway(Arc::new(state), &bind, port).await?;
        }
        Commands::Normalize { file } => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(&path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let normalized = normalize_text(&raw);
            let output = json!({
                "strategy": normalized.strategy.as_str(),
                "commands": normalized.commands,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Status => {
            let port = config.server_port();
            println!("Canvas Pilot v{}", env!("CARGO_PKG_VERSION"));
            println!("Config: {}", config_path.display());
            println!("Gateway: {}:{port}", config.server_bind());
            println!("Default model: {}", config.default_model());
            println!("Default image model: {}", config.default_image_model());
            println!("OpenAI key: {}", configured(config.openai_api_key().is_some()));
            println!(
                "Replicate token: {}",
                configured(config.replicate_api_token().is_some())
            );
            println!("Status: {}", probe_gateway(port).await);
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Get { key } => match config.get_path(&key) {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => anyhow::bail!("No config value at '{key}'"),
            },
            ConfigAction::Validate => {
                let (warnings, errors) = config.validate();
                for warning in &warnings {
                    println!("warning: {warning}");
                }
                for error in &errors {
                    println!("error: {error}");
                }
                if !errors.is_empty() {
                    anyhow::bail!("{} configuration error(s)", errors.len());
                }
                println!("Config OK");
            }
        },
    }

    Ok(())
}

fn configured(present: bool) -> &'static str {
    if present { "configured" } else { "missing" }
}

/// Check whether a gateway answers `/health` on the local port.
async fn probe_gateway(port: u16) -> String {
    let url = format!("http://127.0.0.1:{port}/health");
    let response = reqwest::Client::new()
        .get(&url)
        .timeout(Duration::from_secs(2))
        .send()
        .await;
    match response {
        Ok(resp) if resp.status().is_success() => {
            let version = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body["version"].as_str().map(String::from))
                .unwrap_or_else(|| "unknown".into());
            format!("running (v{version})")
        }
        _ => "not running".into(),
    }
}
