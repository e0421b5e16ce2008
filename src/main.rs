use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use rssify::config::Config;
use rssify::extract::OverrideRegistry;
use rssify::pipeline::Pipeline;
use rssify::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(
    name = "rssify",
    version,
    about = "Turn RSS, Atom, JSON Feed or plain HTML URLs into normalized feed entries"
)]
struct Args {
    /// Path to a TOML config file (missing file means defaults)
    #[arg(long, value_name = "FILE", default_value = "rssify.toml")]
    config: PathBuf,

    /// Address to listen on, overriding the config file and RSSIFY_BIND
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Parse a single URL, print the JSON response and exit
    #[arg(long, value_name = "URL")]
    once: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from '{}'", args.config.display()))?;
    config
        .apply_env()
        .context("Invalid configuration in environment")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let overrides = OverrideRegistry::from_config(&config.sites)
        .context("Invalid site override in config")?;
    tracing::debug!(sites = overrides.len(), "Site overrides loaded");

    let pipeline = Pipeline::new(&config, Arc::new(overrides))
        .context("Failed to initialize parse pipeline")?;

    if let Some(url) = args.once {
        let response = pipeline
            .parse(&url)
            .await
            .with_context(|| format!("Failed to parse {url}"))?;
        let json =
            serde_json::to_string_pretty(&response).context("Failed to serialize response")?;
        println!("{json}");
        return Ok(());
    }

    let state = Arc::new(AppState {
        pipeline,
        ai_enabled: config.ai.enabled,
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;

    server::serve(listener, state)
        .await
        .context("Server error")?;

    Ok(())
}
