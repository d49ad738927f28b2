use std::sync::Arc;

use clap::Parser;
use serde_json::json;

use rosetta_stable_token::api::{ApiServer, AppState};
use rosetta_stable_token::config::AppConfig;
use rosetta_stable_token::logging::{init_logging, LogContext};
use rosetta_stable_token::{RosettaClient, TokenRegistry};

#[derive(Parser)]
#[command(name = "rosetta-stable-token")]
#[command(about = "Rosetta gateway exposing the Celo stable token as native-looking operations")]
#[command(version)]
struct Args {
    /// Configuration file (defaults to $CONFIG_FILE or ./config.toml)
    #[arg(long)]
    config: Option<String>,

    /// Base URL of the upstream Rosetta core service
    #[arg(long)]
    core_url: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Write a sample configuration to this path and exit
    #[arg(long)]
    generate_config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(path) = &args.generate_config {
        AppConfig::default().save_to_file(path)?;
        println!("Sample configuration written to {}", path);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load_from_file()?,
    };
    config.apply_env_overrides()?;

    if let Some(url) = args.core_url {
        config.upstream.url = url;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    init_logging(&config.logging)?;

    LogContext::new("main", "startup")
        .with_metadata("core_url", json!(config.upstream.url))
        .with_metadata("networks", json!(config.networks.iter().map(|n| &n.network).collect::<Vec<_>>()))
        .with_metadata("token", json!(config.token.symbol))
        .info("Starting stable token Rosetta gateway");

    let registry = Arc::new(TokenRegistry::from_config(&config)?);
    let client = Arc::new(RosettaClient::new(&config.upstream.url, config.upstream.timeout_seconds)?);
    let state = AppState::new(client.clone(), client, registry);

    ApiServer::new(state, &config.server).start().await?;
    Ok(())
}
