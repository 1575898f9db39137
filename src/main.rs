use spg_draft::api_server::{start_server, SERVICE_NAME};
use spg_draft::core::state::AppConfig;

use anyhow::{Context, Result};
use colored::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "spg_draft=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::from_filename(".env").ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    print_banner(&config);

    start_server(config).await
}

fn print_banner(config: &AppConfig) {
    let rule = "=".repeat(50);
    println!("{}", rule);
    println!("{}", SERVICE_NAME.cyan().bold());
    println!("{}", rule);
    println!("LLM API Base URL: {}", config.llm.base_url);
    println!("LLM Model: {}", config.llm.model);
    if config.llm.has_api_key() {
        println!("LLM API Key: {}", "set".green());
    } else {
        println!("LLM API Key: {}", "NOT SET (extraction will fail)".red());
    }
    println!("Listening on: http://{}", config.server.bind_addr());
    println!("{}", rule);
}
