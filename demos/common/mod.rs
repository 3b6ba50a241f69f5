//! Setup shared by the demo applications.
#![allow(dead_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use diatheke_utils::config::DemoConfig;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Path to the config file
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Reads the config file and installs logging.
pub fn init() -> Result<DemoConfig> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = DemoConfig::from_file(&cli.config)
        .with_context(|| format!("error reading config file {}", cli.config.display()))?;

    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    Ok(config)
}

/// Client settings from the demo config.
pub fn client_config(config: &DemoConfig) -> Result<diatheke::Config> {
    let mut builder = diatheke::Config::builder()
        .with_address(&config.server.address)
        .with_insecure(config.server.insecure);
    if !config.server.protocol.is_empty() {
        builder = builder.with_protocol(config.server.protocol.parse()?);
    }
    if let Some(timeout_ms) = config.server.timeout_ms {
        builder = builder.with_request_timeout_ms(timeout_ms);
    }
    Ok(builder.build())
}

pub fn banner(name: &str, config: &DemoConfig) {
    println!("\nDiatheke {} Demo", name);
    println!("Connected to {}\n", config.server.address);
}
