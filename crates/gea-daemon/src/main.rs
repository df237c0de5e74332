//! GEA Portal daemon
//!
//! The daemon provides:
//! - REST API for the GLAB certification workflow
//! - Document and template file storage
//! - Daily reminder scan for license payments and recertifications

use clap::Parser;
use gea_daemon::error::{DaemonError, DaemonResult};
use gea_daemon::{DaemonConfig, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// GEA Portal daemon CLI
#[derive(Parser)]
#[command(name = "gead")]
#[command(about = "GEA Portal daemon - certification workflow service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GEA_CONFIG")]
    config: Option<String>,

    /// Listen address (overrides the configuration file)
    #[arg(short, long, env = "GEA_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (overrides the configuration file)
    #[arg(long, env = "GEA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "GEA_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config =
        DaemonConfig::load(cli.config.as_deref()).map_err(|e| DaemonError::Config(e.to_string()))?;

    // Initialize tracing
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Override with CLI args
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }

    let storage = match &config.storage {
        gea_daemon::config::StorageConfig::Memory => "memory",
        gea_daemon::config::StorageConfig::Postgres { .. } => "postgres",
    };

    // Print startup banner
    println!(
        r#"
   ____ _____    _
  / ___| ____|  / \
 | |  _|  _|   / _ \
 | |_| | |___ / ___ \
  \____|_____/_/   \_\

  GEA Portal - GLAB Certification Workflow
  Version: {}
  Storage: {}
  Listening: {}
"#,
        env!("CARGO_PKG_VERSION"),
        storage,
        config.server.listen_addr
    );

    // Create and run server
    let server = Server::new(config).await?;
    server.run().await
}
