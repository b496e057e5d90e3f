//! rf-cover daemon.
//!
//! Loads the cover configuration, builds the transmitter and the cover
//! registry, starts the enabled services and runs until Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! rf-cover --config /etc/rf-cover.toml
//! rf-cover --dry-run            # log pulses instead of sending them
//! RUST_LOG=rf_cover=debug rf-cover
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rf_cover::hal::LoggingTransmitter;
use rf_cover::services::CoverRegistry;
use rf_cover::{AnyTransmitter, Config};

/// Time-estimated control for RF/IR driven covers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration
    #[arg(short, long, default_value = "rf-cover.toml")]
    config: PathBuf,

    /// Log pulses instead of sending them
    #[arg(long)]
    dry_run: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if config.covers.is_empty() {
        warn!(path = %args.config.display(), "no covers configured");
    }

    let transmitter = if args.dry_run {
        AnyTransmitter::from(LoggingTransmitter::new())
    } else {
        AnyTransmitter::from_config(&config.transmitter).context("building transmitter")?
    };
    info!(kind = transmitter.kind(), covers = config.covers.len(), "starting");

    let registry = Arc::new(
        CoverRegistry::from_configs(&config.covers, Arc::new(transmitter))
            .context("building covers")?,
    );

    if config.web.enabled {
        start_web(&registry, &config);
    }
    if config.mqtt.enabled {
        start_mqtt(&registry, &config);
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("shutting down");
    registry.shutdown().await;
    Ok(())
}

#[cfg(feature = "web")]
fn start_web(registry: &Arc<CoverRegistry<Arc<AnyTransmitter>>>, config: &Config) {
    use rf_cover::services::{run_server, WebServerConfig};

    let server_config = WebServerConfig::from_config(&config.web);
    let registry = Arc::clone(registry);
    tokio::spawn(async move {
        if let Err(e) = run_server(registry, server_config).await {
            tracing::error!(error = %e, "web server stopped");
        }
    });
}

#[cfg(not(feature = "web"))]
fn start_web(_registry: &Arc<CoverRegistry<Arc<AnyTransmitter>>>, _config: &Config) {
    warn!("web server enabled in config but built without the `web` feature");
}

#[cfg(feature = "mqtt")]
fn start_mqtt(registry: &Arc<CoverRegistry<Arc<AnyTransmitter>>>, config: &Config) {
    use rf_cover::services::MqttBridge;

    let bridge = MqttBridge::new(Arc::clone(registry), config.mqtt.clone());
    tokio::spawn(async move {
        if let Err(e) = bridge.run().await {
            tracing::error!(error = %e, "MQTT bridge stopped");
        }
    });
}

#[cfg(not(feature = "mqtt"))]
fn start_mqtt(_registry: &Arc<CoverRegistry<Arc<AnyTransmitter>>>, _config: &Config) {
    warn!("MQTT bridge enabled in config but built without the `mqtt` feature");
}
