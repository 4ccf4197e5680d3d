//! Main entry point for the broker service.
//!
//! This binary wires the pluggable implementations into a broker engine
//! and serves the HTTP API: payload submission enriched with per-origin
//! policy and resolved identity tokens, plus the completion-callback hook
//! that promotes identity mappings once requests resolve.

use broker_config::{ApiConfig, Config};
use broker_core::{BrokerBuilder, BrokerEngine, BrokerFactories};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod apis;
mod server;

/// Command-line arguments for the broker service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the broker service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the broker engine with all implementations
/// 5. Serves the API until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started broker");

	// Load configuration
	let config_path = args
		.config
		.to_str()
		.ok_or("configuration path is not valid UTF-8")?;
	let config = Config::from_file_async(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.broker.id);

	let api_config = config.api.clone().unwrap_or(ApiConfig {
		enabled: true,
		host: "127.0.0.1".to_string(),
		port: 8080,
		reset_cache_token: None,
	});
	let cleanup_interval = Duration::from_secs(config.storage.cleanup_interval_seconds.max(1));

	// Build broker engine with implementations
	let engine = Arc::new(build_broker(config)?);

	// Sweep expired correlation records in the background
	let cleanup_engine = Arc::clone(&engine);
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(cleanup_interval);
		ticker.tick().await; // the first tick fires immediately
		loop {
			ticker.tick().await;
			match cleanup_engine.cleanup_expired().await {
				Ok(0) => {}
				Ok(removed) => tracing::debug!(removed, "removed expired storage entries"),
				Err(e) => tracing::warn!(error = %e, "storage cleanup failed"),
			}
		}
	});

	if api_config.enabled {
		tokio::select! {
			result = server::start_server(api_config, Arc::clone(&engine)) => {
				tracing::info!("API server finished");
				result?;
			}
			_ = tokio::signal::ctrl_c() => {}
		}
	} else {
		tracing::warn!("API server disabled, running storage maintenance only");
		tokio::signal::ctrl_c().await?;
	}

	tracing::info!("Stopped broker");
	Ok(())
}

/// Builds the broker engine with all registered implementations.
fn build_broker(config: Config) -> Result<BrokerEngine, Box<dyn std::error::Error>> {
	let mut storage_factories = HashMap::new();
	for (name, factory) in broker_storage::get_all_implementations() {
		storage_factories.insert(name.to_string(), factory);
	}

	let mut platform_factories = HashMap::new();
	for (name, factory) in broker_platform::get_all_implementations() {
		platform_factories.insert(name.to_string(), factory);
	}

	let mut availability_factories = HashMap::new();
	for (name, factory) in broker_platform::availability::get_all_implementations() {
		availability_factories.insert(name.to_string(), factory);
	}

	let factories = BrokerFactories {
		storage_factories,
		platform_factories,
		availability_factories,
	};

	Ok(BrokerBuilder::new(config).build(factories)?)
}
