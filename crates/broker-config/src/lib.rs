//! Configuration module for the wallet payload broker.
//!
//! This module provides structures and utilities for managing broker
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required values are properly set.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files for better organization:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// File I/O failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// TOML parsing failed.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Configuration validation failed.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the broker.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to the broker instance.
	pub broker: BrokerSettings,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the signing-platform client.
	pub platform: PlatformConfig,
	/// Configuration for the ledger-explorer availability probe.
	pub availability: AvailabilityConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the broker instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerSettings {
	/// Unique identifier for this broker instance.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds for cleaning up expired storage entries.
	#[serde(default = "default_cleanup_interval_seconds")]
	pub cleanup_interval_seconds: u64,
}

/// Returns the default cleanup interval in seconds.
fn default_cleanup_interval_seconds() -> u64 {
	300
}

/// Configuration for the signing-platform client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of platform implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the availability probe.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AvailabilityConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of probe implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Token guarding the cache-reset endpoint; unset disables it.
	#[serde(default)]
	pub reset_cache_token: Option<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8080
}

impl Config {
	/// Loads configuration from a TOML file, following includes.
	pub fn from_file(path: &str) -> Result<Self, ConfigError> {
		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
			.map_err(|e| ConfigError::Parse(e.to_string()))?;
		runtime.block_on(Self::from_file_async(path))
	}

	/// Async variant of [`Config::from_file`].
	pub async fn from_file_async(path: &str) -> Result<Self, ConfigError> {
		let base_path = std::path::Path::new(path)
			.parent()
			.map(|p| p.to_path_buf())
			.unwrap_or_else(|| std::path::PathBuf::from("."));

		let mut loader = loader::ConfigLoader::new(base_path);
		let config = loader.load_config(path).await?;
		config.validate()?;
		Ok(config)
	}

	/// Validates cross-field constraints the type system cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.broker.id.is_empty() {
			return Err(ConfigError::Validation("broker.id must not be empty".into()));
		}

		for (section, primary, implementations) in [
			(
				"storage",
				&self.storage.primary,
				&self.storage.implementations,
			),
			(
				"platform",
				&self.platform.primary,
				&self.platform.implementations,
			),
			(
				"availability",
				&self.availability.primary,
				&self.availability.implementations,
			),
		] {
			if !implementations.contains_key(primary) {
				return Err(ConfigError::Validation(format!(
					"{}.primary '{}' has no matching [{}.implementations.{}] table",
					section, primary, section, primary
				)));
			}
		}

		Ok(())
	}
}

/// Resolves `${VAR}` and `${VAR:-default}` references against the
/// process environment.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	// Bound the input so a hostile config cannot stall the regex scan
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).expect("capture 0 always present");
		let var_name = cap.get(1).expect("var name group").as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)))
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(*start..*end, value);
	}

	Ok(result)
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL_CONFIG: &str = r#"
[broker]
id = "test-broker"

[storage]
primary = "memory"
[storage.implementations.memory]

[platform]
primary = "mock"
[platform.implementations.mock]

[availability]
primary = "mock"
[availability.implementations.mock]
"#;

	#[test]
	fn test_minimal_config_parses() {
		let config: Config = MINIMAL_CONFIG.parse().unwrap();
		assert_eq!(config.broker.id, "test-broker");
		assert_eq!(config.storage.primary, "memory");
		assert_eq!(config.storage.cleanup_interval_seconds, 300);
		assert!(config.api.is_none());
	}

	#[test]
	fn test_primary_without_implementation_is_rejected() {
		let config = r#"
[broker]
id = "test-broker"

[storage]
primary = "file"
[storage.implementations.memory]

[platform]
primary = "mock"
[platform.implementations.mock]

[availability]
primary = "mock"
[availability.implementations.mock]
"#;
		let result: Result<Config, _> = config.parse();
		assert!(result.is_err());
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("BROKER_TEST_ID", "from-env");

		let input = "id = \"${BROKER_TEST_ID}\"";
		let resolved = resolve_env_vars(input).unwrap();
		assert_eq!(resolved, "id = \"from-env\"");
	}

	#[test]
	fn test_env_var_default_value() {
		let input = "url = \"${BROKER_TEST_UNSET_URL:-https://platform.example}\"";
		let resolved = resolve_env_vars(input).unwrap();
		assert_eq!(resolved, "url = \"https://platform.example\"");
	}

	#[test]
	fn test_missing_env_var_without_default() {
		let input = "id = \"${BROKER_TEST_DEFINITELY_UNSET}\"";
		assert!(resolve_env_vars(input).is_err());
	}
}
