//! Builder pattern for constructing broker engines.
//!
//! Composes a [`BrokerEngine`](crate::BrokerEngine) from pluggable storage,
//! platform and availability implementations using factory functions. Each
//! chosen implementation's configuration table is validated against its
//! declared schema before the engine starts serving.

use crate::BrokerEngine;
use broker_config::Config;
use broker_platform::availability::{AvailabilityFactory, AvailabilityService};
use broker_platform::{PlatformFactory, PlatformService};
use broker_storage::{IdentityStore, StorageFactory, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during broker engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Container for all factory functions needed to build a BrokerEngine.
pub struct BrokerFactories {
	pub storage_factories: HashMap<String, StorageFactory>,
	pub platform_factories: HashMap<String, PlatformFactory>,
	pub availability_factories: HashMap<String, AvailabilityFactory>,
}

/// Builder for constructing a BrokerEngine with pluggable implementations.
pub struct BrokerBuilder {
	config: Config,
}

impl BrokerBuilder {
	/// Creates a new BrokerBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the BrokerEngine using factories for each component type.
	pub fn build(self, factories: BrokerFactories) -> Result<BrokerEngine, BuilderError> {
		// Storage backend
		let storage_name = &self.config.storage.primary;
		let storage_config = self
			.config
			.storage
			.implementations
			.get(storage_name)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"No configuration table for storage implementation '{}'",
					storage_name
				))
			})?;
		let storage_factory = factories.storage_factories.get(storage_name).ok_or_else(|| {
			BuilderError::Config(format!("Unknown storage implementation '{}'", storage_name))
		})?;
		let storage_backend = storage_factory(storage_config).map_err(|e| {
			BuilderError::Config(format!(
				"Failed to create storage implementation '{}': {}",
				storage_name, e
			))
		})?;
		storage_backend
			.config_schema()
			.validate(storage_config)
			.map_err(|e| {
				BuilderError::Config(format!(
					"Invalid configuration for storage implementation '{}': {}",
					storage_name, e
				))
			})?;
		tracing::info!(component = "storage", implementation = %storage_name, "Loaded");

		let storage = Arc::new(StorageService::new(storage_backend));
		let identities = Arc::new(IdentityStore::new(Arc::clone(&storage)));

		// Signing-platform client
		let platform_name = &self.config.platform.primary;
		let platform_config = self
			.config
			.platform
			.implementations
			.get(platform_name)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"No configuration table for platform implementation '{}'",
					platform_name
				))
			})?;
		let platform_factory =
			factories.platform_factories.get(platform_name).ok_or_else(|| {
				BuilderError::Config(format!(
					"Unknown platform implementation '{}'",
					platform_name
				))
			})?;
		let platform_impl = platform_factory(platform_config).map_err(|e| {
			BuilderError::Config(format!(
				"Failed to create platform implementation '{}': {}",
				platform_name, e
			))
		})?;
		platform_impl
			.config_schema()
			.validate(platform_config)
			.map_err(|e| {
				BuilderError::Config(format!(
					"Invalid configuration for platform implementation '{}': {}",
					platform_name, e
				))
			})?;
		tracing::info!(component = "platform", implementation = %platform_name, "Loaded");

		let platform = Arc::new(PlatformService::new(platform_impl, Arc::clone(&identities)));

		// Availability probe
		let probe_name = &self.config.availability.primary;
		let probe_config = self
			.config
			.availability
			.implementations
			.get(probe_name)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"No configuration table for availability implementation '{}'",
					probe_name
				))
			})?;
		let probe_factory = factories
			.availability_factories
			.get(probe_name)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Unknown availability implementation '{}'",
					probe_name
				))
			})?;
		let probe = probe_factory(probe_config).map_err(|e| {
			BuilderError::Config(format!(
				"Failed to create availability implementation '{}': {}",
				probe_name, e
			))
		})?;
		probe.config_schema().validate(probe_config).map_err(|e| {
			BuilderError::Config(format!(
				"Invalid configuration for availability implementation '{}': {}",
				probe_name, e
			))
		})?;
		tracing::info!(component = "availability", implementation = %probe_name, "Loaded");

		let availability = Arc::new(AvailabilityService::new(probe));

		Ok(BrokerEngine::new(
			self.config,
			storage,
			identities,
			platform,
			availability,
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn factories() -> BrokerFactories {
		let mut storage_factories: HashMap<String, StorageFactory> = HashMap::new();
		for (name, factory) in broker_storage::get_all_implementations() {
			storage_factories.insert(name.to_string(), factory);
		}

		let mut platform_factories: HashMap<String, PlatformFactory> = HashMap::new();
		for (name, factory) in broker_platform::get_all_implementations() {
			platform_factories.insert(name.to_string(), factory);
		}

		let mut availability_factories: HashMap<String, AvailabilityFactory> = HashMap::new();
		for (name, factory) in broker_platform::availability::get_all_implementations() {
			availability_factories.insert(name.to_string(), factory);
		}

		BrokerFactories {
			storage_factories,
			platform_factories,
			availability_factories,
		}
	}

	fn config(platform_primary: &str) -> Config {
		let toml = format!(
			r#"
[broker]
id = "test-broker"

[storage]
primary = "memory"
[storage.implementations.memory]

[platform]
primary = "{}"
[platform.implementations.mock]
[platform.implementations.http]
api_url = "https://platform.example/api/v1"

[availability]
primary = "mock"
[availability.implementations.mock]
"#,
			platform_primary
		);
		toml.parse().unwrap()
	}

	#[tokio::test]
	async fn test_build_with_mock_implementations() {
		let engine = BrokerBuilder::new(config("mock")).build(factories()).unwrap();
		assert_eq!(engine.config().broker.id, "test-broker");
	}

	#[tokio::test]
	async fn test_build_with_http_platform() {
		let engine = BrokerBuilder::new(config("http")).build(factories()).unwrap();
		assert_eq!(engine.config().platform.primary, "http");
	}

	#[tokio::test]
	async fn test_unknown_implementation_fails() {
		let mut config = config("mock");
		config.storage.primary = "redis".to_string();
		config
			.storage
			.implementations
			.insert("redis".to_string(), toml::Value::Table(toml::map::Map::new()));

		let result = BrokerBuilder::new(config).build(factories());
		assert!(matches!(result, Err(BuilderError::Config(_))));
	}

	#[tokio::test]
	async fn test_invalid_platform_config_fails() {
		let toml = r#"
[broker]
id = "test-broker"

[storage]
primary = "memory"
[storage.implementations.memory]

[platform]
primary = "http"
[platform.implementations.http]
# api_url missing

[availability]
primary = "mock"
[availability.implementations.mock]
"#;
		let config: Config = toml.parse().unwrap();
		let result = BrokerBuilder::new(config).build(factories());
		assert!(matches!(result, Err(BuilderError::Config(_))));
	}
}
