//! Ledger-explorer availability probing.
//!
//! Payment payloads depend on the ledger explorer being reachable for the
//! later on-ledger verification step, so the broker health-checks it
//! before submitting them. The probe is a single synchronous check per
//! qualifying submission: no caching, no backoff.

use async_trait::async_trait;
use broker_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Errors a probe can produce.
#[derive(Debug, Error)]
pub enum AvailabilityError {
	/// The explorer could not be reached at all.
	#[error("Network error: {0}")]
	Network(String),
	/// The explorer answered with a non-success status.
	#[error("Explorer responded with status {0}")]
	Status(u16),
}

/// Trait defining the interface for availability probes.
#[async_trait]
pub trait AvailabilityInterface: Send + Sync {
	/// Returns the configuration schema for this probe implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Performs one health check against the explorer.
	async fn probe(&self) -> Result<(), AvailabilityError>;
}

/// Type alias for availability factory functions.
pub type AvailabilityFactory =
	fn(&toml::Value) -> Result<Box<dyn AvailabilityInterface>, AvailabilityError>;

/// Registry trait for availability implementations.
pub trait AvailabilityRegistry: ImplementationRegistry<Factory = AvailabilityFactory> {}

/// Get all registered availability implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AvailabilityFactory)> {
	vec![
		(HttpProbeRegistry::NAME, HttpProbeRegistry::factory()),
		(MockProbeRegistry::NAME, MockProbeRegistry::factory()),
	]
}

/// Service wrapper around the configured probe.
pub struct AvailabilityService {
	implementation: Box<dyn AvailabilityInterface>,
}

impl AvailabilityService {
	pub fn new(implementation: Box<dyn AvailabilityInterface>) -> Self {
		Self { implementation }
	}

	/// Delegates to the underlying probe.
	pub async fn probe(&self) -> Result<(), AvailabilityError> {
		self.implementation.probe().await
	}
}

/// HTTP probe against the explorer's status endpoint.
pub struct HttpProbe {
	client: reqwest::Client,
	status_url: String,
	api_token: Option<String>,
}

impl HttpProbe {
	pub fn new(
		status_url: String,
		api_token: Option<String>,
		timeout: Duration,
	) -> Result<Self, AvailabilityError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| AvailabilityError::Network(e.to_string()))?;

		Ok(Self {
			client,
			status_url,
			api_token,
		})
	}
}

#[async_trait]
impl AvailabilityInterface for HttpProbe {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpProbeSchema)
	}

	async fn probe(&self) -> Result<(), AvailabilityError> {
		let mut request = self.client.get(&self.status_url);
		if let Some(token) = &self.api_token {
			request = request.header("x-api-token", token);
		}

		let response = request
			.send()
			.await
			.map_err(|e| AvailabilityError::Network(e.to_string()))?;

		if response.status().is_success() {
			Ok(())
		} else {
			Err(AvailabilityError::Status(response.status().as_u16()))
		}
	}
}

/// Configuration schema for the HTTP probe.
pub struct HttpProbeSchema;

impl ConfigSchema for HttpProbeSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("status_url", FieldType::String)],
			vec![
				Field::new("api_token", FieldType::String),
				Field::new(
					"request_timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Registry entry for the HTTP probe.
pub struct HttpProbeRegistry;

impl ImplementationRegistry for HttpProbeRegistry {
	const NAME: &'static str = "http";
	type Factory = AvailabilityFactory;

	fn factory() -> Self::Factory {
		create_http_probe
	}
}

impl AvailabilityRegistry for HttpProbeRegistry {}

/// Factory function to create an HTTP probe from configuration.
///
/// Configuration parameters:
/// - `status_url`: Explorer status endpoint to probe (required)
/// - `api_token`: Token sent in the `x-api-token` header (optional)
/// - `request_timeout_seconds`: Probe timeout (default: 10)
pub fn create_http_probe(
	config: &toml::Value,
) -> Result<Box<dyn AvailabilityInterface>, AvailabilityError> {
	let status_url = config
		.get("status_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AvailabilityError::Network("missing status_url configuration".to_string()))?
		.to_string();

	let api_token = config
		.get("api_token")
		.and_then(|v| v.as_str())
		.map(str::to_string);

	let timeout = config
		.get("request_timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(HttpProbe::new(
		status_url,
		api_token,
		Duration::from_secs(timeout),
	)?))
}

/// Probe stand-in for tests: available or not, and counts probes. State
/// sits behind an `Arc` so a clone kept by the test observes probes made
/// through the boxed copy wired into the service.
#[derive(Clone)]
pub struct MockProbe {
	state: Arc<MockProbeState>,
}

struct MockProbeState {
	available: AtomicBool,
	probes: AtomicUsize,
}

impl MockProbe {
	pub fn new(available: bool) -> Self {
		Self {
			state: Arc::new(MockProbeState {
				available: AtomicBool::new(available),
				probes: AtomicUsize::new(0),
			}),
		}
	}

	pub fn set_available(&self, available: bool) {
		self.state.available.store(available, Ordering::SeqCst);
	}

	/// Number of probes performed so far.
	pub fn probe_count(&self) -> usize {
		self.state.probes.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl AvailabilityInterface for MockProbe {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockProbeSchema)
	}

	async fn probe(&self) -> Result<(), AvailabilityError> {
		self.state.probes.fetch_add(1, Ordering::SeqCst);
		if self.state.available.load(Ordering::SeqCst) {
			Ok(())
		} else {
			Err(AvailabilityError::Status(503))
		}
	}
}

/// Configuration schema for the mock probe.
pub struct MockProbeSchema;

impl ConfigSchema for MockProbeSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![], vec![Field::new("available", FieldType::Boolean)]);
		schema.validate(config)
	}
}

/// Registry entry for the mock probe.
pub struct MockProbeRegistry;

impl ImplementationRegistry for MockProbeRegistry {
	const NAME: &'static str = "mock";
	type Factory = AvailabilityFactory;

	fn factory() -> Self::Factory {
		create_mock_probe
	}
}

impl AvailabilityRegistry for MockProbeRegistry {}

/// Factory function to create a mock probe from configuration.
///
/// Configuration parameters:
/// - `available`: Whether the probe reports success (default: true)
pub fn create_mock_probe(
	config: &toml::Value,
) -> Result<Box<dyn AvailabilityInterface>, AvailabilityError> {
	let available = config
		.get("available")
		.and_then(|v| v.as_bool())
		.unwrap_or(true);

	Ok(Box::new(MockProbe::new(available)))
}
