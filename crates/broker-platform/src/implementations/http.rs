//! HTTP implementation of the signing-platform client.
//!
//! Talks JSON to the platform's REST API. Every call is authenticated with
//! the application's key/secret pair in the `x-api-key`/`x-api-secret`
//! headers; the key doubles as the application id on the platform side.

use crate::{PlatformError, PlatformInterface};
use async_trait::async_trait;
use broker_types::{
	ApplicationKeys, ConfigSchema, DeleteAck, Field, FieldType, ImplementationRegistry,
	PayloadAck, PayloadRecord, PayloadRequest, Schema, ValidationError,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// HTTP client for the signing platform.
pub struct HttpPlatform {
	client: reqwest::Client,
	api_url: String,
}

impl HttpPlatform {
	/// Creates a new client against the given API base URL.
	pub fn new(api_url: String, timeout: Duration) -> Result<Self, PlatformError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| PlatformError::Network(e.to_string()))?;

		Ok(Self {
			client,
			api_url: api_url.trim_end_matches('/').to_string(),
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.api_url, path)
	}

	async fn execute<T: DeserializeOwned>(
		&self,
		request: reqwest::RequestBuilder,
		keys: &ApplicationKeys,
	) -> Result<T, PlatformError> {
		let response = request
			.header("x-api-key", &keys.api_key)
			.header("x-api-secret", keys.api_secret.expose())
			.send()
			.await
			.map_err(|e| PlatformError::Network(e.to_string()))?;

		let status = response.status();
		if status == reqwest::StatusCode::NOT_FOUND {
			return Err(PlatformError::NotFound(status.to_string()));
		}
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(PlatformError::Api(format!("{}: {}", status, body)));
		}

		response
			.json()
			.await
			.map_err(|e| PlatformError::Api(format!("invalid response body: {}", e)))
	}
}

#[derive(Debug, Deserialize)]
struct PingResponse {
	#[serde(default)]
	pong: bool,
}

#[async_trait]
impl PlatformInterface for HttpPlatform {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpPlatformSchema)
	}

	async fn create_payload(
		&self,
		keys: &ApplicationKeys,
		request: &PayloadRequest,
	) -> Result<PayloadAck, PlatformError> {
		tracing::debug!(url = %self.url("payload"), "creating payload");
		self.execute(self.client.post(self.url("payload")).json(request), keys)
			.await
	}

	async fn get_payload(
		&self,
		keys: &ApplicationKeys,
		payload_id: &str,
	) -> Result<PayloadRecord, PlatformError> {
		self.execute(
			self.client.get(self.url(&format!("payload/{}", payload_id))),
			keys,
		)
		.await
	}

	async fn get_payload_by_custom_identifier(
		&self,
		keys: &ApplicationKeys,
		identifier: &str,
	) -> Result<PayloadRecord, PlatformError> {
		self.execute(
			self.client
				.get(self.url(&format!("payload/ci/{}", identifier))),
			keys,
		)
		.await
	}

	async fn delete_payload(
		&self,
		keys: &ApplicationKeys,
		payload_id: &str,
	) -> Result<DeleteAck, PlatformError> {
		self.execute(
			self.client
				.delete(self.url(&format!("payload/{}", payload_id))),
			keys,
		)
		.await
	}

	async fn ping(&self, keys: &ApplicationKeys) -> Result<bool, PlatformError> {
		let response: PingResponse = self.execute(self.client.get(self.url("ping")), keys).await?;
		Ok(response.pong)
	}
}

/// Configuration schema for the HTTP platform client.
pub struct HttpPlatformSchema;

impl ConfigSchema for HttpPlatformSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("api_url", FieldType::String)],
			vec![Field::new(
				"request_timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Registry entry for the HTTP platform client.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = crate::PlatformFactory;

	fn factory() -> Self::Factory {
		create_platform
	}
}

impl crate::PlatformRegistry for Registry {}

/// Factory function to create an HTTP platform client from configuration.
///
/// Configuration parameters:
/// - `api_url`: Base URL of the platform API (required)
/// - `request_timeout_seconds`: Per-request timeout (default: 30)
pub fn create_platform(
	config: &toml::Value,
) -> Result<Box<dyn PlatformInterface>, PlatformError> {
	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| PlatformError::Api("missing api_url configuration".to_string()))?
		.to_string();

	let timeout = config
		.get("request_timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(HttpPlatform::new(
		api_url,
		Duration::from_secs(timeout),
	)?))
}
