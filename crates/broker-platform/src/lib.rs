//! Signing-platform client module for the wallet payload broker.
//!
//! This module wraps the external signing platform's HTTP API: creating
//! payloads, fetching their records, and deleting them. The raw
//! [`PlatformInterface`] takes explicit credentials per call; the
//! [`PlatformService`] on top resolves each application's key/secret pair
//! from the identity store, so a missing registration surfaces as a
//! configuration error before any network traffic happens.

use async_trait::async_trait;
use broker_storage::IdentityStore;
use broker_types::{
	ApplicationKeys, ConfigSchema, DeleteAck, ImplementationRegistry, PayloadAck, PayloadRecord,
	PayloadRequest,
};
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod mock;
}

pub mod availability;

/// Errors that can occur when talking to the signing platform.
#[derive(Debug, Error)]
pub enum PlatformError {
	/// Network-level failure reaching the platform.
	#[error("Network error: {0}")]
	Network(String),
	/// The platform answered with a non-success status.
	#[error("Platform rejected the request: {0}")]
	Api(String),
	/// The requested payload does not exist.
	#[error("Payload not found: {0}")]
	NotFound(String),
	/// No key/secret pair is registered for the application. This is a
	/// configuration problem, not a transient failure; callers must not
	/// retry.
	#[error("No API credentials registered for application {0}")]
	MissingCredentials(String),
	/// No application is registered for the requesting origin.
	#[error("No application registered for origin {0}")]
	UnknownOrigin(String),
	/// The identity store failed while resolving credentials.
	#[error("Storage error: {0}")]
	Storage(String),
}

/// Trait defining the interface to the signing platform.
///
/// Credentials are passed explicitly so implementations stay stateless;
/// resolving them is the [`PlatformService`]'s job.
#[async_trait]
pub trait PlatformInterface: Send + Sync {
	/// Returns the configuration schema for this platform implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Submits a payload request; returns the platform's acknowledgement.
	async fn create_payload(
		&self,
		keys: &ApplicationKeys,
		request: &PayloadRequest,
	) -> Result<PayloadAck, PlatformError>;

	/// Fetches the full record of a payload by id.
	async fn get_payload(
		&self,
		keys: &ApplicationKeys,
		payload_id: &str,
	) -> Result<PayloadRecord, PlatformError>;

	/// Fetches the full record of a payload by its custom identifier.
	async fn get_payload_by_custom_identifier(
		&self,
		keys: &ApplicationKeys,
		identifier: &str,
	) -> Result<PayloadRecord, PlatformError>;

	/// Deletes (cancels) a payload by id.
	async fn delete_payload(
		&self,
		keys: &ApplicationKeys,
		payload_id: &str,
	) -> Result<DeleteAck, PlatformError>;

	/// Platform reachability check with the given credentials.
	async fn ping(&self, keys: &ApplicationKeys) -> Result<bool, PlatformError>;
}

/// Type alias for platform factory functions.
pub type PlatformFactory = fn(&toml::Value) -> Result<Box<dyn PlatformInterface>, PlatformError>;

/// Registry trait for platform implementations.
pub trait PlatformRegistry: ImplementationRegistry<Factory = PlatformFactory> {}

/// Get all registered platform implementations.
pub fn get_all_implementations() -> Vec<(&'static str, PlatformFactory)> {
	use implementations::{http, mock};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(mock::Registry::NAME, mock::Registry::factory()),
	]
}

/// Service that manages platform calls for registered applications.
///
/// Resolves each application's credentials once per call from the identity
/// store and delegates to the underlying implementation.
pub struct PlatformService {
	/// The underlying platform implementation.
	implementation: Box<dyn PlatformInterface>,
	/// Identity store used to resolve application credentials.
	identities: Arc<IdentityStore>,
}

impl PlatformService {
	/// Creates a new PlatformService with the specified implementation.
	pub fn new(implementation: Box<dyn PlatformInterface>, identities: Arc<IdentityStore>) -> Self {
		Self {
			implementation,
			identities,
		}
	}

	/// Resolves the key/secret pair for an application.
	///
	/// A missing pair short-circuits with [`PlatformError::MissingCredentials`];
	/// nothing is sent to the platform in that case.
	async fn keys_for(&self, application_id: &str) -> Result<ApplicationKeys, PlatformError> {
		match self.identities.secret_for_app_id(application_id).await {
			Ok(Some(keys)) => Ok(keys),
			Ok(None) => {
				tracing::warn!(
					application_id = %application_id,
					"no API credentials registered for application"
				);
				Err(PlatformError::MissingCredentials(application_id.to_string()))
			}
			Err(e) => Err(PlatformError::Storage(e.to_string())),
		}
	}

	/// Resolves the application registered for an origin.
	async fn app_id_for_origin(&self, origin: &str) -> Result<String, PlatformError> {
		match self.identities.app_id_for_origin(origin).await {
			Ok(Some(app_id)) => Ok(app_id),
			Ok(None) => Err(PlatformError::UnknownOrigin(origin.to_string())),
			Err(e) => Err(PlatformError::Storage(e.to_string())),
		}
	}

	/// Submits a payload on behalf of an application.
	pub async fn create_payload(
		&self,
		application_id: &str,
		request: &PayloadRequest,
	) -> Result<PayloadAck, PlatformError> {
		let keys = self.keys_for(application_id).await?;
		self.implementation.create_payload(&keys, request).await
	}

	/// Fetches a payload record on behalf of an application.
	pub async fn payload_info(
		&self,
		application_id: &str,
		payload_id: &str,
	) -> Result<PayloadRecord, PlatformError> {
		let keys = self.keys_for(application_id).await?;
		self.implementation.get_payload(&keys, payload_id).await
	}

	/// Fetches a payload record by custom identifier.
	pub async fn payload_info_by_custom_identifier(
		&self,
		application_id: &str,
		identifier: &str,
	) -> Result<PayloadRecord, PlatformError> {
		let keys = self.keys_for(application_id).await?;
		self.implementation
			.get_payload_by_custom_identifier(&keys, identifier)
			.await
	}

	/// Deletes a payload on behalf of an application.
	pub async fn delete_payload(
		&self,
		application_id: &str,
		payload_id: &str,
	) -> Result<DeleteAck, PlatformError> {
		let keys = self.keys_for(application_id).await?;
		self.implementation.delete_payload(&keys, payload_id).await
	}

	/// Pings the platform with an application's credentials.
	pub async fn ping(&self, application_id: &str) -> Result<bool, PlatformError> {
		let keys = self.keys_for(application_id).await?;
		self.implementation.ping(&keys).await
	}

	/// Fetches a payload record addressed by the requesting origin.
	pub async fn payload_by_origin(
		&self,
		origin: &str,
		payload_id: &str,
	) -> Result<PayloadRecord, PlatformError> {
		let application_id = self.app_id_for_origin(origin).await?;
		self.payload_info(&application_id, payload_id).await
	}

	/// Fetches a payload record by custom identifier, addressed by origin.
	pub async fn payload_by_custom_identifier_for_origin(
		&self,
		origin: &str,
		identifier: &str,
	) -> Result<PayloadRecord, PlatformError> {
		let application_id = self.app_id_for_origin(origin).await?;
		self.payload_info_by_custom_identifier(&application_id, identifier)
			.await
	}

	/// Deletes a payload addressed by the requesting origin.
	pub async fn delete_payload_by_origin(
		&self,
		origin: &str,
		payload_id: &str,
	) -> Result<DeleteAck, PlatformError> {
		let application_id = self.app_id_for_origin(origin).await?;
		self.delete_payload(&application_id, payload_id).await
	}

	/// Pings the platform with the credentials of the origin's application.
	pub async fn ping_for_origin(&self, origin: &str) -> Result<bool, PlatformError> {
		let application_id = self.app_id_for_origin(origin).await?;
		self.ping(&application_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::mock::MockPlatform;
	use broker_storage::{implementations::memory::MemoryStorage, StorageService};

	fn service_with(identities: Arc<IdentityStore>) -> PlatformService {
		PlatformService::new(Box::new(MockPlatform::new()), identities)
	}

	fn identities() -> Arc<IdentityStore> {
		Arc::new(IdentityStore::new(Arc::new(StorageService::new(
			Box::new(MemoryStorage::new()),
		))))
	}

	#[tokio::test]
	async fn test_missing_credentials_short_circuit() {
		let service = service_with(identities());

		let result = service
			.create_payload("unregistered-app", &PayloadRequest::default())
			.await;
		assert!(matches!(result, Err(PlatformError::MissingCredentials(_))));
	}

	#[tokio::test]
	async fn test_unknown_origin() {
		let service = service_with(identities());

		let result = service
			.payload_by_origin("https://unknown.example", "p1")
			.await;
		assert!(matches!(result, Err(PlatformError::UnknownOrigin(_))));
	}

	#[tokio::test]
	async fn test_create_with_registered_application() {
		let identities = identities();
		identities
			.register_application(
				"https://shop.example",
				"app-1",
				&ApplicationKeys::new("app-1", "secret-1"),
			)
			.await
			.unwrap();

		let service = service_with(identities);
		let ack = service
			.create_payload("app-1", &PayloadRequest::default())
			.await
			.unwrap();
		assert!(!ack.uuid.is_empty());
	}
}
