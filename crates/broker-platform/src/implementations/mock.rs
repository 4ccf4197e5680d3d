//! Mock implementation of the signing-platform client.
//!
//! Serves canned records and captures submitted requests so tests can
//! assert on what the broker actually sent. State lives behind an `Arc`,
//! so a clone kept by the test observes calls made through the boxed copy
//! wired into the engine. Registered like any other implementation, which
//! keeps test wiring identical to production wiring.

use crate::{PlatformError, PlatformInterface};
use async_trait::async_trait;
use broker_types::{
	ApplicationKeys, ConfigSchema, DeleteAck, DeleteResult, ImplementationRegistry, PayloadAck,
	PayloadRecord, PayloadRequest, Schema, ValidationError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockState {
	/// Canned payload records, keyed by payload id.
	records: Mutex<HashMap<String, PayloadRecord>>,
	/// Canned records keyed by custom identifier.
	records_by_identifier: Mutex<HashMap<String, PayloadRecord>>,
	/// Acknowledgement returned by create_payload.
	ack: Mutex<PayloadAck>,
	/// Every request submitted through create_payload.
	created: Mutex<Vec<PayloadRequest>>,
	/// When set, every call fails with a network error.
	unreachable: AtomicBool,
}

/// In-memory stand-in for the signing platform.
#[derive(Clone)]
pub struct MockPlatform {
	state: Arc<MockState>,
}

impl MockPlatform {
	pub fn new() -> Self {
		let state = MockState {
			ack: Mutex::new(PayloadAck {
				uuid: "mock-payload-id".to_string(),
				..Default::default()
			}),
			..Default::default()
		};
		Self {
			state: Arc::new(state),
		}
	}

	/// Primes the record returned for a payload id.
	pub fn insert_record(&self, payload_id: &str, record: PayloadRecord) {
		self.state
			.records
			.lock()
			.unwrap()
			.insert(payload_id.to_string(), record);
	}

	/// Primes the record returned for a custom identifier.
	pub fn insert_record_for_identifier(&self, identifier: &str, record: PayloadRecord) {
		self.state
			.records_by_identifier
			.lock()
			.unwrap()
			.insert(identifier.to_string(), record);
	}

	/// Sets the acknowledgement returned by create_payload.
	pub fn set_ack(&self, ack: PayloadAck) {
		*self.state.ack.lock().unwrap() = ack;
	}

	/// Makes every subsequent call fail with a network error.
	pub fn set_unreachable(&self, unreachable: bool) {
		self.state.unreachable.store(unreachable, Ordering::SeqCst);
	}

	/// Returns the requests submitted so far.
	pub fn created(&self) -> Vec<PayloadRequest> {
		self.state.created.lock().unwrap().clone()
	}

	fn check_reachable(&self) -> Result<(), PlatformError> {
		if self.state.unreachable.load(Ordering::SeqCst) {
			Err(PlatformError::Network(
				"mock platform unreachable".to_string(),
			))
		} else {
			Ok(())
		}
	}
}

impl Default for MockPlatform {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl PlatformInterface for MockPlatform {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockPlatformSchema)
	}

	async fn create_payload(
		&self,
		_keys: &ApplicationKeys,
		request: &PayloadRequest,
	) -> Result<PayloadAck, PlatformError> {
		self.check_reachable()?;
		self.state.created.lock().unwrap().push(request.clone());
		Ok(self.state.ack.lock().unwrap().clone())
	}

	async fn get_payload(
		&self,
		_keys: &ApplicationKeys,
		payload_id: &str,
	) -> Result<PayloadRecord, PlatformError> {
		self.check_reachable()?;
		self.state
			.records
			.lock()
			.unwrap()
			.get(payload_id)
			.cloned()
			.ok_or_else(|| PlatformError::NotFound(payload_id.to_string()))
	}

	async fn get_payload_by_custom_identifier(
		&self,
		_keys: &ApplicationKeys,
		identifier: &str,
	) -> Result<PayloadRecord, PlatformError> {
		self.check_reachable()?;
		self.state
			.records_by_identifier
			.lock()
			.unwrap()
			.get(identifier)
			.cloned()
			.ok_or_else(|| PlatformError::NotFound(identifier.to_string()))
	}

	async fn delete_payload(
		&self,
		_keys: &ApplicationKeys,
		payload_id: &str,
	) -> Result<DeleteAck, PlatformError> {
		self.check_reachable()?;
		let cancelled = self
			.state
			.records
			.lock()
			.unwrap()
			.remove(payload_id)
			.is_some();
		Ok(DeleteAck {
			result: DeleteResult {
				cancelled,
				reason: None,
			},
		})
	}

	async fn ping(&self, _keys: &ApplicationKeys) -> Result<bool, PlatformError> {
		self.check_reachable()?;
		Ok(true)
	}
}

/// Configuration schema for the mock platform.
pub struct MockPlatformSchema;

impl ConfigSchema for MockPlatformSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// The mock has no required configuration
		let schema = Schema::new(vec![], vec![]);
		schema.validate(config)
	}
}

/// Registry entry for the mock platform.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = crate::PlatformFactory;

	fn factory() -> Self::Factory {
		create_platform
	}
}

impl crate::PlatformRegistry for Registry {}

/// Factory function to create a mock platform from configuration.
pub fn create_platform(
	_config: &toml::Value,
) -> Result<Box<dyn PlatformInterface>, PlatformError> {
	Ok(Box::new(MockPlatform::new()))
}
