//! Core engine for the wallet payload broker.
//!
//! This module provides the main request path: a submitted payload passes
//! the availability gate, picks up a resolved identity token, has its
//! origin policy applied, and is handed to the signing platform. The
//! acknowledgement goes straight back to the caller while the correlation
//! record is written out-of-band; the matching completion callback later
//! consumes that record and promotes the identity mappings it carries.

use broker_config::Config;
use broker_platform::availability::AvailabilityService;
use broker_platform::{PlatformError, PlatformService};
use broker_storage::{IdentityStore, StorageError, StorageService};
use broker_types::{
	CallbackOutcome, CompletionCallback, DeleteAck, OriginPolicy, PayloadAck, PayloadRecord,
	PayloadRequest, SubmitOptions,
};
use std::sync::Arc;
use thiserror::Error;

pub mod builder;
mod correlation;
mod gate;
mod policy;
mod resolver;

pub use builder::{BrokerBuilder, BrokerFactories, BuilderError};
pub use gate::DONATION_SENTINEL;

/// Errors that can occur on the broker's request path.
///
/// Best-effort enrichment steps (identity resolution, the correlation
/// write) never produce these; they log and carry on. Only mandatory
/// gating steps fail a request, and each failure mode stays
/// distinguishable for the route layer.
#[derive(Debug, Error)]
pub enum BrokerError {
	/// The ledger explorer did not pass its health probe. User-facing and
	/// never retried by the broker.
	#[error("Ledger explorer unavailable")]
	ExplorerUnavailable,
	/// No application is registered for the requesting origin.
	#[error("No application registered for origin {0}")]
	UnknownOrigin(String),
	/// A signing-platform call on the mandatory path failed.
	#[error("Platform error: {0}")]
	Platform(#[from] PlatformError),
	/// A storage access on the mandatory path failed.
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// Main broker engine tying the services together.
pub struct BrokerEngine {
	/// Broker configuration.
	config: Config,
	/// Storage service backing the identity store.
	storage: Arc<StorageService>,
	/// Typed identity store.
	identities: Arc<IdentityStore>,
	/// Signing-platform client.
	platform: Arc<PlatformService>,
	/// Ledger-explorer availability probe.
	availability: Arc<AvailabilityService>,
}

impl BrokerEngine {
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		identities: Arc<IdentityStore>,
		platform: Arc<PlatformService>,
		availability: Arc<AvailabilityService>,
	) -> Self {
		Self {
			config,
			storage,
			identities,
			platform,
			availability,
		}
	}

	/// Returns the engine's configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Submits a payload on behalf of an origin.
	///
	/// The acknowledgement is returned as soon as the platform accepts the
	/// payload; the correlation record is written afterwards on a detached
	/// task and its failure never surfaces here.
	pub async fn submit_payload(
		&self,
		mut payload: PayloadRequest,
		origin: &str,
		referer: &str,
		options: Option<SubmitOptions>,
	) -> Result<PayloadAck, BrokerError> {
		let options = options.unwrap_or_default();

		let application_id = self
			.identities
			.app_id_for_origin(origin)
			.await?
			.ok_or_else(|| BrokerError::UnknownOrigin(origin.to_string()))?;

		// The frontend may override the referer taken from the headers
		let referer = options.referer.clone().unwrap_or_else(|| referer.to_string());

		gate::check(&self.availability, &payload).await?;

		// Best-effort enrichment: a token the user already linked makes the
		// request pushable and pre-filled. No token is not an error.
		if payload.user_token.is_none() {
			let transaction_type = payload.txjson.transaction_type.clone();
			payload.user_token = resolver::resolve_user_token(
				&self.identities,
				&self.platform,
				&application_id,
				&options,
				transaction_type.as_deref(),
			)
			.await;
		}

		// The policy rewrite always runs; with no configured policy it
		// still strips unauthorized return URLs.
		let origin_policy = match self.identities.origin_policy(&application_id).await {
			Ok(policy) => policy.unwrap_or_default(),
			Err(e) => {
				tracing::warn!(
					application_id = %application_id,
					error = %e,
					"origin policy lookup failed, applying default policy"
				);
				OriginPolicy::default()
			}
		};
		policy::apply_origin_policy(&origin_policy, origin, &referer, &options, &mut payload);

		tracing::debug!(
			application_id = %application_id,
			tx_type = payload.txjson.transaction_type.as_deref().unwrap_or(""),
			pushable = payload.user_token.is_some(),
			"submitting payload"
		);
		let ack = self.platform.create_payload(&application_id, &payload).await?;

		correlation::schedule_record(
			Arc::clone(&self.identities),
			Arc::clone(&self.platform),
			correlation::Submission {
				origin: origin.to_string(),
				referer,
				frontend_id: options.frontend_id.clone(),
				application_id,
				user_token: payload.user_token.clone(),
				payload_id: ack.uuid.clone(),
				tx_type: payload.txjson.transaction_type.clone(),
			},
		);

		Ok(ack)
	}

	/// Handles a completion callback from the platform.
	pub async fn handle_completion(
		&self,
		callback: &CompletionCallback,
	) -> Result<CallbackOutcome, BrokerError> {
		correlation::consume_completion(&self.identities, &self.platform, callback).await
	}

	/// Fetches a payload record, addressed by the requesting origin.
	pub async fn payload_info(
		&self,
		origin: &str,
		payload_id: &str,
	) -> Result<PayloadRecord, BrokerError> {
		Ok(self.platform.payload_by_origin(origin, payload_id).await?)
	}

	/// Fetches a payload record by custom identifier.
	pub async fn payload_info_by_custom_identifier(
		&self,
		origin: &str,
		identifier: &str,
	) -> Result<PayloadRecord, BrokerError> {
		Ok(self
			.platform
			.payload_by_custom_identifier_for_origin(origin, identifier)
			.await?)
	}

	/// Deletes a payload, addressed by the requesting origin.
	pub async fn delete_payload(
		&self,
		origin: &str,
		payload_id: &str,
	) -> Result<DeleteAck, BrokerError> {
		Ok(self.platform.delete_payload_by_origin(origin, payload_id).await?)
	}

	/// Pings the platform with the credentials of the origin's application.
	pub async fn platform_ping(&self, origin: &str) -> Result<bool, BrokerError> {
		Ok(self.platform.ping_for_origin(origin).await?)
	}

	/// Drops the identity store's read-through caches.
	pub async fn reset_cache(&self) {
		self.identities.reset_cache().await;
	}

	/// Sweeps expired entries from the storage backend.
	pub async fn cleanup_expired(&self) -> Result<usize, BrokerError> {
		Ok(self.storage.cleanup_expired().await?)
	}
}
