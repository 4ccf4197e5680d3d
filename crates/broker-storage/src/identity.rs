//! Typed identity-store facade over the storage service.
//!
//! The engine never touches raw storage keys; every lookup and mutation it
//! needs goes through this facade. Application registrations, API keys and
//! origin policies are effectively immutable at request time, so those
//! three lookups are cached read-through and only dropped by
//! [`IdentityStore::reset_cache`].

use crate::{StorageError, StorageService};
use broker_types::{ApplicationKeys, CorrelationRecord, OriginPolicy, PayloadKind, StorageKey};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Domain-keyed view of the broker's persistent state.
pub struct IdentityStore {
	storage: Arc<StorageService>,
	/// origin → application id
	app_ids: RwLock<HashMap<String, String>>,
	/// application id → API keys
	keys: RwLock<HashMap<String, ApplicationKeys>>,
	/// application id → origin policy
	policies: RwLock<HashMap<String, OriginPolicy>>,
}

impl IdentityStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			app_ids: RwLock::new(HashMap::new()),
			keys: RwLock::new(HashMap::new()),
			policies: RwLock::new(HashMap::new()),
		}
	}

	/// Drops all cached application data. The next lookup of each entry
	/// goes back to the backend.
	pub async fn reset_cache(&self) {
		self.app_ids.write().await.clear();
		self.keys.write().await.clear();
		self.policies.write().await.clear();
		tracing::debug!("identity store cache reset");
	}

	/// Resolves the application registered for an origin, if any.
	pub async fn app_id_for_origin(&self, origin: &str) -> Result<Option<String>, StorageError> {
		if let Some(app_id) = self.app_ids.read().await.get(origin) {
			return Ok(Some(app_id.clone()));
		}

		let app_id: Option<String> = self
			.storage
			.retrieve_optional(StorageKey::Applications.as_str(), origin)
			.await?;

		if let Some(app_id) = &app_id {
			self.app_ids
				.write()
				.await
				.insert(origin.to_string(), app_id.clone());
		}
		Ok(app_id)
	}

	/// Returns the API key/secret pair for an application, if registered.
	pub async fn secret_for_app_id(
		&self,
		application_id: &str,
	) -> Result<Option<ApplicationKeys>, StorageError> {
		if let Some(keys) = self.keys.read().await.get(application_id) {
			return Ok(Some(keys.clone()));
		}

		let keys: Option<ApplicationKeys> = self
			.storage
			.retrieve_optional(StorageKey::ApplicationKeys.as_str(), application_id)
			.await?;

		if let Some(keys) = &keys {
			self.keys
				.write()
				.await
				.insert(application_id.to_string(), keys.clone());
		}
		Ok(keys)
	}

	/// Returns the origin policy for an application, if configured.
	pub async fn origin_policy(
		&self,
		application_id: &str,
	) -> Result<Option<OriginPolicy>, StorageError> {
		if let Some(policy) = self.policies.read().await.get(application_id) {
			return Ok(Some(policy.clone()));
		}

		let policy: Option<OriginPolicy> = self
			.storage
			.retrieve_optional(StorageKey::OriginPolicies.as_str(), application_id)
			.await?;

		if let Some(policy) = &policy {
			self.policies
				.write()
				.await
				.insert(application_id.to_string(), policy.clone());
		}
		Ok(policy)
	}

	/// Looks up the identity token mapped to a frontend session.
	pub async fn token_for_frontend_session(
		&self,
		application_id: &str,
		frontend_id: &str,
	) -> Result<Option<String>, StorageError> {
		self.storage
			.retrieve_optional(
				StorageKey::FrontendTokens.as_str(),
				&format!("{}:{}", application_id, frontend_id),
			)
			.await
	}

	/// Looks up the identity token mapped to a ledger account.
	pub async fn token_for_account(
		&self,
		application_id: &str,
		account: &str,
	) -> Result<Option<String>, StorageError> {
		self.storage
			.retrieve_optional(
				StorageKey::AccountTokens.as_str(),
				&format!("{}:{}", application_id, account),
			)
			.await
	}

	/// Returns the payload ids previously completed by an account for the
	/// given kind, oldest first.
	pub async fn payload_ids_by_account_and_kind(
		&self,
		application_id: &str,
		account: &str,
		kind: &PayloadKind,
	) -> Result<Vec<String>, StorageError> {
		self.storage
			.list_all(
				StorageKey::AccountIndex.as_str(),
				&format!("{}:{}:{}", application_id, account, kind.tx_type()),
			)
			.await
	}

	/// Persists a correlation record under (payload id, application id),
	/// with a TTL mirroring the platform-side payload expiry when known.
	pub async fn put_correlation_record(
		&self,
		record: &CorrelationRecord,
	) -> Result<(), StorageError> {
		let ttl = record.expires_at.and_then(|expires_at| {
			(expires_at - Utc::now())
				.to_std()
				.ok()
				.filter(|remaining| !remaining.is_zero())
		});

		self.storage
			.store_with_ttl(
				StorageKey::CorrelationRecords.as_str(),
				&Self::correlation_id(&record.payload_id, &record.application_id),
				record,
				ttl.map(|remaining| Duration::from_secs(remaining.as_secs().max(1))),
			)
			.await
	}

	/// Fetches the correlation record for (payload id, application id).
	pub async fn get_correlation_record(
		&self,
		payload_id: &str,
		application_id: &str,
	) -> Result<Option<CorrelationRecord>, StorageError> {
		self.storage
			.retrieve_optional(
				StorageKey::CorrelationRecords.as_str(),
				&Self::correlation_id(payload_id, application_id),
			)
			.await
	}

	/// Removes a consumed correlation record.
	pub async fn delete_correlation_record(
		&self,
		record: &CorrelationRecord,
	) -> Result<(), StorageError> {
		self.storage
			.remove(
				StorageKey::CorrelationRecords.as_str(),
				&Self::correlation_id(&record.payload_id, &record.application_id),
			)
			.await
	}

	/// Maps a frontend session to an identity token, replacing any
	/// previous mapping.
	pub async fn upsert_frontend_token(
		&self,
		application_id: &str,
		frontend_id: &str,
		token: &str,
	) -> Result<(), StorageError> {
		self.storage
			.store(
				StorageKey::FrontendTokens.as_str(),
				&format!("{}:{}", application_id, frontend_id),
				&token,
			)
			.await
	}

	/// Records a payload id under the frontend session that submitted it.
	pub async fn append_frontend_index(
		&self,
		application_id: &str,
		frontend_id: &str,
		tx_type: &str,
		payload_id: &str,
	) -> Result<(), StorageError> {
		self.storage
			.append(
				StorageKey::FrontendIndex.as_str(),
				&format!("{}:{}:{}", application_id, frontend_id, tx_type),
				&payload_id,
			)
			.await
	}

	/// Records a payload id under the identity token it completed with.
	pub async fn append_token_index(
		&self,
		application_id: &str,
		token: &str,
		tx_type: &str,
		payload_id: &str,
	) -> Result<(), StorageError> {
		self.storage
			.append(
				StorageKey::TokenIndex.as_str(),
				&format!("{}:{}:{}", application_id, token, tx_type),
				&payload_id,
			)
			.await
	}

	/// Records a payload id under the ledger account that signed it and,
	/// when the callback carried a token, refreshes the account→token
	/// mapping so later submissions can resolve it directly.
	pub async fn append_account_index(
		&self,
		application_id: &str,
		account: &str,
		tx_type: &str,
		payload_id: &str,
		token: Option<&str>,
	) -> Result<(), StorageError> {
		self.storage
			.append(
				StorageKey::AccountIndex.as_str(),
				&format!("{}:{}:{}", application_id, account, tx_type),
				&payload_id,
			)
			.await?;

		if let Some(token) = token {
			self.storage
				.store(
					StorageKey::AccountTokens.as_str(),
					&format!("{}:{}", application_id, account),
					&token,
				)
				.await?;
		}
		Ok(())
	}

	/// Registers an application: the origin binding and its API keys.
	/// Used by provisioning tooling and tests; request handling only reads.
	pub async fn register_application(
		&self,
		origin: &str,
		application_id: &str,
		keys: &ApplicationKeys,
	) -> Result<(), StorageError> {
		self.storage
			.store(StorageKey::Applications.as_str(), origin, &application_id)
			.await?;
		self.storage
			.store(StorageKey::ApplicationKeys.as_str(), application_id, keys)
			.await
	}

	/// Stores the origin policy for an application. Provisioning only.
	pub async fn put_origin_policy(
		&self,
		application_id: &str,
		policy: &OriginPolicy,
	) -> Result<(), StorageError> {
		self.storage
			.store(StorageKey::OriginPolicies.as_str(), application_id, policy)
			.await
	}

	fn correlation_id(payload_id: &str, application_id: &str) -> String {
		format!("{}:{}", application_id, payload_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryStorage;

	fn store() -> IdentityStore {
		IdentityStore::new(Arc::new(StorageService::new(Box::new(
			MemoryStorage::new(),
		))))
	}

	#[tokio::test]
	async fn test_application_lookup_and_cache_reset() {
		let identities = store();
		let keys = ApplicationKeys::new("app-1", "secret-1");

		identities
			.register_application("https://shop.example", "app-1", &keys)
			.await
			.unwrap();

		let app_id = identities
			.app_id_for_origin("https://shop.example")
			.await
			.unwrap();
		assert_eq!(app_id.as_deref(), Some("app-1"));

		// Served from cache on the second call, still correct after reset
		identities.reset_cache().await;
		let app_id = identities
			.app_id_for_origin("https://shop.example")
			.await
			.unwrap();
		assert_eq!(app_id.as_deref(), Some("app-1"));

		assert!(identities
			.app_id_for_origin("https://unknown.example")
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_account_index_refreshes_token_mapping() {
		let identities = store();

		identities
			.append_account_index("app-1", "rAccount", "Payment", "p1", Some("token-1"))
			.await
			.unwrap();
		identities
			.append_account_index("app-1", "rAccount", "Payment", "p2", None)
			.await
			.unwrap();

		let ids = identities
			.payload_ids_by_account_and_kind(
				"app-1",
				"rAccount",
				&PayloadKind::Transaction("Payment".to_string()),
			)
			.await
			.unwrap();
		assert_eq!(ids, vec!["p1".to_string(), "p2".to_string()]);

		let token = identities
			.token_for_account("app-1", "rAccount")
			.await
			.unwrap();
		assert_eq!(token.as_deref(), Some("token-1"));
	}

	#[tokio::test]
	async fn test_correlation_record_round_trip() {
		let identities = store();
		let record = CorrelationRecord {
			origin: "https://shop.example".to_string(),
			referer: "https://shop.example/checkout".to_string(),
			frontend_id: Some("session-1".to_string()),
			application_id: "app-1".to_string(),
			user_token: None,
			payload_id: "p1".to_string(),
			expires_at: None,
		};

		identities.put_correlation_record(&record).await.unwrap();

		let fetched = identities
			.get_correlation_record("p1", "app-1")
			.await
			.unwrap();
		assert_eq!(fetched, Some(record.clone()));

		identities.delete_correlation_record(&record).await.unwrap();
		assert!(identities
			.get_correlation_record("p1", "app-1")
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_sign_in_kind_is_separate_from_tx_type() {
		let identities = store();

		identities
			.append_account_index("app-1", "rAccount", "SignIn", "s1", None)
			.await
			.unwrap();

		let signins = identities
			.payload_ids_by_account_and_kind("app-1", "rAccount", &PayloadKind::SignIn)
			.await
			.unwrap();
		assert_eq!(signins, vec!["s1".to_string()]);

		let payments = identities
			.payload_ids_by_account_and_kind(
				"app-1",
				"rAccount",
				&PayloadKind::Transaction("Payment".to_string()),
			)
			.await
			.unwrap();
		assert!(payments.is_empty());
	}
}
