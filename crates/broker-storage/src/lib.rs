//! Storage module for the wallet payload broker.
//!
//! This module provides abstractions for persisting the broker's identity
//! mappings and correlation records, supporting different backend
//! implementations such as in-memory or file-based storage. On top of the
//! raw backend it layers a typed [`StorageService`] and the domain-keyed
//! [`IdentityStore`] consumed by the core.

use async_trait::async_trait;
use broker_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

mod identity;

pub use identity::IdentityStore;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// A requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Serialization/deserialization failed.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The storage backend failed.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Configuration validation failed.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// Backends provide key/value operations with optional TTL plus ordered
/// lists, which the broker uses for its chronological payload-id indices.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes with optional time-to-live.
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Appends an entry to the ordered list stored under the given key,
	/// creating the list if necessary.
	async fn push_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Returns all entries of the ordered list under the given key, oldest
	/// first. A missing list is an empty list, not an error.
	async fn list_bytes(&self, key: &str) -> Result<Vec<Vec<u8>>, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Removes expired entries from storage (optional operation).
	/// Returns the number of entries removed.
	/// Implementations that don't support expiration can return Ok(0).
	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		Ok(0)
	}
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns (name, factory) tuples for every available backend; the service
/// binary uses this to assemble its factory map.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// High-level storage service that provides typed operations.
///
/// Wraps a low-level backend and adds JSON (de)serialization and
/// namespace:id keying for both single values and ordered lists.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Stores a serializable value with optional time-to-live.
	pub async fn store_with_ttl<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&Self::key(namespace, id), bytes, ttl)
			.await
	}

	/// Stores a serializable value without time-to-live.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.store_with_ttl(namespace, id, data, None).await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Retrieves a value, mapping a missing key to `None`.
	pub async fn retrieve_optional<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(namespace, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	/// Appends a serializable entry to the ordered list under namespace:id.
	pub async fn append<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		entry: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(entry).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.push_bytes(&Self::key(namespace, id), bytes).await
	}

	/// Returns the full ordered list under namespace:id, oldest first.
	pub async fn list_all<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Vec<T>, StorageError> {
		let entries = self.backend.list_bytes(&Self::key(namespace, id)).await?;
		entries
			.iter()
			.map(|bytes| {
				serde_json::from_slice(bytes)
					.map_err(|e| StorageError::Serialization(e.to_string()))
			})
			.collect()
	}

	/// Removes expired entries from storage.
	///
	/// Returns the number of entries that were removed. This is a no-op for
	/// backends that don't support TTL.
	pub async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.backend.cleanup_expired().await
	}
}
