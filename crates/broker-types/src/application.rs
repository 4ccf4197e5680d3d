//! Application types for registered origins.
//!
//! Every origin that may submit payloads through the broker is registered
//! as an application: an opaque id bound 1:1 to the origin, plus the
//! key/secret pair used to authenticate against the signing platform.
//! Applications are immutable after registration and looked up by origin
//! on every request.

use crate::SecretString;
use serde::{Deserialize, Serialize};

/// A registered application: one origin's identity towards the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
	/// Opaque application id issued by the signing platform.
	pub application_id: String,
	/// The origin this application is bound to, e.g. `https://shop.example`.
	pub origin: String,
}

/// API credentials for one application.
///
/// The key doubles as the application id on the wire; the secret is held
/// in a [`SecretString`] so it never leaks through Debug or Display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationKeys {
	pub api_key: String,
	pub api_secret: SecretString,
}

impl ApplicationKeys {
	pub fn new(api_key: impl Into<String>, api_secret: impl Into<SecretString>) -> Self {
		Self {
			api_key: api_key.into(),
			api_secret: api_secret.into(),
		}
	}
}
