//! Secure string type for application API secrets.
//!
//! `SecretString` wraps sensitive string data so it is zeroed on drop and
//! never shows up in Debug or Display output. Unlike a log-only redaction
//! wrapper it serializes the underlying value, so credential records
//! round-trip through the identity store intact.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

/// A string whose memory is zeroed on drop and whose Debug/Display
/// output is redacted.
///
/// Used for application API secrets. Call [`SecretString::expose`] at the
/// single point where the raw value is actually needed (the HTTP header
/// of a platform call) and nowhere else.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(value: String) -> Self {
		Self(Zeroizing::new(value))
	}

	/// Returns the raw secret.
	pub fn expose(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString([redacted])")
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[redacted]")
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value.to_string())
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_str() == other.0.as_str()
	}
}

impl Eq for SecretString {}

// Serialization carries the real value: the identity store is the system
// of record for these credentials and must be able to read them back.
impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.0)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = String::deserialize(deserializer)?;
		Ok(SecretString::new(value))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_debug_is_redacted() {
		let secret = SecretString::from("app-secret-1");
		let debug_str = format!("{:?}", secret);
		assert_eq!(debug_str, "SecretString([redacted])");
		assert!(!debug_str.contains("app-secret-1"));
	}

	#[test]
	fn test_display_is_redacted() {
		let secret = SecretString::from("app-secret-1");
		assert_eq!(format!("{}", secret), "[redacted]");
	}

	#[test]
	fn test_expose_returns_value() {
		let secret = SecretString::from("app-secret-1");
		assert_eq!(secret.expose(), "app-secret-1");
	}

	#[test]
	fn test_serde_round_trip() {
		let secret = SecretString::from("app-secret-1");
		let json = serde_json::to_string(&secret).unwrap();
		assert_eq!(json, "\"app-secret-1\"");

		let back: SecretString = serde_json::from_str(&json).unwrap();
		assert_eq!(back, secret);
	}
}
