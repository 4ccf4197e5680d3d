//! Storage-related types for the broker.

use std::fmt;
use std::str::FromStr;

/// Storage keys for the broker's data collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Origin → application id bindings.
	Applications,
	/// Application id → API key/secret pairs.
	ApplicationKeys,
	/// Application id → origin policy.
	OriginPolicies,
	/// (application, frontend session) → identity token.
	FrontendTokens,
	/// (application, ledger account) → identity token.
	AccountTokens,
	/// Ephemeral correlation records keyed by (application, payload id).
	CorrelationRecords,
	/// Payload ids submitted per (application, frontend session, tx type).
	FrontendIndex,
	/// Payload ids completed per (application, ledger account, tx type).
	AccountIndex,
	/// Payload ids completed per (application, identity token, tx type).
	TokenIndex,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Applications => "applications",
			StorageKey::ApplicationKeys => "application_keys",
			StorageKey::OriginPolicies => "origin_policies",
			StorageKey::FrontendTokens => "frontend_tokens",
			StorageKey::AccountTokens => "account_tokens",
			StorageKey::CorrelationRecords => "correlation_records",
			StorageKey::FrontendIndex => "frontend_index",
			StorageKey::AccountIndex => "account_index",
			StorageKey::TokenIndex => "token_index",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Applications,
			Self::ApplicationKeys,
			Self::OriginPolicies,
			Self::FrontendTokens,
			Self::AccountTokens,
			Self::CorrelationRecords,
			Self::FrontendIndex,
			Self::AccountIndex,
			Self::TokenIndex,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"applications" => Ok(Self::Applications),
			"application_keys" => Ok(Self::ApplicationKeys),
			"origin_policies" => Ok(Self::OriginPolicies),
			"frontend_tokens" => Ok(Self::FrontendTokens),
			"account_tokens" => Ok(Self::AccountTokens),
			"correlation_records" => Ok(Self::CorrelationRecords),
			"frontend_index" => Ok(Self::FrontendIndex),
			"account_index" => Ok(Self::AccountIndex),
			"token_index" => Ok(Self::TokenIndex),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}

/// Which submission history of an account an index lookup targets.
///
/// Sign-in requests are indexed under their own transaction type; the
/// resolver asks for them explicitly before falling back to the submitted
/// payload's own type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadKind {
	SignIn,
	Transaction(String),
}

impl PayloadKind {
	/// The transaction-type string this kind is indexed under.
	pub fn tx_type(&self) -> &str {
		match self {
			PayloadKind::SignIn => "SignIn",
			PayloadKind::Transaction(tx_type) => tx_type,
		}
	}
}

impl fmt::Display for PayloadKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.tx_type())
	}
}
