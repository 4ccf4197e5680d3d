//! The correlation record bridging submission and callback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ephemeral record written after the platform accepts a payload and
/// consumed exactly once by the matching completion callback.
///
/// Keyed by (payload id, application id); at most one record exists per
/// payload id. The expiry mirrors the platform's own payload expiry, so a
/// record whose callback never arrives ages out with the payload itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRecord {
	pub origin: String,
	pub referer: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub frontend_id: Option<String>,
	pub application_id: String,
	/// Token the resolver attached at submission time, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_token: Option<String>,
	pub payload_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<DateTime<Utc>>,
}
