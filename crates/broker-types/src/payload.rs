//! Payload contracts of the signing platform.
//!
//! These types mirror the JSON documents exchanged with the platform: the
//! request template the broker submits ([`PayloadRequest`]), the immediate
//! acknowledgement ([`PayloadAck`]), and the full record fetched back later
//! ([`PayloadRecord`]). Field names follow the platform's wire format;
//! unknown transaction fields pass through the flattened map untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Typed view of the transaction template inside a payload.
///
/// Only the fields the broker rewrites are modeled; everything else the
/// client sent is preserved verbatim in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxJson {
	#[serde(rename = "TransactionType", skip_serializing_if = "Option::is_none")]
	pub transaction_type: Option<String>,
	#[serde(rename = "Destination", skip_serializing_if = "Option::is_none")]
	pub destination: Option<String>,
	#[serde(rename = "DestinationTag", skip_serializing_if = "Option::is_none")]
	pub destination_tag: Option<i64>,
	/// A drops string or an issued-currency object.
	#[serde(rename = "Amount", skip_serializing_if = "Option::is_none")]
	pub amount: Option<serde_json::Value>,
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TxJson {
	/// True when the template is a payment, matched case-insensitively the
	/// way the platform does.
	pub fn is_payment(&self) -> bool {
		self.transaction_type
			.as_deref()
			.map(|tx_type| tx_type.trim().eq_ignore_ascii_case("payment"))
			.unwrap_or(false)
	}
}

/// The request template submitted to the platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadRequest {
	/// Identity token attached by the resolver; enables push delivery.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_token: Option<String>,
	pub txjson: TxJson,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub options: Option<PayloadRequestOptions>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub custom_meta: Option<CustomMeta>,
}

/// Platform-side options of a payload request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadRequestOptions {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub submit: Option<bool>,
	/// Expiry in minutes, as understood by the platform.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expire: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub return_url: Option<ReturnUrl>,
}

/// Where the platform redirects the signer once the request completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnUrl {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub app: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub web: Option<String>,
}

/// Free-form metadata a client attaches to a payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomMeta {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub identifier: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub instruction: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub blob: Option<serde_json::Value>,
}

/// Submission options supplied by the frontend alongside the payload.
///
/// These never reach the platform; they steer identity resolution and
/// policy application inside the broker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmitOptions {
	/// Frontend session id, the broker's handle on a returning browser.
	pub frontend_id: Option<String>,
	/// Declared web-vs-app flag; return URLs are only selected when set.
	pub web: Option<bool>,
	/// Suppresses push delivery even when a token could be resolved.
	pub push_disabled: bool,
	/// Overrides the referer taken from the request headers.
	pub referer: Option<String>,
	/// On-ledger account hint for identity resolution.
	pub ledger_account: Option<String>,
	/// Marks sign-in requests whose outcome the frontend validates.
	pub signin_to_validate: bool,
	/// Issued-currency flow; exempts the payload from destination rewrite.
	pub issuing: bool,
	/// Pre-encoded transaction; exempts the payload from destination rewrite.
	pub raw_transaction: bool,
}

/// The platform's immediate acknowledgement of a created payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadAck {
	pub uuid: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub next: Option<PayloadNext>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub refs: Option<PayloadRefs>,
	#[serde(default)]
	pub pushed: bool,
}

/// Follow-up links for the signer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadNext {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub always: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub no_push_msg_received: Option<String>,
}

/// Out-of-band references (QR code, status socket) for the signer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadRefs {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub qr_png: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub qr_matrix: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub websocket_status: Option<String>,
}

/// The full payload record as fetched from the platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadRecord {
	pub meta: PayloadMeta,
	pub application: PayloadApplication,
	pub payload: PayloadDetails,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub response: Option<PayloadOutcome>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadMeta {
	pub uuid: String,
	#[serde(default)]
	pub expired: bool,
	#[serde(default)]
	pub signed: bool,
	#[serde(default)]
	pub resolved: bool,
}

/// Application section of a payload record; carries the identity token the
/// platform issued when the user granted persistent linkage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadApplication {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub issued_user_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadDetails {
	#[serde(default)]
	pub tx_type: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub request_json: Option<serde_json::Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub created_at: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<DateTime<Utc>>,
}

/// Outcome section of a resolved payload: the signing account and the
/// resulting transaction id, when the request was signed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadOutcome {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub account: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub txid: Option<String>,
}

/// The platform's answer to a payload deletion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteAck {
	pub result: DeleteResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteResult {
	#[serde(default)]
	pub cancelled: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}
