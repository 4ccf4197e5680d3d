//! Completion callback types.
//!
//! When a payload resolves on the platform side (signed, rejected or
//! expired), the platform posts a callback to the broker. The body names
//! the application and payload by id and, when the user granted persistent
//! linkage during this request, carries the issued identity token.

use serde::{Deserialize, Serialize};

/// Body of a completion callback.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletionCallback {
	pub meta: CallbackMeta,
	#[serde(rename = "userToken", skip_serializing_if = "Option::is_none")]
	pub user_token: Option<CallbackUserToken>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackMeta {
	#[serde(rename = "application_uuidv4")]
	pub application_id: String,
	#[serde(rename = "payload_uuidv4")]
	pub payload_id: String,
}

/// Token block of a callback; present when push linkage exists.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackUserToken {
	pub user_token: String,
}

/// Result of handling a completion callback.
///
/// A callback that finds no correlation record is not an error; it simply
/// did not consume anything (the record may never have been written, or
/// expired first). Serialized as `{"success": bool}` for the route layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallbackOutcome {
	#[serde(rename = "success")]
	pub consumed: bool,
}

impl CallbackOutcome {
	pub fn consumed() -> Self {
		Self { consumed: true }
	}

	pub fn miss() -> Self {
		Self { consumed: false }
	}
}
