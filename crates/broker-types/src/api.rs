//! API envelope types for the HTTP route layer.

use crate::{PayloadRequest, SubmitOptions};
use serde::{Deserialize, Serialize};

/// Body of a payload submission: the platform request template plus the
/// broker-side options block.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmitRequest {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub options: Option<SubmitOptions>,
	pub payload: PayloadRequest,
}

/// Uniform error body returned by the route layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Stable machine-readable code, e.g. `EXPLORER_UNAVAILABLE`.
	pub error: String,
	pub message: String,
}
