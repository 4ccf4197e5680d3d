//! Completion-callback endpoint of the broker API.
//!
//! The platform posts here when a payload resolves. The body identifies
//! the application and payload; the engine consumes the matching
//! correlation record and the handler answers `{"success": bool}` —
//! `false` means the record was missing (early callback or expiry), which
//! is an expected outcome, not a server error.

use crate::apis::payload::{map_broker_error, ApiError};
use axum::response::Json;
use broker_core::BrokerEngine;
use broker_types::{CallbackOutcome, CompletionCallback};
use tracing::info;

/// Handles a completion callback.
pub async fn handle_callback(
	engine: &BrokerEngine,
	callback: CompletionCallback,
) -> Result<Json<CallbackOutcome>, ApiError> {
	info!(
		payload_id = %callback.meta.payload_id,
		"completion callback received"
	);

	match engine.handle_completion(&callback).await {
		Ok(outcome) => Ok(Json(outcome)),
		Err(e) => Err(map_broker_error(e)),
	}
}
