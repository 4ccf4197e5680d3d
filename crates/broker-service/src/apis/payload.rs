//! Payload endpoints of the broker API.
//!
//! Thin wrappers over the engine: extract origin/referer from the request
//! headers, delegate, and map each failure mode onto a status code and a
//! stable error code. Everything unexpected collapses into a uniform 500
//! so internals never leak to callers.

use axum::http::StatusCode;
use axum::response::Json;
use broker_core::BrokerError;
use broker_platform::PlatformError;
use broker_types::ErrorResponse;
use tracing::warn;

/// (status, body) pair produced for a failed request.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Maps an engine error onto the route layer's error contract.
pub fn map_broker_error(error: BrokerError) -> ApiError {
	warn!(error = %error, "request failed");

	let (status, code, message) = match &error {
		BrokerError::ExplorerUnavailable => (
			StatusCode::SERVICE_UNAVAILABLE,
			"EXPLORER_UNAVAILABLE",
			error.to_string(),
		),
		BrokerError::UnknownOrigin(_) => {
			(StatusCode::BAD_REQUEST, "UNKNOWN_ORIGIN", error.to_string())
		}
		BrokerError::Platform(PlatformError::MissingCredentials(_)) => (
			StatusCode::BAD_REQUEST,
			"MISSING_CREDENTIALS",
			error.to_string(),
		),
		BrokerError::Platform(PlatformError::UnknownOrigin(_)) => {
			(StatusCode::BAD_REQUEST, "UNKNOWN_ORIGIN", error.to_string())
		}
		BrokerError::Platform(PlatformError::NotFound(_)) => (
			StatusCode::NOT_FOUND,
			"PAYLOAD_NOT_FOUND",
			error.to_string(),
		),
		// Anything else is reported uniformly
		_ => (
			StatusCode::INTERNAL_SERVER_ERROR,
			"INTERNAL_ERROR",
			"Something went wrong. Please check your request".to_string(),
		),
	};

	(
		status,
		Json(ErrorResponse {
			error: code.to_string(),
			message,
		}),
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use broker_storage::StorageError;

	#[test]
	fn test_explorer_unavailable_is_distinct() {
		let (status, body) = map_broker_error(BrokerError::ExplorerUnavailable);
		assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
		assert_eq!(body.error, "EXPLORER_UNAVAILABLE");
	}

	#[test]
	fn test_unknown_origin_is_bad_request() {
		let (status, body) =
			map_broker_error(BrokerError::UnknownOrigin("https://x.example".to_string()));
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body.error, "UNKNOWN_ORIGIN");
	}

	#[test]
	fn test_missing_credentials_is_bad_request() {
		let (status, body) = map_broker_error(BrokerError::Platform(
			PlatformError::MissingCredentials("app-1".to_string()),
		));
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body.error, "MISSING_CREDENTIALS");
	}

	#[test]
	fn test_internal_errors_do_not_leak() {
		let (status, body) = map_broker_error(BrokerError::Storage(StorageError::Backend(
			"disk exploded at /var/data".to_string(),
		)));
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(body.error, "INTERNAL_ERROR");
		assert!(!body.message.contains("/var/data"));
	}
}
