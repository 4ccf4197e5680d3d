//! HTTP server for the broker API.
//!
//! This module provides a minimal HTTP server infrastructure for the
//! broker API: the payload CRUD routes, the completion-callback hook, and
//! a platform ping. Origin and referer come from the request headers; the
//! frontend may override the referer through the submission options.

use crate::apis;
use axum::{
	extract::{Path, State},
	http::{header, HeaderMap, StatusCode},
	response::Json,
	routing::{get, post},
	Router,
};
use broker_config::ApiConfig;
use broker_core::BrokerEngine;
use broker_types::{
	CallbackOutcome, CompletionCallback, DeleteAck, ErrorResponse, PayloadAck, PayloadRecord,
	SubmitRequest,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the broker engine for processing requests.
	pub engine: Arc<BrokerEngine>,
	/// Token guarding the cache-reset endpoint, if configured.
	pub reset_cache_token: Option<String>,
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<BrokerEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app_state = AppState {
		engine,
		reset_cache_token: api_config.reset_cache_token.clone(),
	};

	let app = Router::new()
		.nest(
			"/api/v1",
			Router::new()
				.route("/payload", post(handle_submit))
				.route("/payload/{id}", get(handle_get_payload).delete(handle_delete_payload))
				.route("/payload/ci/{custom_identifier}", get(handle_get_by_identifier))
				.route("/webhook", post(handle_webhook))
				// Platforms append extra path segments to the callback URL
				.route("/webhook/{*rest}", post(handle_webhook_wildcard))
				.route("/ping", get(handle_ping))
				.route("/reset-cache/{token}", get(handle_reset_cache)),
		)
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(app_state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Broker API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> String {
	headers
		.get(name)
		.and_then(|value| value.to_str().ok())
		.unwrap_or_default()
		.to_string()
}

/// Handles POST /api/v1/payload requests.
async fn handle_submit(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<SubmitRequest>,
) -> Result<Json<PayloadAck>, apis::payload::ApiError> {
	let origin = header_value(&headers, header::ORIGIN);
	let referer = header_value(&headers, header::REFERER);

	match state
		.engine
		.submit_payload(request.payload, &origin, &referer, request.options)
		.await
	{
		Ok(ack) => Ok(Json(ack)),
		Err(e) => Err(apis::payload::map_broker_error(e)),
	}
}

/// Handles GET /api/v1/payload/{id} requests.
async fn handle_get_payload(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
) -> Result<Json<PayloadRecord>, apis::payload::ApiError> {
	let origin = header_value(&headers, header::ORIGIN);

	match state.engine.payload_info(&origin, &id).await {
		Ok(record) => Ok(Json(record)),
		Err(e) => Err(apis::payload::map_broker_error(e)),
	}
}

/// Handles GET /api/v1/payload/ci/{custom_identifier} requests.
async fn handle_get_by_identifier(
	State(state): State<AppState>,
	Path(custom_identifier): Path<String>,
	headers: HeaderMap,
) -> Result<Json<PayloadRecord>, apis::payload::ApiError> {
	let origin = header_value(&headers, header::ORIGIN);

	match state
		.engine
		.payload_info_by_custom_identifier(&origin, &custom_identifier)
		.await
	{
		Ok(record) => Ok(Json(record)),
		Err(e) => Err(apis::payload::map_broker_error(e)),
	}
}

/// Handles DELETE /api/v1/payload/{id} requests.
async fn handle_delete_payload(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
) -> Result<Json<DeleteAck>, apis::payload::ApiError> {
	let origin = header_value(&headers, header::ORIGIN);

	match state.engine.delete_payload(&origin, &id).await {
		Ok(ack) => Ok(Json(ack)),
		Err(e) => Err(apis::payload::map_broker_error(e)),
	}
}

/// Handles POST /api/v1/webhook requests.
async fn handle_webhook(
	State(state): State<AppState>,
	Json(callback): Json<CompletionCallback>,
) -> Result<Json<CallbackOutcome>, apis::payload::ApiError> {
	apis::webhook::handle_callback(&state.engine, callback).await
}

/// Handles POST /api/v1/webhook/{*rest} requests.
async fn handle_webhook_wildcard(
	State(state): State<AppState>,
	Path(_rest): Path<String>,
	Json(callback): Json<CompletionCallback>,
) -> Result<Json<CallbackOutcome>, apis::payload::ApiError> {
	apis::webhook::handle_callback(&state.engine, callback).await
}

/// Handles GET /api/v1/reset-cache/{token} requests.
///
/// Drops the identity store's read-through caches so configuration
/// changes take effect without a restart. Guarded by a configured token;
/// without one the endpoint is disabled.
async fn handle_reset_cache(
	State(state): State<AppState>,
	Path(token): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
	match &state.reset_cache_token {
		Some(expected) if expected == &token => {
			state.engine.reset_cache().await;
			Ok(Json(serde_json::json!({ "success": true })))
		}
		_ => Err((
			StatusCode::FORBIDDEN,
			Json(ErrorResponse {
				error: "FORBIDDEN".to_string(),
				message: "Invalid reset token".to_string(),
			}),
		)),
	}
}

/// Handles GET /api/v1/ping requests.
async fn handle_ping(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
	let origin = header_value(&headers, header::ORIGIN);

	match state.engine.platform_ping(&origin).await {
		Ok(pong) => Ok(Json(serde_json::json!({ "pong": pong }))),
		Err(e) => Err(apis::payload::map_broker_error(e)),
	}
}
