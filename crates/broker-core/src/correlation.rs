//! Correlation lifecycle: record after submission, consume on callback.
//!
//! The record write is detached from the response path: the caller already
//! holds the platform's acknowledgement when it runs, and any failure in
//! it is logged and dropped. A callback that arrives before the record was
//! written (or after it expired) finds nothing and reports a miss — that
//! race exists by design and no reconciliation is attempted.

use crate::BrokerError;
use broker_platform::PlatformService;
use broker_storage::IdentityStore;
use broker_types::{CallbackOutcome, CompletionCallback, CorrelationRecord};
use std::sync::Arc;

/// Everything the detached record write needs from the submission.
pub(crate) struct Submission {
	pub origin: String,
	pub referer: String,
	pub frontend_id: Option<String>,
	pub application_id: String,
	pub user_token: Option<String>,
	pub payload_id: String,
	pub tx_type: Option<String>,
}

/// Schedules the correlation record write on a detached task.
pub(crate) fn schedule_record(
	identities: Arc<IdentityStore>,
	platform: Arc<PlatformService>,
	submission: Submission,
) {
	tokio::spawn(async move {
		record_submission(&identities, &platform, submission).await;
	});
}

/// Writes the correlation state for one accepted submission: the frontend
/// index entry and the correlation record itself. Best-effort throughout.
pub(crate) async fn record_submission(
	identities: &IdentityStore,
	platform: &PlatformService,
	submission: Submission,
) {
	if let (Some(frontend_id), Some(tx_type)) =
		(submission.frontend_id.as_deref(), submission.tx_type.as_deref())
	{
		if let Err(e) = identities
			.append_frontend_index(
				&submission.application_id,
				frontend_id,
				tx_type,
				&submission.payload_id,
			)
			.await
		{
			tracing::warn!(
				payload_id = %submission.payload_id,
				error = %e,
				"failed to index payload for frontend session"
			);
		}
	}

	// The record's expiry mirrors the platform-side payload expiry
	let expires_at = match platform
		.payload_info(&submission.application_id, &submission.payload_id)
		.await
	{
		Ok(record) => record.payload.expires_at,
		Err(e) => {
			tracing::warn!(
				payload_id = %submission.payload_id,
				error = %e,
				"failed to fetch payload expiry, skipping correlation record"
			);
			return;
		}
	};

	let record = CorrelationRecord {
		origin: submission.origin,
		referer: submission.referer,
		frontend_id: submission.frontend_id,
		application_id: submission.application_id,
		user_token: submission.user_token,
		payload_id: submission.payload_id,
		expires_at,
	};

	if let Err(e) = identities.put_correlation_record(&record).await {
		tracing::warn!(
			payload_id = %record.payload_id,
			error = %e,
			"failed to write correlation record"
		);
	}
}

/// Consumes the correlation record for a completed payload.
///
/// When the record exists, the identity mappings it enables are promoted
/// into durable storage and the record is deleted; consuming it a second
/// time therefore reports a miss. When it does not exist, nothing is
/// mutated.
pub(crate) async fn consume_completion(
	identities: &IdentityStore,
	platform: &PlatformService,
	callback: &CompletionCallback,
) -> Result<CallbackOutcome, BrokerError> {
	let application_id = &callback.meta.application_id;
	let payload_id = &callback.meta.payload_id;

	let record = platform.payload_info(application_id, payload_id).await?;

	let Some(correlation) = identities
		.get_correlation_record(payload_id, application_id)
		.await?
	else {
		tracing::debug!(
			payload_id = %payload_id,
			"no correlation record for completed payload"
		);
		return Ok(CallbackOutcome::miss());
	};

	if let Some(issued_token) = record.application.issued_user_token.as_deref() {
		if let Some(frontend_id) = correlation.frontend_id.as_deref() {
			identities
				.upsert_frontend_token(application_id, frontend_id, issued_token)
				.await?;
		}
		identities
			.append_token_index(application_id, issued_token, &record.payload.tx_type, payload_id)
			.await?;
	}

	if let Some(account) = record.response.as_ref().and_then(|r| r.account.as_deref()) {
		let callback_token = callback
			.user_token
			.as_ref()
			.map(|token| token.user_token.as_str());
		identities
			.append_account_index(
				application_id,
				account,
				&record.payload.tx_type,
				payload_id,
				callback_token,
			)
			.await?;
	}

	identities.delete_correlation_record(&correlation).await?;

	tracing::debug!(payload_id = %payload_id, "correlation record consumed");
	Ok(CallbackOutcome::consumed())
}

#[cfg(test)]
mod tests {
	use super::*;
	use broker_platform::implementations::mock::MockPlatform;
	use broker_storage::implementations::memory::MemoryStorage;
	use broker_storage::StorageService;
	use broker_types::{
		ApplicationKeys, CallbackMeta, CallbackUserToken, PayloadApplication, PayloadDetails,
		PayloadKind, PayloadMeta, PayloadOutcome, PayloadRecord,
	};

	struct Fixture {
		identities: Arc<IdentityStore>,
		platform: MockPlatform,
		service: PlatformService,
	}

	async fn fixture() -> Fixture {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let identities = Arc::new(IdentityStore::new(storage));
		identities
			.register_application(
				"https://shop.example",
				"app-1",
				&ApplicationKeys::new("app-1", "secret-1"),
			)
			.await
			.unwrap();

		let platform = MockPlatform::new();
		let service = PlatformService::new(Box::new(platform.clone()), Arc::clone(&identities));

		Fixture {
			identities,
			platform,
			service,
		}
	}

	fn submission(payload_id: &str) -> Submission {
		Submission {
			origin: "https://shop.example".to_string(),
			referer: "https://shop.example/checkout".to_string(),
			frontend_id: Some("session-1".to_string()),
			application_id: "app-1".to_string(),
			user_token: None,
			payload_id: payload_id.to_string(),
			tx_type: Some("SignIn".to_string()),
		}
	}

	fn completed_record(payload_id: &str, token: Option<&str>, account: Option<&str>) -> PayloadRecord {
		PayloadRecord {
			meta: PayloadMeta {
				uuid: payload_id.to_string(),
				signed: true,
				resolved: true,
				..Default::default()
			},
			application: PayloadApplication {
				issued_user_token: token.map(str::to_string),
			},
			payload: PayloadDetails {
				tx_type: "SignIn".to_string(),
				..Default::default()
			},
			response: account.map(|account| PayloadOutcome {
				account: Some(account.to_string()),
				txid: Some("ABCDEF".to_string()),
			}),
		}
	}

	fn callback(payload_id: &str, token: Option<&str>) -> CompletionCallback {
		CompletionCallback {
			meta: CallbackMeta {
				application_id: "app-1".to_string(),
				payload_id: payload_id.to_string(),
			},
			user_token: token.map(|token| CallbackUserToken {
				user_token: token.to_string(),
			}),
		}
	}

	#[tokio::test]
	async fn test_record_then_consume_promotes_mappings() {
		let f = fixture().await;
		f.platform
			.insert_record("p1", completed_record("p1", Some("issued-token"), Some("rSigner")));

		record_submission(&f.identities, &f.service, submission("p1")).await;
		assert!(f
			.identities
			.get_correlation_record("p1", "app-1")
			.await
			.unwrap()
			.is_some());

		let outcome = consume_completion(&f.identities, &f.service, &callback("p1", Some("issued-token")))
			.await
			.unwrap();
		assert_eq!(outcome, CallbackOutcome::consumed());

		// Frontend session now maps to the issued token
		let token = f
			.identities
			.token_for_frontend_session("app-1", "session-1")
			.await
			.unwrap();
		assert_eq!(token.as_deref(), Some("issued-token"));

		// Exactly one account index entry, carrying the token mapping too
		let ids = f
			.identities
			.payload_ids_by_account_and_kind("app-1", "rSigner", &PayloadKind::SignIn)
			.await
			.unwrap();
		assert_eq!(ids, vec!["p1".to_string()]);
		let account_token = f.identities.token_for_account("app-1", "rSigner").await.unwrap();
		assert_eq!(account_token.as_deref(), Some("issued-token"));

		// The record is gone
		assert!(f
			.identities
			.get_correlation_record("p1", "app-1")
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_second_consume_is_a_miss() {
		let f = fixture().await;
		f.platform
			.insert_record("p1", completed_record("p1", Some("issued-token"), Some("rSigner")));

		record_submission(&f.identities, &f.service, submission("p1")).await;

		let first = consume_completion(&f.identities, &f.service, &callback("p1", None))
			.await
			.unwrap();
		assert_eq!(first, CallbackOutcome::consumed());

		let second = consume_completion(&f.identities, &f.service, &callback("p1", None))
			.await
			.unwrap();
		assert_eq!(second, CallbackOutcome::miss());
	}

	#[tokio::test]
	async fn test_early_callback_mutates_nothing() {
		let f = fixture().await;
		f.platform
			.insert_record("p1", completed_record("p1", Some("issued-token"), Some("rSigner")));

		// No record_submission: the callback races ahead of the write
		let outcome = consume_completion(&f.identities, &f.service, &callback("p1", None))
			.await
			.unwrap();
		assert_eq!(outcome, CallbackOutcome::miss());

		assert!(f
			.identities
			.token_for_frontend_session("app-1", "session-1")
			.await
			.unwrap()
			.is_none());
		assert!(f
			.identities
			.payload_ids_by_account_and_kind("app-1", "rSigner", &PayloadKind::SignIn)
			.await
			.unwrap()
			.is_empty());
	}

	#[tokio::test]
	async fn test_unsigned_completion_updates_no_mappings() {
		let f = fixture().await;
		// Rejected request: no token issued, no signing account
		f.platform.insert_record("p1", completed_record("p1", None, None));

		record_submission(&f.identities, &f.service, submission("p1")).await;

		let outcome = consume_completion(&f.identities, &f.service, &callback("p1", None))
			.await
			.unwrap();
		assert_eq!(outcome, CallbackOutcome::consumed());

		assert!(f
			.identities
			.token_for_frontend_session("app-1", "session-1")
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_record_skipped_when_expiry_fetch_fails() {
		let f = fixture().await;
		// No platform record primed: the expiry fetch fails
		record_submission(&f.identities, &f.service, submission("p1")).await;

		assert!(f
			.identities
			.get_correlation_record("p1", "app-1")
			.await
			.unwrap()
			.is_none());
	}
}
