//! Identity token resolution.
//!
//! Finds a reusable identity token for the submitting user so the platform
//! can push the request to their wallet and pre-fill the signing account.
//! Four strategies are tried in a fixed order; the first that yields a
//! token wins and no later one is consulted. A failing strategy is logged
//! and treated as "no token found" — resolution is enrichment, never a
//! reason to fail the submission. No token at the end simply means an
//! anonymous request.

use crate::BrokerError;
use broker_platform::PlatformService;
use broker_storage::IdentityStore;
use broker_types::{PayloadKind, SubmitOptions};

/// The resolution strategies, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
	/// Token previously mapped to the frontend session.
	FrontendSession,
	/// Token previously mapped to the ledger account.
	AccountMapping,
	/// Token issued on the account's most recent sign-in payload.
	LatestSignIn,
	/// Token issued on the account's most recent payload of the same
	/// transaction type.
	LatestOfType,
}

const CASCADE: [Strategy; 4] = [
	Strategy::FrontendSession,
	Strategy::AccountMapping,
	Strategy::LatestSignIn,
	Strategy::LatestOfType,
];

/// Resolves an identity token for the submitting user, if one can be
/// found.
pub(crate) async fn resolve_user_token(
	identities: &IdentityStore,
	platform: &PlatformService,
	application_id: &str,
	options: &SubmitOptions,
	transaction_type: Option<&str>,
) -> Option<String> {
	for strategy in CASCADE {
		match try_strategy(
			strategy,
			identities,
			platform,
			application_id,
			options,
			transaction_type,
		)
		.await
		{
			Ok(Some(token)) => {
				tracing::debug!(?strategy, "resolved identity token");
				return Some(token);
			}
			Ok(None) => {}
			Err(e) => {
				tracing::warn!(
					?strategy,
					error = %e,
					"identity token lookup failed, trying next strategy"
				);
			}
		}
	}
	None
}

/// Runs one strategy. `Ok(None)` means "not applicable or nothing found,
/// try the next one".
async fn try_strategy(
	strategy: Strategy,
	identities: &IdentityStore,
	platform: &PlatformService,
	application_id: &str,
	options: &SubmitOptions,
	transaction_type: Option<&str>,
) -> Result<Option<String>, BrokerError> {
	match strategy {
		Strategy::FrontendSession => {
			if options.push_disabled {
				return Ok(None);
			}
			let Some(frontend_id) = options.frontend_id.as_deref() else {
				return Ok(None);
			};
			let token = identities
				.token_for_frontend_session(application_id, frontend_id)
				.await?;
			// Blank mappings count as absent
			Ok(token.filter(|t| !t.trim().is_empty()))
		}
		Strategy::AccountMapping => {
			let Some(account) = options.ledger_account.as_deref() else {
				return Ok(None);
			};
			Ok(identities.token_for_account(application_id, account).await?)
		}
		Strategy::LatestSignIn => {
			let Some(account) = options.ledger_account.as_deref() else {
				return Ok(None);
			};
			latest_issued_token(
				identities,
				platform,
				application_id,
				account,
				&PayloadKind::SignIn,
			)
			.await
		}
		Strategy::LatestOfType => {
			let Some(account) = options.ledger_account.as_deref() else {
				return Ok(None);
			};
			let Some(tx_type) = transaction_type else {
				return Ok(None);
			};
			latest_issued_token(
				identities,
				platform,
				application_id,
				account,
				&PayloadKind::Transaction(tx_type.to_string()),
			)
			.await
		}
	}
}

/// Fetches the most recent payload of the given kind for (application,
/// account) and returns the token the platform issued on it, if any.
async fn latest_issued_token(
	identities: &IdentityStore,
	platform: &PlatformService,
	application_id: &str,
	account: &str,
	kind: &PayloadKind,
) -> Result<Option<String>, BrokerError> {
	let payload_ids = identities
		.payload_ids_by_account_and_kind(application_id, account, kind)
		.await?;

	let Some(latest) = payload_ids.last() else {
		return Ok(None);
	};

	let record = platform.payload_info(application_id, latest).await?;
	Ok(record.application.issued_user_token)
}
