//! Availability gate for payment payloads.
//!
//! Payments depend on the ledger explorer for their later on-ledger
//! verification, so the explorer is probed before a payment is handed to
//! the platform. Donation payments are exempt: they carry a marker
//! instruction and are never verified on-ledger.

use crate::BrokerError;
use broker_platform::availability::AvailabilityService;
use broker_types::PayloadRequest;

/// Instruction marking a donation payment; such payments skip the probe.
pub const DONATION_SENTINEL: &str = "Thank you for your donation!";

/// True when the payload must pass the explorer probe before submission.
pub(crate) fn requires_probe(payload: &PayloadRequest) -> bool {
	if !payload.txjson.is_payment() {
		return false;
	}

	let donation = payload
		.custom_meta
		.as_ref()
		.and_then(|meta| meta.instruction.as_deref())
		.map(|instruction| instruction == DONATION_SENTINEL)
		.unwrap_or(false);

	!donation
}

/// Probes the explorer for qualifying payloads.
///
/// A failed probe aborts the submission with the distinct
/// [`BrokerError::ExplorerUnavailable`] signal so the caller can show a
/// specific message; nothing is sent to the platform in that case.
pub(crate) async fn check(
	availability: &AvailabilityService,
	payload: &PayloadRequest,
) -> Result<(), BrokerError> {
	if !requires_probe(payload) {
		return Ok(());
	}

	availability.probe().await.map_err(|e| {
		tracing::warn!(error = %e, "ledger explorer probe failed, rejecting payment");
		BrokerError::ExplorerUnavailable
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use broker_types::{CustomMeta, TxJson};

	fn payload(tx_type: Option<&str>, instruction: Option<&str>) -> PayloadRequest {
		PayloadRequest {
			txjson: TxJson {
				transaction_type: tx_type.map(str::to_string),
				..Default::default()
			},
			custom_meta: instruction.map(|i| CustomMeta {
				instruction: Some(i.to_string()),
				..Default::default()
			}),
			..Default::default()
		}
	}

	#[test]
	fn test_payment_requires_probe() {
		assert!(requires_probe(&payload(Some("Payment"), None)));
		assert!(requires_probe(&payload(
			Some("payment"),
			Some("Please pay your order")
		)));
	}

	#[test]
	fn test_donation_payment_skips_probe() {
		assert!(!requires_probe(&payload(
			Some("Payment"),
			Some(DONATION_SENTINEL)
		)));
	}

	#[test]
	fn test_non_payment_skips_probe() {
		assert!(!requires_probe(&payload(Some("SignIn"), None)));
		assert!(!requires_probe(&payload(None, None)));
	}
}
