//! Per-origin policy overrides.
//!
//! Each application carries an [`OriginPolicy`] controlling what the broker
//! rewrites on outgoing payloads: the destination account for payments, a
//! fixed amount, and the return URLs a signed request may redirect back to.
//! Policy entries are keyed by a selector string, resolved with a strict
//! precedence so the override that wins is always auditable:
//!
//! 1. the exact referer URL,
//! 2. `origin/*` — any page under the requesting origin,
//! 3. `*` — the global default.
//!
//! The policy is read-only at request time; it is written only by
//! administrative provisioning.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Policy overrides for one application, keyed by selector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OriginPolicy {
	/// Destination account overrides for payment payloads.
	#[serde(default)]
	pub destination_account: HashMap<String, DestinationOverride>,
	/// Fixed amounts, stored in the platform's wire representation
	/// (a drops string or an issued-currency object).
	#[serde(default)]
	pub fix_amount: HashMap<String, serde_json::Value>,
	/// Return-URL rules, matched against the referer.
	#[serde(default)]
	pub return_urls: Vec<ReturnUrlRule>,
	/// Window in milliseconds within which a signed payment is considered
	/// valid by administrative tooling. Not consumed on the submission path.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub payment_validation_timeframe: Option<u64>,
}

/// A destination override: the account and an optional destination tag.
///
/// The tag is kept as a raw JSON number so that only whole-number tags are
/// ever applied; anything else clears a pre-set tag instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationOverride {
	pub account: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tag: Option<serde_json::Number>,
}

/// One return-URL rule: requests coming from `from` may redirect back to
/// `to_web` (browser flows) or `to_app` (app flows).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnUrlRule {
	pub from: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub to_web: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub to_app: Option<String>,
}

/// Returns the selector candidates for (origin, referer) in precedence
/// order: exact referer, origin wildcard, global wildcard.
///
/// Every policy lookup walks this list, which keeps the precedence
/// invariant in one place.
pub fn selector_candidates(origin: &str, referer: &str) -> [String; 3] {
	[
		referer.to_string(),
		format!("{}/*", origin),
		"*".to_string(),
	]
}

impl OriginPolicy {
	/// Resolves the destination override for (origin, referer), if any.
	pub fn destination_for(&self, origin: &str, referer: &str) -> Option<&DestinationOverride> {
		selector_candidates(origin, referer)
			.iter()
			.find_map(|selector| self.destination_account.get(selector))
	}

	/// Resolves the fixed amount for (origin, referer), if any.
	pub fn amount_for(&self, origin: &str, referer: &str) -> Option<&serde_json::Value> {
		selector_candidates(origin, referer)
			.iter()
			.find_map(|selector| self.fix_amount.get(selector))
	}

	/// Resolves the return-URL rule for (origin, referer), if any.
	///
	/// Rules are matched by their `from` selector with the same precedence
	/// as the map-backed overrides; among several rules with the same
	/// selector the first wins.
	pub fn return_url_for(&self, origin: &str, referer: &str) -> Option<&ReturnUrlRule> {
		selector_candidates(origin, referer)
			.iter()
			.find_map(|selector| self.return_urls.iter().find(|rule| &rule.from == selector))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn policy_with_destinations(selectors: &[&str]) -> OriginPolicy {
		let mut policy = OriginPolicy::default();
		for selector in selectors {
			policy.destination_account.insert(
				selector.to_string(),
				DestinationOverride {
					account: format!("r{}", selector),
					tag: None,
				},
			);
		}
		policy
	}

	#[test]
	fn test_exact_referer_beats_origin_wildcard() {
		let policy =
			policy_with_destinations(&["shop.example/checkout", "shop.example/*", "*"]);

		let resolved = policy
			.destination_for("shop.example", "shop.example/checkout")
			.unwrap();
		assert_eq!(resolved.account, "rshop.example/checkout");
	}

	#[test]
	fn test_origin_wildcard_beats_global() {
		let policy = policy_with_destinations(&["shop.example/*", "*"]);

		let resolved = policy
			.destination_for("shop.example", "shop.example/checkout")
			.unwrap();
		assert_eq!(resolved.account, "rshop.example/*");
	}

	#[test]
	fn test_global_wildcard_is_last_resort() {
		let policy = policy_with_destinations(&["*"]);

		let resolved = policy
			.destination_for("shop.example", "shop.example/checkout")
			.unwrap();
		assert_eq!(resolved.account, "r*");
	}

	#[test]
	fn test_no_selector_matches() {
		let policy = policy_with_destinations(&["other.example/*"]);

		assert!(policy
			.destination_for("shop.example", "shop.example/checkout")
			.is_none());
	}

	#[test]
	fn test_amount_precedence() {
		let mut policy = OriginPolicy::default();
		policy
			.fix_amount
			.insert("*".to_string(), json!("1000000"));
		policy
			.fix_amount
			.insert("shop.example/*".to_string(), json!("5000"));

		assert_eq!(
			policy.amount_for("shop.example", "shop.example/pay"),
			Some(&json!("5000"))
		);
		assert_eq!(
			policy.amount_for("other.example", "other.example/pay"),
			Some(&json!("1000000"))
		);
	}

	#[test]
	fn test_return_url_precedence_over_rule_order() {
		let mut policy = OriginPolicy::default();
		// Listed global-first: precedence must still pick the origin wildcard.
		policy.return_urls.push(ReturnUrlRule {
			from: "*".to_string(),
			to_web: Some("https://fallback.example/done".to_string()),
			to_app: None,
		});
		policy.return_urls.push(ReturnUrlRule {
			from: "app.example/*".to_string(),
			to_web: Some("https://app.example/done".to_string()),
			to_app: None,
		});

		let rule = policy
			.return_url_for("app.example", "app.example/pay")
			.unwrap();
		assert_eq!(rule.to_web.as_deref(), Some("https://app.example/done"));
	}
}
