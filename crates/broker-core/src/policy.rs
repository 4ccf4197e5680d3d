//! Origin policy application.
//!
//! Rewrites the outgoing payload according to the application's
//! [`OriginPolicy`]: the destination account and tag for payments, a fixed
//! amount, and the return URL the platform may redirect to after signing.
//! Every lookup resolves by selector precedence (exact referer, then
//! `origin/*`, then `*`).
//!
//! Return URLs are default-deny: the referer is attacker-controlled, so
//! unless a configured rule matches it, any redirect instructions already
//! on the payload are stripped before submission.

use broker_types::{OriginPolicy, PayloadRequest, SubmitOptions};

/// Marker appended to a return URL when the frontend validates sign-ins.
const SIGNIN_MARKER: &str = "&signinToValidate=true";

/// Applies the origin policy to the payload in place.
pub(crate) fn apply_origin_policy(
	policy: &OriginPolicy,
	origin: &str,
	referer: &str,
	options: &SubmitOptions,
	payload: &mut PayloadRequest,
) {
	let payment = payload.txjson.is_payment();

	// Destination rewrite only applies to plain payments; issued-currency
	// and pre-encoded flows carry their own destination.
	if payment && !options.issuing && !options.raw_transaction {
		if let Some(destination) = policy.destination_for(origin, referer) {
			payload.txjson.destination = Some(destination.account.clone());
			match destination.tag.as_ref().and_then(|tag| tag.as_i64()) {
				Some(tag) => payload.txjson.destination_tag = Some(tag),
				// A missing or non-integer tag clears whatever the client set
				None => payload.txjson.destination_tag = None,
			}
		}
	}

	if payment {
		if let Some(amount) = policy.amount_for(origin, referer) {
			payload.txjson.amount = Some(amount.clone());
		}
	}

	apply_return_urls(policy, origin, referer, options, payload);
}

fn apply_return_urls(
	policy: &OriginPolicy,
	origin: &str,
	referer: &str,
	options: &SubmitOptions,
	payload: &mut PayloadRequest,
) {
	let mut matched = false;

	// Return URLs are only selected when the submission declared whether
	// it runs in a browser or in an app
	if let Some(web) = options.web {
		if let Some(rule) = policy.return_url_for(origin, referer) {
			matched = true;
			let marker = if options.signin_to_validate {
				SIGNIN_MARKER
			} else {
				""
			};

			let request_options = payload.options.get_or_insert_with(Default::default);
			let return_url = request_options.return_url.get_or_insert_with(Default::default);

			if web {
				if let Some(to_web) = &rule.to_web {
					return_url.web = Some(format!("{}{}", to_web, marker));
				}
			} else if let Some(to_app) = &rule.to_app {
				return_url.app = Some(format!("{}{}", to_app, marker));
			}
		}
	}

	// Unknown referer: strip redirect instructions entirely
	if !matched {
		if let Some(request_options) = payload.options.as_mut() {
			request_options.return_url = None;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use broker_types::{
		DestinationOverride, PayloadRequestOptions, ReturnUrl, ReturnUrlRule, TxJson,
	};
	use serde_json::json;

	fn payment() -> PayloadRequest {
		PayloadRequest {
			txjson: TxJson {
				transaction_type: Some("Payment".to_string()),
				destination: Some("rClient".to_string()),
				destination_tag: Some(99),
				..Default::default()
			},
			..Default::default()
		}
	}

	fn policy_with_destination(selector: &str, tag: Option<i64>) -> OriginPolicy {
		let mut policy = OriginPolicy::default();
		policy.destination_account.insert(
			selector.to_string(),
			DestinationOverride {
				account: "rPolicy".to_string(),
				tag: tag.map(serde_json::Number::from),
			},
		);
		policy
	}

	#[test]
	fn test_destination_override_with_tag() {
		let policy = policy_with_destination("shop.example/*", Some(7));
		let mut payload = payment();

		apply_origin_policy(
			&policy,
			"shop.example",
			"shop.example/checkout",
			&SubmitOptions::default(),
			&mut payload,
		);

		assert_eq!(payload.txjson.destination.as_deref(), Some("rPolicy"));
		assert_eq!(payload.txjson.destination_tag, Some(7));
	}

	#[test]
	fn test_destination_override_without_tag_clears_existing() {
		let policy = policy_with_destination("*", None);
		let mut payload = payment();

		apply_origin_policy(
			&policy,
			"shop.example",
			"shop.example/checkout",
			&SubmitOptions::default(),
			&mut payload,
		);

		assert_eq!(payload.txjson.destination.as_deref(), Some("rPolicy"));
		assert_eq!(payload.txjson.destination_tag, None);
	}

	#[test]
	fn test_non_integer_tag_clears_existing() {
		let mut policy = OriginPolicy::default();
		policy.destination_account.insert(
			"*".to_string(),
			DestinationOverride {
				account: "rPolicy".to_string(),
				tag: serde_json::Number::from_f64(7.5),
			},
		);
		let mut payload = payment();

		apply_origin_policy(
			&policy,
			"shop.example",
			"shop.example/checkout",
			&SubmitOptions::default(),
			&mut payload,
		);

		assert_eq!(payload.txjson.destination_tag, None);
	}

	#[test]
	fn test_issuing_flow_keeps_client_destination() {
		let policy = policy_with_destination("*", Some(7));
		let mut payload = payment();
		let options = SubmitOptions {
			issuing: true,
			..Default::default()
		};

		apply_origin_policy(
			&policy,
			"shop.example",
			"shop.example/checkout",
			&options,
			&mut payload,
		);

		assert_eq!(payload.txjson.destination.as_deref(), Some("rClient"));
		assert_eq!(payload.txjson.destination_tag, Some(99));
	}

	#[test]
	fn test_amount_override_applies_to_raw_transactions() {
		let mut policy = OriginPolicy::default();
		policy.fix_amount.insert("*".to_string(), json!("1000000"));
		let mut payload = payment();
		let options = SubmitOptions {
			raw_transaction: true,
			..Default::default()
		};

		apply_origin_policy(
			&policy,
			"shop.example",
			"shop.example/checkout",
			&options,
			&mut payload,
		);

		// Destination untouched, amount still pinned
		assert_eq!(payload.txjson.destination.as_deref(), Some("rClient"));
		assert_eq!(payload.txjson.amount, Some(json!("1000000")));
	}

	#[test]
	fn test_amount_override_skips_non_payments() {
		let mut policy = OriginPolicy::default();
		policy.fix_amount.insert("*".to_string(), json!("1000000"));
		let mut payload = PayloadRequest {
			txjson: TxJson {
				transaction_type: Some("SignIn".to_string()),
				..Default::default()
			},
			..Default::default()
		};

		apply_origin_policy(
			&policy,
			"shop.example",
			"shop.example/login",
			&SubmitOptions::default(),
			&mut payload,
		);

		assert!(payload.txjson.amount.is_none());
	}

	#[test]
	fn test_return_url_selected_for_web() {
		let mut policy = OriginPolicy::default();
		policy.return_urls.push(ReturnUrlRule {
			from: "app.example/pay".to_string(),
			to_web: Some("https://app.example/done".to_string()),
			to_app: Some("myapp://done".to_string()),
		});
		let mut payload = PayloadRequest::default();
		let options = SubmitOptions {
			web: Some(true),
			..Default::default()
		};

		apply_origin_policy(&policy, "app.example", "app.example/pay", &options, &mut payload);

		let return_url = payload.options.unwrap().return_url.unwrap();
		assert_eq!(return_url.web.as_deref(), Some("https://app.example/done"));
		assert!(return_url.app.is_none());
	}

	#[test]
	fn test_return_url_selected_for_app() {
		let mut policy = OriginPolicy::default();
		policy.return_urls.push(ReturnUrlRule {
			from: "app.example/*".to_string(),
			to_web: Some("https://app.example/done".to_string()),
			to_app: Some("myapp://done".to_string()),
		});
		let mut payload = PayloadRequest::default();
		let options = SubmitOptions {
			web: Some(false),
			signin_to_validate: true,
			..Default::default()
		};

		apply_origin_policy(&policy, "app.example", "app.example/pay", &options, &mut payload);

		let return_url = payload.options.unwrap().return_url.unwrap();
		assert_eq!(
			return_url.app.as_deref(),
			Some("myapp://done&signinToValidate=true")
		);
	}

	#[test]
	fn test_unknown_referer_strips_preset_return_url() {
		let policy = OriginPolicy::default();
		let mut payload = PayloadRequest {
			options: Some(PayloadRequestOptions {
				return_url: Some(ReturnUrl {
					web: Some("https://evil.example/phish".to_string()),
					app: None,
				}),
				..Default::default()
			}),
			..Default::default()
		};
		let options = SubmitOptions {
			web: Some(true),
			..Default::default()
		};

		apply_origin_policy(
			&policy,
			"shop.example",
			"evil.example/page",
			&options,
			&mut payload,
		);

		assert!(payload.options.unwrap().return_url.is_none());
	}

	#[test]
	fn test_strip_applies_even_without_web_flag() {
		let mut policy = OriginPolicy::default();
		policy.return_urls.push(ReturnUrlRule {
			from: "*".to_string(),
			to_web: Some("https://app.example/done".to_string()),
			to_app: None,
		});
		let mut payload = PayloadRequest {
			options: Some(PayloadRequestOptions {
				return_url: Some(ReturnUrl {
					web: Some("https://evil.example/phish".to_string()),
					app: None,
				}),
				..Default::default()
			}),
			..Default::default()
		};

		// No web flag declared: selection never runs, the strip still does
		apply_origin_policy(
			&policy,
			"shop.example",
			"shop.example/checkout",
			&SubmitOptions::default(),
			&mut payload,
		);

		assert!(payload.options.unwrap().return_url.is_none());
	}
}
