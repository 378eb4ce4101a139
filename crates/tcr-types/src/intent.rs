//! User intents and the outcomes reported for them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The state-changing actions a user can request against a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
	Buy,
	Sell,
	ApproveAllowance,
}

impl fmt::Display for IntentKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			IntentKind::Buy => write!(f, "buy"),
			IntentKind::Sell => write!(f, "sell"),
			IntentKind::ApproveAllowance => write!(f, "approve_allowance"),
		}
	}
}

/// A user-originated request, kept exactly as entered.
///
/// Addresses and the amount stay raw strings: they are validated when the
/// intent is handled and the untouched payload is echoed back in the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIntent {
	pub kind: IntentKind,
	pub token_address: String,
	/// Decimal or `0x`-prefixed hex amount in base units.
	pub amount: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub registry_address: Option<String>,
}

impl TransactionIntent {
	pub fn buy(token_address: impl Into<String>, amount: impl Into<String>) -> Self {
		Self {
			kind: IntentKind::Buy,
			token_address: token_address.into(),
			amount: amount.into(),
			registry_address: None,
		}
	}

	pub fn sell(token_address: impl Into<String>, amount: impl Into<String>) -> Self {
		Self {
			kind: IntentKind::Sell,
			token_address: token_address.into(),
			amount: amount.into(),
			registry_address: None,
		}
	}

	pub fn approve_allowance(
		token_address: impl Into<String>,
		amount: impl Into<String>,
		registry_address: impl Into<String>,
	) -> Self {
		Self {
			kind: IntentKind::ApproveAllowance,
			token_address: token_address.into(),
			amount: amount.into(),
			registry_address: Some(registry_address.into()),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
	Success,
	Failure,
}

/// Result of processing one dispatched intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
	pub kind: OutcomeKind,
	pub intent: TransactionIntent,
}

impl Outcome {
	pub fn success(intent: TransactionIntent) -> Self {
		Self {
			kind: OutcomeKind::Success,
			intent,
		}
	}

	pub fn failure(intent: TransactionIntent) -> Self {
		Self {
			kind: OutcomeKind::Failure,
			intent,
		}
	}

	pub fn is_success(&self) -> bool {
		self.kind == OutcomeKind::Success
	}
}

/// Intent to add a registry to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRegistry {
	pub address: crate::Address,
}
