//! Account-related types for the dashboard.
//!
//! This module defines the read-only account snapshot consulted when an
//! intent is handled, and the transaction type that flows from the token
//! layer down to delivery.

use crate::Address;
use alloy::primitives::{Bytes, TxKind, U256};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use serde::{Deserialize, Serialize};

/// Snapshot of the wallet session at intent-handling time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
	/// Whether the user completed the login flow.
	pub logged_in: bool,
	/// Wallet address of the session, if one is unlocked.
	pub wallet_address: Option<Address>,
}

impl Account {
	pub fn logged_out() -> Self {
		Self::default()
	}

	pub fn logged_in(wallet_address: Address) -> Self {
		Self {
			logged_in: true,
			wallet_address: Some(wallet_address),
		}
	}

	/// Returns the wallet address only when the session may sign transactions.
	pub fn authenticated_address(&self) -> Option<Address> {
		if self.logged_in {
			self.wallet_address
		} else {
			None
		}
	}

	pub fn is_authenticated(&self) -> bool {
		self.authenticated_address().is_some()
	}
}

/// Blockchain transaction representation.
///
/// Contains the fields needed to submit a contract call; gas and nonce are
/// left to the provider when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
	/// Contract being called.
	pub to: Address,
	/// Sender; must be the session wallet.
	pub from: Address,
	/// ABI-encoded calldata.
	pub data: Vec<u8>,
	/// Value to transfer in native currency.
	pub value: U256,
	/// Chain ID for replay protection, filled by the provider when unset.
	pub chain_id: Option<u64>,
	/// Gas limit for transaction execution.
	pub gas_limit: Option<u64>,
	/// Maximum fee per gas (EIP-1559).
	pub max_fee_per_gas: Option<u128>,
	/// Maximum priority fee per gas (EIP-1559).
	pub max_priority_fee_per_gas: Option<u128>,
}

impl Transaction {
	pub fn call(from: Address, to: Address, data: Vec<u8>) -> Self {
		Self {
			to,
			from,
			data,
			value: U256::ZERO,
			chain_id: None,
			gas_limit: None,
			max_fee_per_gas: None,
			max_priority_fee_per_gas: None,
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}
}

/// Conversion from our Transaction type to Alloy's TransactionRequest.
impl From<Transaction> for TransactionRequest {
	fn from(tx: Transaction) -> Self {
		TransactionRequest {
			from: Some(tx.from.into()),
			to: Some(TxKind::Call(tx.to.into())),
			value: Some(tx.value),
			chain_id: tx.chain_id,
			gas: tx.gas_limit,
			max_fee_per_gas: tx.max_fee_per_gas,
			max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
			input: TransactionInput::new(Bytes::from(tx.data)),
			..Default::default()
		}
	}
}
