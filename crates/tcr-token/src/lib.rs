//! Contract bindings for tradable registry tokens and registries.
//!
//! Builds the calldata for the state-changing token calls (`buy`, `sell`,
//! `approve`) and decodes the read-only views the dashboard displays.

use alloy::primitives::U256;
use alloy::sol;
use alloy::sol_types::SolCall;
use std::str::FromStr;
use tcr_types::{Address, Transaction};
use thiserror::Error;

sol! {
	/// ERC-20 token with a bonding-curve style buy and sell.
	interface IERC20Tradable {
		function buy() external payable;
		function sell(uint256 amount) external;
		function approve(address spender, uint256 amount) external returns (bool);
		function balanceOf(address owner) external view returns (uint256);
		function symbol() external view returns (string);
	}

	/// Token-curated registry.
	interface IRegistry {
		function name() external view returns (string);
		function token() external view returns (address);
	}
}

#[derive(Debug, Error)]
pub enum TokenError {
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	#[error("Failed to decode {call} result: {reason}")]
	Decode { call: &'static str, reason: String },
}

/// Parses a base-unit amount given in decimal or `0x`-prefixed hex.
pub fn parse_amount(raw: &str) -> Result<U256, TokenError> {
	let trimmed = raw.trim();
	if trimmed.is_empty() {
		return Err(TokenError::InvalidAmount(raw.to_string()));
	}
	U256::from_str(trimmed).map_err(|_| TokenError::InvalidAmount(raw.to_string()))
}

fn parse_address(raw: &str) -> Result<Address, TokenError> {
	Address::parse(raw).map_err(|_| TokenError::InvalidAddress(raw.to_string()))
}

fn decode_error(call: &'static str, e: alloy::sol_types::Error) -> TokenError {
	TokenError::Decode {
		call,
		reason: e.to_string(),
	}
}

/// A tradable token contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradableToken {
	pub address: Address,
}

impl TradableToken {
	pub fn new(address: Address) -> Self {
		Self { address }
	}

	/// Parses the token address from user input.
	pub fn from_input(raw: &str) -> Result<Self, TokenError> {
		parse_address(raw).map(Self::new)
	}

	/// `buy()` carrying the amount as transferred value.
	pub fn buy(&self, from: Address, amount: U256) -> Transaction {
		let data = IERC20Tradable::buyCall {}.abi_encode();
		Transaction::call(from, self.address, data).with_value(amount)
	}

	pub fn sell(&self, from: Address, amount: U256) -> Transaction {
		let data = IERC20Tradable::sellCall { amount }.abi_encode();
		Transaction::call(from, self.address, data)
	}

	pub fn approve(&self, from: Address, spender: Address, amount: U256) -> Transaction {
		let data = IERC20Tradable::approveCall {
			spender: spender.into(),
			amount,
		}
		.abi_encode();
		Transaction::call(from, self.address, data)
	}

	pub fn balance_of(&self, from: Address, owner: Address) -> Transaction {
		let data = IERC20Tradable::balanceOfCall {
			owner: owner.into(),
		}
		.abi_encode();
		Transaction::call(from, self.address, data)
	}

	pub fn decode_balance(output: &[u8]) -> Result<U256, TokenError> {
		IERC20Tradable::balanceOfCall::abi_decode_returns(output)
			.map_err(|e| decode_error("balanceOf", e))
	}

	pub fn symbol(&self, from: Address) -> Transaction {
		Transaction::call(from, self.address, IERC20Tradable::symbolCall {}.abi_encode())
	}

	pub fn decode_symbol(output: &[u8]) -> Result<String, TokenError> {
		IERC20Tradable::symbolCall::abi_decode_returns(output).map_err(|e| decode_error("symbol", e))
	}
}

/// A registry contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryContract {
	pub address: Address,
}

impl RegistryContract {
	pub fn new(address: Address) -> Self {
		Self { address }
	}

	pub fn name(&self, from: Address) -> Transaction {
		Transaction::call(from, self.address, IRegistry::nameCall {}.abi_encode())
	}

	pub fn decode_name(output: &[u8]) -> Result<String, TokenError> {
		IRegistry::nameCall::abi_decode_returns(output).map_err(|e| decode_error("name", e))
	}

	pub fn token(&self, from: Address) -> Transaction {
		Transaction::call(from, self.address, IRegistry::tokenCall {}.abi_encode())
	}

	pub fn decode_token(output: &[u8]) -> Result<Address, TokenError> {
		IRegistry::tokenCall::abi_decode_returns(output)
			.map(Address::from)
			.map_err(|e| decode_error("token", e))
	}
}
