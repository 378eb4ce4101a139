//! Ethereum address representation and validation.
//!
//! User-typed addresses arrive as strings, so validity is decided here once
//! and shared by the coordinator, the intake controller and the registry book.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a `0x`-prefixed 20-byte hex address.
pub const ADDRESS_LENGTH: usize = 42;

/// Errors produced when parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
	#[error("Invalid address: {0}")]
	Invalid(String),
}

/// 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
	/// Parses an address string, accepting it only when [`is_address`] holds.
	pub fn parse(value: &str) -> Result<Self, AddressError> {
		if !is_address(value) {
			return Err(AddressError::Invalid(value.to_string()));
		}

		let digits = strip_prefix(value);
		let mut bytes = [0u8; 20];
		hex::decode_to_slice(digits, &mut bytes)
			.map_err(|_| AddressError::Invalid(value.to_string()))?;

		Ok(Self(bytes))
	}

	/// EIP-55 mixed-case rendering.
	pub fn to_checksum(&self) -> String {
		alloy::primitives::Address::from(self.0).to_checksum(None)
	}
}

impl FromStr for Address {
	type Err = AddressError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(self.0))
	}
}

impl fmt::Debug for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Address({})", self)
	}
}

impl From<alloy::primitives::Address> for Address {
	fn from(addr: alloy::primitives::Address) -> Self {
		Self(addr.into_array())
	}
}

impl From<Address> for alloy::primitives::Address {
	fn from(addr: Address) -> Self {
		alloy::primitives::Address::from(addr.0)
	}
}

impl Serialize for Address {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for Address {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		Address::parse(&raw).map_err(de::Error::custom)
	}
}

/// Address-validity predicate.
///
/// Accepts an optional `0x` prefix followed by exactly 40 hex digits. Digits
/// that are all lowercase or all uppercase are accepted as-is; mixed case
/// must match the EIP-55 checksum.
pub fn is_address(value: &str) -> bool {
	let digits = strip_prefix(value);
	if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
		return false;
	}

	let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
	let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
	if !(has_lower && has_upper) {
		return true;
	}

	alloy::primitives::Address::parse_checksummed(format!("0x{}", digits), None).is_ok()
}

fn strip_prefix(value: &str) -> &str {
	value
		.strip_prefix("0x")
		.or_else(|| value.strip_prefix("0X"))
		.unwrap_or(value)
}
