//! Registry book types shared between the registry service and the UI
//! controllers.

use crate::Address;
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A token-curated registry known to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySet {
	pub address: Address,
	pub name: String,
	pub token_address: Address,
	pub token_symbol: String,
	/// Token balance of the session wallet, when one was available.
	#[serde(default)]
	pub balance: Option<U256>,
}

/// Snapshot of the registry book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
	/// True while an add-registry request is in flight.
	#[serde(skip)]
	pub loading: bool,
	pub data: BTreeMap<Address, RegistrySet>,
	pub failed_addresses: Vec<Address>,
}

impl RegistrySnapshot {
	pub fn contains(&self, address: &Address) -> bool {
		self.data.contains_key(address)
	}

	pub fn is_failed(&self, address: &Address) -> bool {
		self.failed_addresses.contains(address)
	}

	/// Registries as an ordered list, ready for rendering.
	pub fn sets(&self) -> Vec<&RegistrySet> {
		self.data.values().collect()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}
}
