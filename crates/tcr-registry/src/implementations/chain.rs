//! Registry inspection over `eth_call`.

use crate::{RegistryError, RegistryInspector};
use async_trait::async_trait;
use std::sync::Arc;
use tcr_delivery::DeliveryService;
use tcr_token::{RegistryContract, TradableToken};
use tcr_types::{Address, RegistrySet};

/// Reads registry metadata straight from the chain.
///
/// A contract that does not answer `name()` and `token()` is not a TCR.
pub struct ChainRegistryInspector {
	delivery: Arc<DeliveryService>,
}

impl ChainRegistryInspector {
	pub fn new(delivery: Arc<DeliveryService>) -> Self {
		Self { delivery }
	}

	async fn read(&self, tx: tcr_types::Transaction) -> Result<Vec<u8>, RegistryError> {
		self.delivery
			.call(tx)
			.await
			.map_err(|e| RegistryError::Inspection(e.to_string()))
	}
}

#[async_trait]
impl RegistryInspector for ChainRegistryInspector {
	async fn inspect(
		&self,
		registry: Address,
		holder: Option<Address>,
	) -> Result<RegistrySet, RegistryError> {
		let from = holder.unwrap_or(Address([0u8; 20]));
		let contract = RegistryContract::new(registry);

		let name = RegistryContract::decode_name(&self.read(contract.name(from)).await?)
			.map_err(|e| RegistryError::Inspection(e.to_string()))?;
		let token_address = RegistryContract::decode_token(&self.read(contract.token(from)).await?)
			.map_err(|e| RegistryError::Inspection(e.to_string()))?;

		let token = TradableToken::new(token_address);
		let token_symbol = TradableToken::decode_symbol(&self.read(token.symbol(from)).await?)
			.map_err(|e| RegistryError::Inspection(e.to_string()))?;

		let balance = match holder {
			Some(owner) => Some(
				TradableToken::decode_balance(&self.read(token.balance_of(from, owner)).await?)
					.map_err(|e| RegistryError::Inspection(e.to_string()))?,
			),
			None => None,
		};

		Ok(RegistrySet {
			address: registry,
			name,
			token_address,
			token_symbol,
			balance,
		})
	}
}
