//! Alloy-based EVM delivery.
//!
//! Submits transactions through an HTTP provider that signs with the
//! session wallet, and polls for receipts until they are mined.

use crate::{DeliveryError, DeliveryInterface};
use ::alloy::network::{EthereumWallet, ReceiptResponse};
use ::alloy::primitives::FixedBytes;
use ::alloy::providers::{DynProvider, Provider, ProviderBuilder};
use ::alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::time::Duration;
use tcr_types::{
	http_url_validator, ConfigSchema, Field, FieldType, Schema, Transaction, TransactionHash,
	TransactionReceipt,
};

const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

pub struct AlloyDelivery {
	provider: DynProvider,
	chain_id: u64,
	poll_interval: Duration,
}

impl AlloyDelivery {
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		wallet: EthereumWallet,
		poll_interval: Duration,
	) -> Result<Self, DeliveryError> {
		let url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::Configuration(format!("Invalid RPC URL: {}", e)))?;

		let provider = ProviderBuilder::new()
			.wallet(wallet)
			.connect_http(url)
			.erased();

		Ok(Self {
			provider,
			chain_id,
			poll_interval,
		})
	}

	fn request(&self, mut tx: Transaction) -> TransactionRequest {
		tx.chain_id.get_or_insert(self.chain_id);
		tx.into()
	}
}

pub struct AlloyDeliverySchema;

impl ConfigSchema for AlloyDeliverySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), tcr_types::ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("rpc_url", FieldType::String).with_validator(http_url_validator),
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
			],
			vec![
				Field::new("provider", FieldType::String),
				Field::new(
					"confirmations",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
				Field::new(
					"poll_interval_ms",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyDeliverySchema)
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let request = self.request(tx);

		let pending_tx = self.provider.send_transaction(request).await.map_err(|e| {
			DeliveryError::Network(format!("Failed to send transaction: {}", e))
		})?;

		let hash = TransactionHash(pending_tx.tx_hash().0.to_vec());
		tracing::info!(tx_hash = %hash.truncated(), "Submitted transaction");

		Ok(hash)
	}

	// No deadline: a transaction that is never mined keeps the caller pending.
	async fn wait_for_receipt(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		if hash.0.len() != 32 {
			return Err(DeliveryError::Network(format!(
				"Malformed transaction hash {}",
				hash
			)));
		}
		let tx_hash = FixedBytes::<32>::from_slice(&hash.0);

		tracing::debug!(
			tx_hash = %hash.truncated(),
			"Waiting for {} confirmations",
			confirmations
		);

		loop {
			let receipt = match self.provider.get_transaction_receipt(tx_hash).await {
				Ok(Some(receipt)) => receipt,
				Ok(None) => {
					tokio::time::sleep(self.poll_interval).await;
					continue;
				}
				Err(e) => {
					return Err(DeliveryError::Network(format!(
						"Failed to get receipt: {}",
						e
					)));
				}
			};

			let tx_block = receipt.block_number().unwrap_or(0);
			let current_block = self.provider.get_block_number().await.map_err(|e| {
				DeliveryError::Network(format!("Failed to get block number: {}", e))
			})?;

			// The inclusion block counts as the first confirmation.
			let current_confirmations = current_block.saturating_sub(tx_block) + 1;
			if current_confirmations >= confirmations {
				return Ok(TransactionReceipt {
					hash: TransactionHash(receipt.transaction_hash().0.to_vec()),
					block_number: tx_block,
					success: receipt.status(),
				});
			}

			tokio::time::sleep(self.poll_interval).await;
		}
	}

	async fn call(&self, tx: Transaction) -> Result<Vec<u8>, DeliveryError> {
		let request = self.request(tx);

		let output = self
			.provider
			.call(request)
			.await
			.map_err(|e| DeliveryError::Call(e.to_string()))?;

		Ok(output.to_vec())
	}
}

/// Creates an HTTP delivery provider from a delivery table.
///
/// Required configuration parameters:
/// - `rpc_url`: the HTTP RPC endpoint URL
/// - `chain_id`: the network chain ID
///
/// Optional: `poll_interval_ms` (receipt polling, default 2000).
pub fn create_http_delivery(
	config: &toml::Value,
	wallet: EthereumWallet,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	AlloyDeliverySchema
		.validate(config)
		.map_err(|e| DeliveryError::Configuration(e.to_string()))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| DeliveryError::Configuration("rpc_url is required".to_string()))?;

	let chain_id = config
		.get("chain_id")
		.and_then(|v| v.as_integer())
		.ok_or_else(|| DeliveryError::Configuration("chain_id is required".to_string()))?
		as u64;

	let poll_interval = config
		.get("poll_interval_ms")
		.and_then(|v| v.as_integer())
		.map(|ms| ms as u64)
		.unwrap_or(DEFAULT_POLL_INTERVAL_MS);

	Ok(Box::new(AlloyDelivery::new(
		rpc_url,
		chain_id,
		wallet,
		Duration::from_millis(poll_interval),
	)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use ::alloy::signers::local::PrivateKeySigner;

	fn wallet() -> EthereumWallet {
		let signer: PrivateKeySigner =
			"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
				.parse()
				.unwrap();
		EthereumWallet::from(signer)
	}

	#[test]
	fn test_factory_requires_chain_id() {
		let config: toml::Value = toml::from_str(r#"rpc_url = "http://localhost:8545""#).unwrap();
		assert!(matches!(
			create_http_delivery(&config, wallet()),
			Err(DeliveryError::Configuration(_))
		));
	}

	#[test]
	fn test_factory_rejects_websocket_url() {
		let config: toml::Value = toml::from_str(
			r#"
rpc_url = "ws://localhost:8546"
chain_id = 1337
"#,
		)
		.unwrap();
		assert!(create_http_delivery(&config, wallet()).is_err());
	}

	#[test]
	fn test_factory_builds_http_provider() {
		let config: toml::Value = toml::from_str(
			r#"
rpc_url = "http://localhost:8545"
chain_id = 1337
poll_interval_ms = 100
"#,
		)
		.unwrap();
		assert!(create_http_delivery(&config, wallet()).is_ok());
	}
}
