//! Chain-call capability for the dashboard.
//!
//! [`DeliveryService`] is the single asynchronous completion contract used
//! by every intent: a transaction is submitted, then awaited until its
//! receipt is available. Both steps report failure through
//! [`DeliveryError`]; a mined but reverted transaction is a failure too.

use alloy::network::EthereumWallet;
use async_trait::async_trait;
use tcr_types::{ConfigSchema, Transaction, TransactionHash, TransactionReceipt};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

#[derive(Debug, Error)]
pub enum DeliveryError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("Transaction reverted: {0}")]
	Reverted(TransactionHash),
	#[error("Call failed: {0}")]
	Call(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Signs and broadcasts a transaction.
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError>;

	/// Waits until the transaction is mined with the requested confirmations.
	async fn wait_for_receipt(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError>;

	/// Read-only `eth_call`, returning the raw return data.
	async fn call(&self, tx: Transaction) -> Result<Vec<u8>, DeliveryError>;
}

pub struct DeliveryService {
	provider: Box<dyn DeliveryInterface>,
	confirmations: u64,
}

impl DeliveryService {
	pub fn new(provider: Box<dyn DeliveryInterface>, confirmations: u64) -> Self {
		Self {
			provider,
			confirmations,
		}
	}

	pub async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		debug!(to = %tx.to, from = %tx.from, "Submitting transaction");
		self.provider.submit(tx).await
	}

	/// Awaits the receipt, mapping an unsuccessful execution to
	/// [`DeliveryError::Reverted`].
	pub async fn confirm(&self, hash: &TransactionHash) -> Result<TransactionReceipt, DeliveryError> {
		let receipt = self.provider.wait_for_receipt(hash, self.confirmations).await?;

		if !receipt.success {
			warn!(tx_hash = %hash.truncated(), "Transaction reverted");
			return Err(DeliveryError::Reverted(hash.clone()));
		}

		info!(
			tx_hash = %hash.truncated(),
			block = receipt.block_number,
			"Transaction confirmed"
		);
		Ok(receipt)
	}

	pub async fn call(&self, tx: Transaction) -> Result<Vec<u8>, DeliveryError> {
		self.provider.call(tx).await
	}
}

/// Builds the delivery provider named by the `provider` field.
pub fn create_delivery(
	config: &toml::Value,
	wallet: EthereumWallet,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	let provider = config
		.get("provider")
		.and_then(|v| v.as_str())
		.unwrap_or("alloy");

	match provider {
		"alloy" => implementations::evm::alloy::create_http_delivery(config, wallet),
		other => Err(DeliveryError::Configuration(format!(
			"Unknown delivery provider '{}'",
			other
		))),
	}
}

/// Confirmations requested by a delivery table (default 1).
pub fn confirmations_from_config(config: &toml::Value) -> u64 {
	config
		.get("confirmations")
		.and_then(|v| v.as_integer())
		.map(|c| c.max(0) as u64)
		.unwrap_or(1)
}
