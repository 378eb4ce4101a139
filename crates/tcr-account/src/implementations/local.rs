//! Local private-key wallet backed by Alloy's signer.

use crate::{AccountError, AccountInterface};
use alloy::network::EthereumWallet;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tcr_types::{private_key_validator, Address, ConfigSchema, Field, FieldType, Schema};

pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a wallet from a hex-encoded private key (with or without 0x).
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;

		Ok(Self { signer })
	}
}

pub struct LocalWalletSchema;

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), tcr_types::ValidationError> {
		let schema = Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(private_key_validator)],
			vec![Field::new("provider", FieldType::String)],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalWalletSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address().into())
	}

	fn wallet(&self) -> EthereumWallet {
		EthereumWallet::from(self.signer.clone())
	}
}

/// Creates a local wallet from an account table.
///
/// Required configuration parameters:
/// - `private_key`: 32-byte hex private key
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalWalletSchema
		.validate(config)
		.map_err(|e| AccountError::Configuration(e.to_string()))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::Configuration("private_key is required".to_string()))?;

	Ok(Box::new(LocalWallet::new(private_key)?))
}
