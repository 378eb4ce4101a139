//! Wallet session management.
//!
//! The [`AccountService`] owns the login state that every intent handler
//! snapshots before touching the chain. A provider that cannot produce an
//! address leaves the session logged out.

use alloy::network::EthereumWallet;
use async_trait::async_trait;
use tcr_types::{Account, Address, ConfigSchema};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

pub mod implementations {
	pub mod local;
}

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

#[async_trait]
pub trait AccountInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	async fn address(&self) -> Result<Address, AccountError>;

	/// Wallet used by delivery to sign outgoing transactions.
	fn wallet(&self) -> EthereumWallet;
}

pub struct AccountService {
	provider: Box<dyn AccountInterface>,
	session: RwLock<Account>,
}

impl AccountService {
	pub fn new(provider: Box<dyn AccountInterface>) -> Self {
		Self {
			provider,
			session: RwLock::new(Account::logged_out()),
		}
	}

	/// Unlocks the provider's address and marks the session logged in.
	pub async fn login(&self) -> Result<Account, AccountError> {
		let address = self.provider.address().await?;
		let account = Account::logged_in(address);
		*self.session.write().await = account.clone();

		info!(wallet = %address, "Logged in");
		Ok(account)
	}

	pub async fn logout(&self) {
		*self.session.write().await = Account::logged_out();
		info!("Logged out");
	}

	/// Current session, read at intent-handling time.
	pub async fn snapshot(&self) -> Account {
		self.session.read().await.clone()
	}

	pub fn wallet(&self) -> EthereumWallet {
		self.provider.wallet()
	}
}

/// Builds the provider named by the `provider` field of an account table.
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	let provider = config
		.get("provider")
		.and_then(|v| v.as_str())
		.unwrap_or("local");

	match provider {
		"local" => implementations::local::create_account(config),
		other => Err(AccountError::Configuration(format!(
			"Unknown account provider '{}'",
			other
		))),
	}
}
