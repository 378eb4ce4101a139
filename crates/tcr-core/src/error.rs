use tcr_account::AccountError;
use tcr_delivery::DeliveryError;
use tcr_registry::RegistryError;
use tcr_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
	#[error("Account error: {0}")]
	Account(#[from] AccountError),

	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),

	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),

	#[error("Registry error: {0}")]
	Registry(#[from] RegistryError),

	#[error("Channel error: {0}")]
	Channel(String),
}
