//! Shared test doubles.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tcr_account::implementations::local::LocalWallet;
use tcr_account::AccountService;
use tcr_delivery::implementations::evm::alloy::AlloyDeliverySchema;
use tcr_delivery::{DeliveryError, DeliveryInterface};
use tcr_registry::{RegistryError, RegistryInspector};
use tcr_types::{Address, ConfigSchema, RegistrySet, Transaction, TransactionHash, TransactionReceipt};

pub const DEV_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const TOKEN: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
pub const REGISTRY: &str = "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359";

#[derive(Debug, Clone, Copy)]
pub enum MockMode {
	Succeed,
	Revert,
	RejectSubmit,
}

/// Records submissions and answers according to its mode.
#[derive(Clone)]
pub struct MockDelivery {
	mode: MockMode,
	submitted: Arc<Mutex<Vec<Transaction>>>,
}

impl MockDelivery {
	pub fn new(mode: MockMode) -> Self {
		Self {
			mode,
			submitted: Arc::new(Mutex::new(Vec::new())),
		}
	}

	pub fn submitted(&self) -> Vec<Transaction> {
		self.submitted.lock().unwrap().clone()
	}
}

#[async_trait]
impl DeliveryInterface for MockDelivery {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyDeliverySchema)
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		if let MockMode::RejectSubmit = self.mode {
			return Err(DeliveryError::Network("User denied transaction signature".into()));
		}
		let mut submitted = self.submitted.lock().unwrap();
		submitted.push(tx);
		Ok(TransactionHash(vec![submitted.len() as u8; 32]))
	}

	async fn wait_for_receipt(
		&self,
		hash: &TransactionHash,
		_confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		Ok(TransactionReceipt {
			hash: hash.clone(),
			block_number: 1,
			success: !matches!(self.mode, MockMode::Revert),
		})
	}

	async fn call(&self, _tx: Transaction) -> Result<Vec<u8>, DeliveryError> {
		Err(DeliveryError::Call("execution reverted".into()))
	}
}

/// Inspector that knows a fixed set of registries and counts lookups.
#[derive(Clone, Default)]
pub struct MockInspector {
	registries: Arc<Mutex<HashMap<Address, RegistrySet>>>,
	lookups: Arc<Mutex<usize>>,
}

impl MockInspector {
	pub fn with_registry(self, registry: &str, token: &str) -> Self {
		let address = Address::parse(registry).unwrap();
		self.registries.lock().unwrap().insert(
			address,
			RegistrySet {
				address,
				name: "Test Registry".to_string(),
				token_address: Address::parse(token).unwrap(),
				token_symbol: "TST".to_string(),
				balance: None,
			},
		);
		self
	}

	pub fn lookups(&self) -> usize {
		*self.lookups.lock().unwrap()
	}
}

#[async_trait]
impl RegistryInspector for MockInspector {
	async fn inspect(
		&self,
		registry: Address,
		_holder: Option<Address>,
	) -> Result<RegistrySet, RegistryError> {
		*self.lookups.lock().unwrap() += 1;
		self.registries
			.lock()
			.unwrap()
			.get(&registry)
			.cloned()
			.ok_or_else(|| RegistryError::Inspection("name() reverted".to_string()))
	}
}

pub async fn logged_out_account() -> Arc<AccountService> {
	Arc::new(AccountService::new(Box::new(LocalWallet::new(DEV_KEY).unwrap())))
}

pub async fn logged_in_account() -> Arc<AccountService> {
	let account = logged_out_account().await;
	account.login().await.unwrap();
	account
}
