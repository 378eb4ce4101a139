//! Registry book: the registries shown on the dashboard.
//!
//! The book lives in a `watch` channel so UI controllers can observe every
//! transition (loading flag, new registries, failed addresses) and is
//! persisted through [`StorageService`] after each change.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tcr_account::AccountService;
use tcr_storage::{StorageError, StorageService};
use tcr_types::{Address, DashboardEvent, EventBus, RegistryEvent, RegistrySet, RegistrySnapshot};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

pub mod implementations {
	pub mod chain;
}

const BOOK_NAMESPACE: &str = "registries";
const BOOK_ID: &str = "book";

#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("Address does not belong to TCR standard: {0}")]
	Inspection(String),
	#[error("Registry not found: {0}")]
	NotFound(Address),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// Reads a registry's metadata, failing when the address is not a TCR.
#[async_trait]
pub trait RegistryInspector: Send + Sync {
	async fn inspect(
		&self,
		registry: Address,
		holder: Option<Address>,
	) -> Result<RegistrySet, RegistryError>;
}

pub struct RegistryService {
	inspector: Box<dyn RegistryInspector>,
	storage: Arc<StorageService>,
	account: Arc<AccountService>,
	book: watch::Sender<RegistrySnapshot>,
	/// Add requests between raising and lowering the loading flag.
	in_flight: AtomicUsize,
	/// Orders writes so the stored book is never older than a prior write.
	persist_lock: Mutex<()>,
	event_bus: EventBus,
}

impl RegistryService {
	pub fn new(
		inspector: Box<dyn RegistryInspector>,
		storage: Arc<StorageService>,
		account: Arc<AccountService>,
		event_bus: EventBus,
	) -> Self {
		let (book, _) = watch::channel(RegistrySnapshot::default());
		Self {
			inspector,
			storage,
			account,
			book,
			in_flight: AtomicUsize::new(0),
			persist_lock: Mutex::new(()),
			event_bus,
		}
	}

	/// Restores the persisted book, if any.
	pub async fn load(&self) -> Result<(), RegistryError> {
		let stored: Option<RegistrySnapshot> = self
			.storage
			.retrieve_optional(BOOK_NAMESPACE, BOOK_ID)
			.await?;

		if let Some(mut snapshot) = stored {
			snapshot.loading = false;
			info!(
				registries = snapshot.data.len(),
				failed = snapshot.failed_addresses.len(),
				"Restored registry book"
			);
			self.book.send_replace(snapshot);
		}

		Ok(())
	}

	pub fn snapshot(&self) -> RegistrySnapshot {
		self.book.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<RegistrySnapshot> {
		self.book.subscribe()
	}

	/// Inspects `address` and records it as a registry or as failed.
	///
	/// The loading flag stays raised while any add is inspecting and is
	/// lowered in the same update that records the last result.
	pub async fn add_registry(&self, address: Address) -> Result<RegistrySet, RegistryError> {
		if let Some(existing) = self.book.borrow().data.get(&address) {
			debug!(registry = %address, "Registry already known");
			return Ok(existing.clone());
		}

		self.book.send_modify(|book| {
			self.in_flight.fetch_add(1, Ordering::SeqCst);
			book.loading = true;
		});
		self.publish(RegistryEvent::Requested { address });

		let holder = self.account.snapshot().await.authenticated_address();
		let result = self.inspector.inspect(address, holder).await;

		match &result {
			Ok(set) => {
				let set = set.clone();
				self.book.send_modify(|book| {
					book.failed_addresses.retain(|a| a != &address);
					book.data.insert(address, set);
					book.loading = self.finish_request();
				});
				info!(registry = %address, "Registry added");
				self.publish(RegistryEvent::Added { address });
			}
			Err(e) => {
				self.book.send_modify(|book| {
					if !book.failed_addresses.contains(&address) {
						book.failed_addresses.push(address);
					}
					book.loading = self.finish_request();
				});
				warn!(registry = %address, error = %e, "Registry rejected");
				self.publish(RegistryEvent::Failed {
					address,
					reason: e.to_string(),
				});
			}
		}

		self.persist().await?;
		result
	}

	pub async fn remove_registry(&self, address: Address) -> Result<RegistrySet, RegistryError> {
		let mut removed = None;
		self.book.send_if_modified(|book| {
			removed = book.data.remove(&address);
			removed.is_some()
		});

		let removed = removed.ok_or(RegistryError::NotFound(address))?;
		self.persist().await?;
		info!(registry = %address, "Registry removed");
		Ok(removed)
	}

	/// Re-reads every registry backed by `token`, refreshing balances after
	/// a trade. Returns the number of registries refreshed.
	pub async fn refresh_token(&self, token: Address) -> Result<usize, RegistryError> {
		let targets: Vec<Address> = self
			.book
			.borrow()
			.data
			.values()
			.filter(|set| set.token_address == token)
			.map(|set| set.address)
			.collect();

		let holder = self.account.snapshot().await.authenticated_address();
		let mut refreshed = 0;

		for address in targets {
			match self.inspector.inspect(address, holder).await {
				Ok(set) => {
					// Skip registries removed while the inspection ran.
					let updated = self.book.send_if_modified(|book| {
						match book.data.get_mut(&address) {
							Some(entry) => {
								*entry = set;
								true
							}
							None => false,
						}
					});
					if updated {
						self.publish(RegistryEvent::Refreshed { address });
						refreshed += 1;
					}
				}
				Err(e) => warn!(registry = %address, error = %e, "Refresh failed"),
			}
		}

		if refreshed > 0 {
			self.persist().await?;
		}
		Ok(refreshed)
	}

	/// Returns whether other adds are still in flight. Called inside the
	/// book update that records a result.
	fn finish_request(&self) -> bool {
		self.in_flight.fetch_sub(1, Ordering::SeqCst) > 1
	}

	async fn persist(&self) -> Result<(), RegistryError> {
		let _guard = self.persist_lock.lock().await;
		let snapshot = self.snapshot();
		self.storage
			.store(BOOK_NAMESPACE, BOOK_ID, &snapshot)
			.await
			.map_err(RegistryError::from)
	}

	fn publish(&self, event: RegistryEvent) {
		// Nobody listening is fine.
		self.event_bus.publish(DashboardEvent::Registry(event)).ok();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::U256;
	use std::collections::HashMap;
	use std::sync::atomic::AtomicBool;
	use std::sync::Mutex;
	use tcr_account::implementations::local::LocalWallet;
	use tcr_storage::implementations::file::FileStorage;
	use tcr_storage::implementations::memory::MemoryStorage;
	use tempfile::TempDir;
	use tokio::sync::Notify;

	const DEV_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

	/// Answers for a fixed set of registries; every other address fails.
	#[derive(Default)]
	struct StaticInspector {
		registries: Mutex<HashMap<Address, RegistrySet>>,
	}

	impl StaticInspector {
		fn with(sets: Vec<RegistrySet>) -> Self {
			Self {
				registries: Mutex::new(sets.into_iter().map(|s| (s.address, s)).collect()),
			}
		}
	}

	#[async_trait]
	impl RegistryInspector for StaticInspector {
		async fn inspect(
			&self,
			registry: Address,
			holder: Option<Address>,
		) -> Result<RegistrySet, RegistryError> {
			let mut set = self
				.registries
				.lock()
				.unwrap()
				.get(&registry)
				.cloned()
				.ok_or_else(|| RegistryError::Inspection("no name()".to_string()))?;
			set.balance = holder.map(|_| U256::from(10));
			Ok(set)
		}
	}

	/// Controls a [`GatedInspector`] from the test body.
	#[derive(Clone, Default)]
	struct Gate {
		armed: Arc<AtomicBool>,
		entered: Arc<Notify>,
		release: Arc<Notify>,
	}

	/// Holds inspections of one address until released, once armed.
	struct GatedInspector {
		inner: StaticInspector,
		gated: Address,
		gate: Gate,
	}

	#[async_trait]
	impl RegistryInspector for GatedInspector {
		async fn inspect(
			&self,
			registry: Address,
			holder: Option<Address>,
		) -> Result<RegistrySet, RegistryError> {
			if registry == self.gated && self.gate.armed.load(Ordering::SeqCst) {
				self.gate.entered.notify_one();
				self.gate.release.notified().await;
			}
			self.inner.inspect(registry, holder).await
		}
	}

	fn set(byte: u8, token: u8) -> RegistrySet {
		RegistrySet {
			address: Address([byte; 20]),
			name: format!("registry-{}", byte),
			token_address: Address([token; 20]),
			token_symbol: "TCR".to_string(),
			balance: None,
		}
	}

	fn service_with(
		inspector: impl RegistryInspector + 'static,
		storage: Arc<StorageService>,
	) -> (RegistryService, Arc<AccountService>) {
		let account = Arc::new(AccountService::new(Box::new(
			LocalWallet::new(DEV_KEY).unwrap(),
		)));
		let service = RegistryService::new(
			Box::new(inspector),
			storage,
			account.clone(),
			EventBus::new(16),
		);
		(service, account)
	}

	fn memory_storage() -> Arc<StorageService> {
		Arc::new(StorageService::new(Box::new(MemoryStorage::new())))
	}

	#[tokio::test]
	async fn test_add_known_registry() {
		let (service, _) = service_with(StaticInspector::with(vec![set(1, 9)]), memory_storage());
		let mut updates = service.subscribe();

		let added = service.add_registry(Address([1; 20])).await.unwrap();
		assert_eq!(added.name, "registry-1");

		let snapshot = updates.borrow_and_update().clone();
		assert!(!snapshot.loading);
		assert!(snapshot.contains(&Address([1; 20])));
		assert!(snapshot.failed_addresses.is_empty());
	}

	#[tokio::test]
	async fn test_non_tcr_address_is_recorded_once() {
		let (service, _) = service_with(StaticInspector::default(), memory_storage());

		assert!(service.add_registry(Address([5; 20])).await.is_err());
		assert!(service.add_registry(Address([5; 20])).await.is_err());

		let snapshot = service.snapshot();
		assert_eq!(snapshot.failed_addresses, vec![Address([5; 20])]);
		assert!(snapshot.data.is_empty());
		assert!(!snapshot.loading);
	}

	#[tokio::test]
	async fn test_book_survives_reload() {
		let storage = memory_storage();
		let (service, _) = service_with(StaticInspector::with(vec![set(1, 9)]), storage.clone());
		service.add_registry(Address([1; 20])).await.unwrap();
		service.add_registry(Address([2; 20])).await.unwrap_err();

		let (restored, _) = service_with(StaticInspector::default(), storage);
		restored.load().await.unwrap();

		let snapshot = restored.snapshot();
		assert!(snapshot.contains(&Address([1; 20])));
		assert!(snapshot.is_failed(&Address([2; 20])));
		assert!(!snapshot.loading);
	}

	#[tokio::test]
	async fn test_refresh_updates_balance_for_matching_token() {
		let (service, account) = service_with(
			StaticInspector::with(vec![set(1, 9), set(2, 8)]),
			memory_storage(),
		);
		service.add_registry(Address([1; 20])).await.unwrap();
		service.add_registry(Address([2; 20])).await.unwrap();
		assert_eq!(service.snapshot().data[&Address([1; 20])].balance, None);

		account.login().await.unwrap();
		let refreshed = service.refresh_token(Address([9; 20])).await.unwrap();

		assert_eq!(refreshed, 1);
		let snapshot = service.snapshot();
		assert_eq!(snapshot.data[&Address([1; 20])].balance, Some(U256::from(10)));
		assert_eq!(snapshot.data[&Address([2; 20])].balance, None);
	}

	#[tokio::test]
	async fn test_remove_registry() {
		let (service, _) = service_with(StaticInspector::with(vec![set(1, 9)]), memory_storage());
		service.add_registry(Address([1; 20])).await.unwrap();

		service.remove_registry(Address([1; 20])).await.unwrap();
		assert!(service.snapshot().is_empty());
		assert!(matches!(
			service.remove_registry(Address([1; 20])).await,
			Err(RegistryError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_overlapping_adds_keep_loading_raised() {
		let gate = Gate::default();
		gate.armed.store(true, Ordering::SeqCst);
		let inspector = GatedInspector {
			inner: StaticInspector::with(vec![set(1, 9), set(2, 9)]),
			gated: Address([1; 20]),
			gate: gate.clone(),
		};
		let (service, _) = service_with(inspector, memory_storage());
		let service = Arc::new(service);

		let slow = {
			let service = service.clone();
			tokio::spawn(async move { service.add_registry(Address([1; 20])).await })
		};
		gate.entered.notified().await;

		service.add_registry(Address([2; 20])).await.unwrap();
		let snapshot = service.snapshot();
		assert!(snapshot.loading);
		assert!(snapshot.contains(&Address([2; 20])));

		gate.release.notify_one();
		slow.await.unwrap().unwrap();
		let snapshot = service.snapshot();
		assert!(!snapshot.loading);
		assert!(snapshot.contains(&Address([1; 20])));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_adds_all_reach_disk() {
		let dir = TempDir::new().unwrap();
		let file_storage = || {
			Arc::new(StorageService::new(Box::new(FileStorage::new(
				dir.path().to_path_buf(),
			))))
		};

		let sets = (1..=40u8).map(|b| set(b, 9)).collect();
		let (service, _) = service_with(StaticInspector::with(sets), file_storage());
		let service = Arc::new(service);

		let mut adds = Vec::new();
		for b in 1..=40u8 {
			let service = service.clone();
			adds.push(tokio::spawn(async move {
				service.add_registry(Address([b; 20])).await
			}));
		}
		for add in adds {
			add.await.unwrap().unwrap();
		}
		assert!(!service.snapshot().loading);

		let (restored, _) = service_with(StaticInspector::default(), file_storage());
		restored.load().await.unwrap();
		assert_eq!(restored.snapshot().data.len(), 40);
	}

	#[tokio::test]
	async fn test_refresh_does_not_restore_removed_registry() {
		let gate = Gate::default();
		let inspector = GatedInspector {
			inner: StaticInspector::with(vec![set(1, 9)]),
			gated: Address([1; 20]),
			gate: gate.clone(),
		};
		let (service, _) = service_with(inspector, memory_storage());
		let service = Arc::new(service);
		service.add_registry(Address([1; 20])).await.unwrap();

		gate.armed.store(true, Ordering::SeqCst);
		let refresh = {
			let service = service.clone();
			tokio::spawn(async move { service.refresh_token(Address([9; 20])).await })
		};
		gate.entered.notified().await;

		service.remove_registry(Address([1; 20])).await.unwrap();
		gate.release.notify_one();

		assert_eq!(refresh.await.unwrap().unwrap(), 0);
		assert!(!service.snapshot().contains(&Address([1; 20])));
	}
}
