//! Dashboard engine: intent queue, coordinator tasks and wiring.

use crate::{CoreError, TransactionCoordinator};
use std::sync::Arc;
use tcr_account::{create_account, AccountService};
use tcr_config::Config;
use tcr_delivery::{confirmations_from_config, create_delivery, DeliveryService};
use tcr_registry::implementations::chain::ChainRegistryInspector;
use tcr_registry::RegistryService;
use tcr_storage::{create_storage, StorageService};
use tcr_types::{
	Account, AddRegistry, Address, DashboardEvent, EventBus, IntentKind, Outcome, RegistrySet,
	TransactionIntent,
};
use tokio::sync::{broadcast, mpsc, oneshot, Mutex, Notify};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

struct QueuedIntent {
	intent: TransactionIntent,
	reply: oneshot::Sender<Option<Outcome>>,
}

/// Handle to the result of a submitted intent.
pub struct IntentTicket {
	receiver: oneshot::Receiver<Option<Outcome>>,
}

impl IntentTicket {
	/// Resolves once the intent is handled; `None` means it was dropped.
	pub async fn outcome(self) -> Result<Option<Outcome>, CoreError> {
		self.receiver
			.await
			.map_err(|_| CoreError::Channel("engine stopped before replying".to_string()))
	}
}

pub struct DashboardEngine {
	account: Arc<AccountService>,
	coordinator: Arc<TransactionCoordinator>,
	registry: Arc<RegistryService>,
	event_bus: EventBus,
	intent_tx: mpsc::Sender<QueuedIntent>,
	intent_rx: Mutex<Option<mpsc::Receiver<QueuedIntent>>>,
	shutdown: Notify,
}

impl DashboardEngine {
	pub fn new(
		account: Arc<AccountService>,
		delivery: Arc<DeliveryService>,
		registry: Arc<RegistryService>,
		event_bus: EventBus,
		queue_size: usize,
	) -> Self {
		let coordinator = Arc::new(TransactionCoordinator::new(
			account.clone(),
			delivery,
			event_bus.clone(),
		));
		let (intent_tx, intent_rx) = mpsc::channel(queue_size);

		Self {
			account,
			coordinator,
			registry,
			event_bus,
			intent_tx,
			intent_rx: Mutex::new(Some(intent_rx)),
			shutdown: Notify::new(),
		}
	}

	/// Builds every service from configuration.
	pub fn from_config(config: &Config) -> Result<Self, CoreError> {
		let event_bus = EventBus::new(config.engine.event_bus_capacity);

		let account = Arc::new(AccountService::new(create_account(&config.account)?));
		let delivery = Arc::new(DeliveryService::new(
			create_delivery(&config.delivery, account.wallet())?,
			confirmations_from_config(&config.delivery),
		));
		let storage = Arc::new(StorageService::new(create_storage(&config.storage)?));

		let registry = Arc::new(RegistryService::new(
			Box::new(ChainRegistryInspector::new(delivery.clone())),
			storage,
			account.clone(),
			event_bus.clone(),
		));

		Ok(Self::new(
			account,
			delivery,
			registry,
			event_bus,
			config.engine.intent_queue_size,
		))
	}

	pub async fn login(&self) -> Result<Account, CoreError> {
		Ok(self.account.login().await?)
	}

	pub async fn logout(&self) {
		self.account.logout().await;
	}

	pub fn registry(&self) -> &Arc<RegistryService> {
		&self.registry
	}

	pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
		self.event_bus.subscribe()
	}

	/// Restores persisted state.
	pub async fn load(&self) -> Result<(), CoreError> {
		Ok(self.registry.load().await?)
	}

	/// Queues an intent and returns a ticket for its outcome.
	pub async fn submit(&self, intent: TransactionIntent) -> Result<IntentTicket, CoreError> {
		let (reply, receiver) = oneshot::channel();
		self.intent_tx
			.send(QueuedIntent { intent, reply })
			.await
			.map_err(|_| CoreError::Channel("intent queue closed".to_string()))?;
		Ok(IntentTicket { receiver })
	}

	pub async fn add_registry(&self, request: AddRegistry) -> Result<RegistrySet, CoreError> {
		Ok(self.registry.add_registry(request.address).await?)
	}

	/// Stops [`run`](Self::run). Calls already submitted to the chain keep
	/// running to completion.
	pub fn shutdown(&self) {
		self.shutdown.notify_one();
	}

	/// Processes queued intents until [`shutdown`](Self::shutdown).
	///
	/// Each intent runs in its own task; intents for the same token are not
	/// serialised against each other.
	pub async fn run(&self) -> Result<(), CoreError> {
		let mut intent_rx = self
			.intent_rx
			.lock()
			.await
			.take()
			.ok_or_else(|| CoreError::Channel("engine is already running".to_string()))?;

		let mut tasks = JoinSet::new();
		info!("Dashboard engine started");

		loop {
			tokio::select! {
				biased;

				_ = self.shutdown.notified() => {
					break;
				}

				Some(queued) = intent_rx.recv() => {
					let coordinator = self.coordinator.clone();
					let registry = self.registry.clone();
					tasks.spawn(handle_intent(coordinator, registry, queued));
				}

				Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
					if let Err(e) = joined {
						error!(error = %e, "Intent task aborted");
					}
				}
			}
		}

		// Queued but unstarted intents are discarded; their tickets resolve
		// with a channel error.
		let mut discarded = 0usize;
		while intent_rx.try_recv().is_ok() {
			discarded += 1;
		}
		if discarded > 0 {
			warn!(discarded, "Discarded queued intents on shutdown");
		}

		if !tasks.is_empty() {
			warn!(in_flight = tasks.len(), "Leaving in-flight intents running");
			tasks.detach_all();
		}

		*self.intent_rx.lock().await = Some(intent_rx);
		info!("Dashboard engine stopped");
		Ok(())
	}
}

async fn handle_intent(
	coordinator: Arc<TransactionCoordinator>,
	registry: Arc<RegistryService>,
	queued: QueuedIntent,
) {
	let outcome = coordinator.handle(queued.intent).await;

	// The submitter may have stopped waiting.
	queued.reply.send(outcome.clone()).ok();

	// Trades change the wallet's balance of the traded token.
	let Some(outcome) = outcome else { return };
	if !outcome.is_success() || outcome.intent.kind == IntentKind::ApproveAllowance {
		return;
	}
	if let Ok(token) = Address::parse(&outcome.intent.token_address) {
		if let Err(e) = registry.refresh_token(token).await {
			warn!(token = %token, error = %e, "Balance refresh failed");
		}
	}
}
