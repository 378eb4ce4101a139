//! Transaction request coordinator.
//!
//! Turns authenticated intents into contract calls and reports the result.
//! Every intent that passes its preconditions yields exactly one
//! [`Outcome`]; an intent that fails them is dropped without one.

use std::sync::Arc;
use tcr_account::AccountService;
use tcr_delivery::{DeliveryError, DeliveryService};
use tcr_token::{parse_amount, TokenError, TradableToken};
use tcr_types::{
	is_address, Address, DashboardEvent, EventBus, IntentEvent, IntentKind, Outcome, Transaction,
	TransactionIntent, UiEvent,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a dispatched intent failed. Only logged; the outcome carries no reason.
#[derive(Debug, Error)]
enum CallFailure {
	#[error(transparent)]
	Setup(#[from] TokenError),
	#[error(transparent)]
	Delivery(#[from] DeliveryError),
}

pub struct TransactionCoordinator {
	account: Arc<AccountService>,
	delivery: Arc<DeliveryService>,
	event_bus: EventBus,
}

impl TransactionCoordinator {
	pub fn new(
		account: Arc<AccountService>,
		delivery: Arc<DeliveryService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			account,
			delivery,
			event_bus,
		}
	}

	/// Dispatches on the intent kind. `None` means the intent was dropped.
	pub async fn handle(&self, intent: TransactionIntent) -> Option<Outcome> {
		match intent.kind {
			IntentKind::Buy => self.handle_buy(intent).await,
			IntentKind::Sell => self.handle_sell(intent).await,
			IntentKind::ApproveAllowance => self.handle_approve_allowance(intent).await,
		}
	}

	/// Calls `buy()` with the amount as transferred value.
	pub async fn handle_buy(&self, intent: TransactionIntent) -> Option<Outcome> {
		let wallet = self.authenticated_wallet(&intent).await?;

		let built = TradableToken::from_input(&intent.token_address).and_then(|token| {
			let amount = parse_amount(&intent.amount)?;
			Ok(token.buy(wallet, amount))
		});

		Some(self.execute(intent, built).await)
	}

	/// Calls `sell(amount)`.
	pub async fn handle_sell(&self, intent: TransactionIntent) -> Option<Outcome> {
		let wallet = self.authenticated_wallet(&intent).await?;

		let built = TradableToken::from_input(&intent.token_address).and_then(|token| {
			let amount = parse_amount(&intent.amount)?;
			Ok(token.sell(wallet, amount))
		});

		Some(self.execute(intent, built).await)
	}

	/// Calls `approve(registry, amount)` on the token. Both addresses must be
	/// well formed, otherwise the intent is dropped. Success also asks the UI
	/// to close its modal.
	pub async fn handle_approve_allowance(&self, intent: TransactionIntent) -> Option<Outcome> {
		let wallet = self.authenticated_wallet(&intent).await?;

		let registry = intent
			.registry_address
			.clone()
			.filter(|registry| is_address(registry) && is_address(&intent.token_address));
		let Some(registry) = registry else {
			self.drop_intent(intent, "malformed token or registry address");
			return None;
		};

		let built = TradableToken::from_input(&intent.token_address).and_then(|token| {
			let spender = Address::parse(&registry)
				.map_err(|_| TokenError::InvalidAddress(registry.clone()))?;
			let amount = parse_amount(&intent.amount)?;
			Ok(token.approve(wallet, spender, amount))
		});

		let outcome = self.execute(intent, built).await;
		if outcome.is_success() {
			self.publish(DashboardEvent::Ui(UiEvent::CloseModal));
		}
		Some(outcome)
	}

	async fn authenticated_wallet(&self, intent: &TransactionIntent) -> Option<Address> {
		let wallet = self.account.snapshot().await.authenticated_address();
		if wallet.is_none() {
			self.drop_intent(intent.clone(), "account not authenticated");
		}
		wallet
	}

	/// Single attempt: submit, await the receipt, map to one outcome.
	async fn execute(
		&self,
		intent: TransactionIntent,
		built: Result<Transaction, TokenError>,
	) -> Outcome {
		let outcome = match self.submit_and_confirm(&intent, built).await {
			Ok(()) => {
				info!(kind = %intent.kind, token = %intent.token_address, "Intent succeeded");
				Outcome::success(intent)
			}
			Err(e) => {
				warn!(
					kind = %intent.kind,
					token = %intent.token_address,
					error = %e,
					"Intent failed"
				);
				Outcome::failure(intent)
			}
		};

		self.publish(DashboardEvent::Intent(IntentEvent::Completed(outcome.clone())));
		outcome
	}

	async fn submit_and_confirm(
		&self,
		intent: &TransactionIntent,
		built: Result<Transaction, TokenError>,
	) -> Result<(), CallFailure> {
		let tx = built?;
		let tx_hash = self.delivery.submit(tx).await?;

		self.publish(DashboardEvent::Intent(IntentEvent::Submitted {
			intent: intent.clone(),
			tx_hash: tx_hash.clone(),
		}));

		self.delivery.confirm(&tx_hash).await?;
		Ok(())
	}

	fn drop_intent(&self, intent: TransactionIntent, reason: &str) {
		debug!(kind = %intent.kind, reason, "Dropping intent");
		self.publish(DashboardEvent::Intent(IntentEvent::Dropped {
			intent,
			reason: reason.to_string(),
		}));
	}

	fn publish(&self, event: DashboardEvent) {
		self.event_bus.publish(event).ok();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::{
		logged_in_account, logged_out_account, MockDelivery, MockMode, REGISTRY, TOKEN,
	};
	use alloy::primitives::U256;
	use tcr_types::OutcomeKind;
	use tokio::sync::broadcast;

	fn setup(
		account: Arc<AccountService>,
		mode: MockMode,
	) -> (TransactionCoordinator, MockDelivery, broadcast::Receiver<DashboardEvent>) {
		let mock = MockDelivery::new(mode);
		let delivery = Arc::new(DeliveryService::new(Box::new(mock.clone()), 1));
		let bus = EventBus::new(32);
		let events = bus.subscribe();
		(TransactionCoordinator::new(account, delivery, bus), mock, events)
	}

	fn drain(events: &mut broadcast::Receiver<DashboardEvent>) -> Vec<DashboardEvent> {
		let mut out = Vec::new();
		while let Ok(event) = events.try_recv() {
			out.push(event);
		}
		out
	}

	fn completed(events: &[DashboardEvent]) -> Vec<Outcome> {
		events
			.iter()
			.filter_map(|e| match e {
				DashboardEvent::Intent(IntentEvent::Completed(o)) => Some(o.clone()),
				_ => None,
			})
			.collect()
	}

	#[tokio::test]
	async fn test_unauthenticated_intents_are_dropped() {
		let (coordinator, mock, mut events) =
			setup(logged_out_account().await, MockMode::Succeed);

		for intent in [
			TransactionIntent::buy(TOKEN, "100"),
			TransactionIntent::sell(TOKEN, "100"),
			TransactionIntent::approve_allowance(TOKEN, "100", REGISTRY),
		] {
			assert!(coordinator.handle(intent).await.is_none());
		}

		assert_eq!(mock.submitted().len(), 0);
		let events = drain(&mut events);
		assert!(completed(&events).is_empty());
		assert_eq!(events.len(), 3);
		assert!(events
			.iter()
			.all(|e| matches!(e, DashboardEvent::Intent(IntentEvent::Dropped { .. }))));
	}

	#[tokio::test]
	async fn test_buy_success_sends_value() {
		let (coordinator, mock, mut events) =
			setup(logged_in_account().await, MockMode::Succeed);
		let intent = TransactionIntent::buy(TOKEN, "250");

		let outcome = coordinator.handle_buy(intent.clone()).await.unwrap();

		assert_eq!(outcome, Outcome::success(intent));
		let submitted = mock.submitted();
		assert_eq!(submitted.len(), 1);
		assert_eq!(submitted[0].value, U256::from(250));
		assert_eq!(completed(&drain(&mut events)).len(), 1);
	}

	#[tokio::test]
	async fn test_sell_failure_yields_single_failure() {
		let (coordinator, mock, mut events) =
			setup(logged_in_account().await, MockMode::Revert);
		let intent = TransactionIntent::sell(TOKEN, "5");

		let outcome = coordinator.handle_sell(intent.clone()).await.unwrap();

		assert_eq!(outcome.kind, OutcomeKind::Failure);
		assert_eq!(outcome.intent, intent);
		assert_eq!(mock.submitted()[0].value, U256::ZERO);
		assert_eq!(completed(&drain(&mut events)), vec![Outcome::failure(intent)]);
	}

	#[tokio::test]
	async fn test_rejected_submission_is_failure() {
		let (coordinator, _mock, _events) =
			setup(logged_in_account().await, MockMode::RejectSubmit);
		let intent = TransactionIntent::buy(TOKEN, "1");

		let outcome = coordinator.handle(intent.clone()).await;
		assert_eq!(outcome, Some(Outcome::failure(intent)));
	}

	#[tokio::test]
	async fn test_setup_errors_map_to_failure_without_call() {
		let (coordinator, mock, _events) =
			setup(logged_in_account().await, MockMode::Succeed);

		let bad_amount = TransactionIntent::buy(TOKEN, "lots");
		assert_eq!(
			coordinator.handle(bad_amount.clone()).await,
			Some(Outcome::failure(bad_amount))
		);

		// Buy and sell do not pre-validate the token address.
		let bad_token = TransactionIntent::sell("0x1234", "1");
		assert_eq!(
			coordinator.handle(bad_token.clone()).await,
			Some(Outcome::failure(bad_token))
		);

		assert!(mock.submitted().is_empty());
	}

	#[tokio::test]
	async fn test_approve_requires_well_formed_addresses() {
		let (coordinator, mock, mut events) =
			setup(logged_in_account().await, MockMode::Succeed);

		let bad_registry = TransactionIntent::approve_allowance(TOKEN, "1", "0x1234");
		let bad_token = TransactionIntent::approve_allowance("0xabc", "1", REGISTRY);
		let mut no_registry = TransactionIntent::approve_allowance(TOKEN, "1", REGISTRY);
		no_registry.registry_address = None;

		for intent in [bad_registry, bad_token, no_registry] {
			assert!(coordinator.handle(intent).await.is_none());
		}

		assert!(mock.submitted().is_empty());
		assert!(completed(&drain(&mut events)).is_empty());
	}

	#[tokio::test]
	async fn test_approve_success_closes_modal() {
		let (coordinator, mock, mut events) =
			setup(logged_in_account().await, MockMode::Succeed);
		let intent = TransactionIntent::approve_allowance(TOKEN, "1000", REGISTRY);

		let outcome = coordinator.handle(intent.clone()).await;
		assert_eq!(outcome, Some(Outcome::success(intent)));
		assert_eq!(mock.submitted().len(), 1);

		let events = drain(&mut events);
		assert_eq!(completed(&events).len(), 1);
		assert_eq!(
			events
				.iter()
				.filter(|e| matches!(e, DashboardEvent::Ui(UiEvent::CloseModal)))
				.count(),
			1
		);
	}

	#[tokio::test]
	async fn test_approve_failure_keeps_modal_open() {
		let (coordinator, _mock, mut events) =
			setup(logged_in_account().await, MockMode::Revert);
		let intent = TransactionIntent::approve_allowance(TOKEN, "1000", REGISTRY);

		let outcome = coordinator.handle(intent.clone()).await;
		assert_eq!(outcome, Some(Outcome::failure(intent)));

		let events = drain(&mut events);
		assert_eq!(completed(&events).len(), 1);
		assert!(!events
			.iter()
			.any(|e| matches!(e, DashboardEvent::Ui(UiEvent::CloseModal))));
	}
}
