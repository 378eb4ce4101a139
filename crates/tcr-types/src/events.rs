use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{Address, Outcome, TransactionHash, TransactionIntent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DashboardEvent {
	Intent(IntentEvent),
	Registry(RegistryEvent),
	Ui(UiEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IntentEvent {
	/// Precondition failed; no outcome will follow.
	Dropped {
		intent: TransactionIntent,
		reason: String,
	},
	Submitted {
		intent: TransactionIntent,
		tx_hash: TransactionHash,
	},
	Completed(Outcome),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegistryEvent {
	Requested { address: Address },
	Added { address: Address },
	Failed { address: Address, reason: String },
	Refreshed { address: Address },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiEvent {
	CloseModal,
}

pub struct EventBus {
	sender: broadcast::Sender<DashboardEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
		self.sender.subscribe()
	}

	/// Publishes to current subscribers. Fails only when nobody is listening.
	pub fn publish(
		&self,
		event: DashboardEvent,
	) -> Result<(), broadcast::error::SendError<DashboardEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}
