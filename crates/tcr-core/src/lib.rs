//! Dashboard core: the transaction request coordinator, the registry
//! address intake controller and the engine that connects them.

pub mod coordinator;
pub mod engine;
pub mod error;
pub mod intake;

#[cfg(test)]
pub(crate) mod test_utils;

pub use coordinator::TransactionCoordinator;
pub use engine::{DashboardEngine, IntentTicket};
pub use error::CoreError;
pub use intake::{IntakeController, IntakeState};
