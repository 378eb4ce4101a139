//! Registry address intake form.
//!
//! Owns the transient state of the "add registry" modal. It never awaits the
//! add-registry operation itself: the result is picked up from registry book
//! snapshots passed to [`IntakeController::observe`].

use tcr_types::{AddRegistry, Address, RegistrySnapshot, ADDRESS_LENGTH};
use tracing::debug;

pub const INVALID_ADDRESS: &str = "Please input a valid address";
pub const NOT_TCR_STANDARD: &str = "Address does not belong to TCR standard";
pub const ALREADY_IN_DASHBOARD: &str = "Address already in dashboard";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeState {
	pub open: bool,
	pub address: String,
	pub invalid_address: Option<String>,
}

#[derive(Debug, Default)]
pub struct IntakeController {
	state: IntakeState,
	/// Address of the emitted add-registry intent, until the book records it
	/// as added or failed.
	pending: Option<Address>,
	last_loading: bool,
	last_failed_len: usize,
}

impl IntakeController {
	/// Starts closed, remembering `snapshot` as the last observed book.
	pub fn new(snapshot: &RegistrySnapshot) -> Self {
		Self {
			state: IntakeState::default(),
			pending: None,
			last_loading: snapshot.loading,
			last_failed_len: snapshot.failed_addresses.len(),
		}
	}

	pub fn state(&self) -> &IntakeState {
		&self.state
	}

	pub fn open_modal(&mut self) {
		if !self.state.open {
			self.state.open = true;
		}
	}

	pub fn close_modal(&mut self) {
		if self.state.open {
			self.state = IntakeState::default();
			self.pending = None;
		}
	}

	/// Stores the input, cut to the length of a `0x`-prefixed address.
	pub fn handle_input(&mut self, raw: &str) {
		self.state.address = raw.chars().take(ADDRESS_LENGTH).collect();
	}

	/// Validates the held address against the book. Returns the intent to
	/// emit when the address is new; errors are left in the state.
	pub fn submit_address(&mut self, book: &RegistrySnapshot) -> Option<AddRegistry> {
		if book.loading {
			return None;
		}

		let Ok(address) = Address::parse(&self.state.address) else {
			self.state.invalid_address = Some(INVALID_ADDRESS.to_string());
			return None;
		};

		if book.is_failed(&address) {
			self.reject(NOT_TCR_STANDARD);
			return None;
		}

		if book.contains(&address) {
			self.reject(ALREADY_IN_DASHBOARD);
			return None;
		}

		self.state.invalid_address = None;
		self.pending = Some(address);
		debug!(registry = %address, "Submitting registry address");
		Some(AddRegistry { address })
	}

	/// Reacts to a registry book update. Both checks run on every update.
	///
	/// A pending submission counts as an observed loading phase while its
	/// address is still the one held, so updates that coalesce the whole
	/// request into one snapshot are still handled.
	pub fn observe(&mut self, book: &RegistrySnapshot) {
		let held = Address::parse(&self.state.address).ok();

		let awaiting_held = self.pending.is_some() && self.pending == held;
		let finished = (self.last_loading || awaiting_held) && !book.loading;
		if finished && self.state.open && held.is_some_and(|address| book.contains(&address)) {
			self.state.open = false;
			self.state.address.clear();
		}

		if book.failed_addresses.len() != self.last_failed_len
			&& held.is_some_and(|address| book.is_failed(&address))
		{
			self.reject(NOT_TCR_STANDARD);
		}

		if self
			.pending
			.is_some_and(|pending| book.contains(&pending) || book.is_failed(&pending))
		{
			self.pending = None;
		}

		self.last_loading = book.loading;
		self.last_failed_len = book.failed_addresses.len();
	}

	fn reject(&mut self, message: &str) {
		self.state.invalid_address = Some(message.to_string());
		self.state.address.clear();
	}
}
