//! Shared types for the TCR dashboard crates.

pub mod account;
pub mod address;
pub mod delivery;
pub mod events;
pub mod intent;
pub mod registry;
pub mod validation;

pub use account::*;
pub use address::*;
pub use delivery::*;
pub use events::*;
pub use intent::*;
pub use registry::*;
pub use validation::*;
