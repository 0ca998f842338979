//! Room entity, lifecycle state machine, and the registry that owns the
//! id → room mapping.

pub mod registry;
pub mod state;

pub use registry::{RoomRegistry, SharedRoom};
pub use state::{AdmitOutcome, PlayerState, Removal, Room};
