//! Core domain logic for the loan tracker.
//!
//! This crate contains the expense allocation engine:
//! - Engine: line-item state for splitting one expense (equal, percent, amount)
//! - Rebalance: normalizing shares back to 100% or the full amount
//! - Session: wiring the engine to participant and allocation stores
//! - Status: repayment status of persisted allocation lines

mod engine;
mod error;
mod item;
pub mod money;
mod rebalance;
pub mod session;
pub mod status;
mod store;
pub mod types;

pub use engine::{AllocationEngine, DEFAULT_DESCRIPTION};
pub use error::{EngineError, ValidationError};
pub use item::{AllocationLineItem, FinalizedAllocation, ItemUpdate};
pub use rebalance::rebalance;
pub use session::SessionError;
pub use status::AllocationPaymentStatus;
pub use store::{AllocationStore, ParticipantSource};
pub use types::{
    ExpenseContext, ExpenseId, GroupId, InvalidInput, Participant, ParticipantId, SplitMode,
};
