//! Collaborator boundaries the engine is driven through.
//!
//! These traits let a session work against different backends (e.g., the
//! SQLite `Database` from lt-db, or in-memory fixtures in tests).

use crate::item::{AllocationLineItem, FinalizedAllocation};
use crate::types::{ExpenseContext, ExpenseId, Participant};

/// Supplies the people who may receive a share of an expense.
pub trait ParticipantSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the eligible participants for `expense`, in display order.
    fn list_eligible(&self, expense: &ExpenseContext) -> Result<Vec<Participant>, Self::Error>;
}

/// Persists finalized allocations and loads saved ones for editing.
pub trait AllocationStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the saved allocation for `expense_id`, empty if there is none.
    fn load_existing(&self, expense_id: &ExpenseId)
    -> Result<Vec<AllocationLineItem>, Self::Error>;

    /// Replaces every saved line for `expense_id` with `allocations`.
    ///
    /// Implementations must apply this atomically: either all old lines are
    /// replaced or none are.
    fn replace_all(
        &mut self,
        expense_id: &ExpenseId,
        allocations: &[FinalizedAllocation],
    ) -> Result<(), Self::Error>;
}
