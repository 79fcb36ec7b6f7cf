//! One allocation-editing session wired to its collaborators.
//!
//! Creating a new split and editing a saved one share this code path; the
//! only difference is whether the store has something to seed from.

use thiserror::Error;

use crate::engine::AllocationEngine;
use crate::error::ValidationError;
use crate::item::FinalizedAllocation;
use crate::store::{AllocationStore, ParticipantSource};
use crate::types::{ExpenseContext, ExpenseId, SplitMode};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The participant source failed.
    #[error("failed to load eligible participants")]
    Participants(#[source] BoxError),

    /// The saved allocation could not be loaded.
    #[error("failed to load saved allocation")]
    Load(#[source] BoxError),

    /// The allocation did not pass validation; nothing was persisted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store rejected the finalized allocation. Not retried.
    #[error("failed to persist allocation")]
    Persistence(#[source] BoxError),
}

/// Opens an engine for `expense`.
///
/// Saved allocations are only loaded in percent mode, where editing starts
/// from the previous split.
pub fn start<P, S>(
    source: &P,
    store: &S,
    expense: &ExpenseContext,
    mode: SplitMode,
) -> Result<AllocationEngine, SessionError>
where
    P: ParticipantSource,
    S: AllocationStore,
{
    let participants = source
        .list_eligible(expense)
        .map_err(|e| SessionError::Participants(Box::new(e)))?;

    let existing = if mode == SplitMode::Percent {
        let saved = store
            .load_existing(&expense.expense_id)
            .map_err(|e| SessionError::Load(Box::new(e)))?;
        Some(saved)
    } else {
        None
    };

    if participants.is_empty() {
        tracing::debug!(expense = %expense.expense_id, "no eligible participants");
    }

    Ok(AllocationEngine::init_for_expense(
        expense,
        participants,
        mode,
        existing,
    ))
}

/// Submits `engine` and hands the result to `store`.
///
/// Validation failures return before the store is touched.
pub fn commit<S>(
    engine: &AllocationEngine,
    store: &mut S,
    expense_id: &ExpenseId,
) -> Result<Vec<FinalizedAllocation>, SessionError>
where
    S: AllocationStore,
{
    let finalized = engine.submit()?;
    store
        .replace_all(expense_id, &finalized)
        .map_err(|e| SessionError::Persistence(Box::new(e)))?;
    tracing::debug!(
        expense = %expense_id,
        items = finalized.len(),
        "committed allocation"
    );
    Ok(finalized)
}
