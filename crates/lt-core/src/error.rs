//! Errors raised by the allocation engine.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::ParticipantId;

/// Why an allocation cannot be submitted.
///
/// These are recoverable: the caller shows the message and lets the user keep
/// editing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no allocation items to save")]
    EmptyAllocation,

    #[error("total percentage must equal 100%, current: {total:.2}%")]
    PercentMismatch { total: Decimal },

    #[error("total amount must equal {expected:.2}, current: {actual:.2}")]
    AmountMismatch { actual: Decimal, expected: Decimal },

    #[error("item {index} is missing a description")]
    MissingDescription { index: usize },

    #[error("item {index} has no participant")]
    MissingParticipant { index: usize },
}

/// A mutation the engine refused to apply. The line items are left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("no allocation item at index {index} (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("participant {id} is not eligible for this expense")]
    UnknownParticipant { id: ParticipantId },

    #[error("{field} cannot be negative")]
    NegativeValue { field: &'static str },

    #[error("{field} exceeds the maximum of {max}")]
    ValueOutOfRange { field: &'static str, max: Decimal },

    #[error("shares cannot be edited in equal mode")]
    SharesLocked,
}
