//! Allocation line items and the records derived from them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ParticipantId;

/// One participant's share of an expense while it is being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLineItem {
    /// `None` when the item was added with no eligible participant to default to.
    pub participant_id: Option<ParticipantId>,
    /// Display name cached when the participant was selected.
    pub participant_name: String,
    pub description: String,
    pub amount: Decimal,
    /// Authoritative only in percent mode.
    pub percent: Option<Decimal>,
    pub notes: Option<String>,
}

impl AllocationLineItem {
    /// An empty, unassigned line item.
    pub fn blank() -> Self {
        Self {
            participant_id: None,
            participant_name: String::new(),
            description: String::new(),
            amount: Decimal::ZERO,
            percent: None,
            notes: None,
        }
    }
}

/// A partial update to one line item. Fields left as `None` are unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    pub participant_id: Option<ParticipantId>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub percent: Option<Decimal>,
    pub notes: Option<String>,
}

impl ItemUpdate {
    #[must_use]
    pub fn participant(mut self, id: ParticipantId) -> Self {
        self.participant_id = Some(id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn percent(mut self, percent: Decimal) -> Self {
        self.percent = Some(percent);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A validated share ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedAllocation {
    pub participant_id: ParticipantId,
    pub participant_name: String,
    pub description: String,
    pub amount: Decimal,
    pub notes: Option<String>,
}
