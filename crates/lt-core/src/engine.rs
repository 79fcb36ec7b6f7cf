//! The allocation engine: line-item state for one expense split.
//!
//! The engine owns the line items, the active [`SplitMode`] and the expense
//! total. Every operation is a synchronous computation over that state; the
//! engine performs no I/O.
//!
//! # Lifecycle
//!
//! 1. [`AllocationEngine::init`] generates one item per participant (or seeds
//!    from a saved allocation when editing in percent mode).
//! 2. The caller issues [`update_item`](AllocationEngine::update_item),
//!    [`add_item`](AllocationEngine::add_item),
//!    [`remove_item`](AllocationEngine::remove_item) and
//!    [`rebalance`](AllocationEngine::rebalance) commands. None of them
//!    touches sibling items implicitly.
//! 3. [`submit`](AllocationEngine::submit) validates and emits the finalized
//!    list, or nothing at all.

use rust_decimal::Decimal;

use crate::error::{EngineError, ValidationError};
use crate::item::{AllocationLineItem, FinalizedAllocation, ItemUpdate};
use crate::money::{
    MAX_VALUE, amount_for_percent, nearly_equal, percent_of, round2, split_evenly, within_range,
};
use crate::rebalance::rebalance;
use crate::types::{ExpenseContext, Participant, SplitMode};

/// Description given to generated items when the expense has no name.
pub const DEFAULT_DESCRIPTION: &str = "Expense";

/// Editable allocation state for a single expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationEngine {
    total_amount: Decimal,
    participants: Vec<Participant>,
    mode: SplitMode,
    items: Vec<AllocationLineItem>,
}

impl AllocationEngine {
    /// Creates an engine with the default item description.
    ///
    /// `existing` is only honoured in [`SplitMode::Percent`]; any other mode
    /// generates a fresh set of items.
    pub fn init(
        total_amount: Decimal,
        participants: Vec<Participant>,
        mode: SplitMode,
        existing: Option<Vec<AllocationLineItem>>,
    ) -> Self {
        Self::build(total_amount, DEFAULT_DESCRIPTION, participants, mode, existing)
    }

    /// Creates an engine for `expense`, using its name as the item description.
    pub fn init_for_expense(
        expense: &ExpenseContext,
        participants: Vec<Participant>,
        mode: SplitMode,
        existing: Option<Vec<AllocationLineItem>>,
    ) -> Self {
        let description = if expense.name.trim().is_empty() {
            DEFAULT_DESCRIPTION
        } else {
            expense.name.as_str()
        };
        Self::build(
            expense.total_amount,
            description,
            participants,
            mode,
            existing,
        )
    }

    fn build(
        total_amount: Decimal,
        description: &str,
        participants: Vec<Participant>,
        mode: SplitMode,
        existing: Option<Vec<AllocationLineItem>>,
    ) -> Self {
        let total_amount = round2(total_amount);

        let items = match existing {
            Some(saved) if mode == SplitMode::Percent && !saved.is_empty() => {
                tracing::debug!(items = saved.len(), "seeding allocation from saved items");
                seed_percents(saved, total_amount)
            }
            _ => generate(total_amount, description, &participants, mode),
        };

        tracing::debug!(
            %total_amount,
            %mode,
            participants = participants.len(),
            items = items.len(),
            "initialized allocation engine"
        );

        Self {
            total_amount,
            participants,
            mode,
            items,
        }
    }

    /// The expense total, rounded to cents.
    pub const fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub const fn mode(&self) -> SplitMode {
        self.mode
    }

    /// The participants eligible for this expense, in source order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// The current line items.
    pub fn items(&self) -> &[AllocationLineItem] {
        &self.items
    }

    /// What [`total`](Self::total) must reach: 100 in percent mode, the
    /// expense total otherwise.
    pub const fn target(&self) -> Decimal {
        match self.mode {
            SplitMode::Percent => Decimal::ONE_HUNDRED,
            SplitMode::Equal | SplitMode::Amount => self.total_amount,
        }
    }

    /// Sum of percents in percent mode, sum of amounts otherwise.
    pub fn total(&self) -> Decimal {
        match self.mode {
            SplitMode::Percent => self
                .items
                .iter()
                .map(|item| item.percent.unwrap_or(Decimal::ZERO))
                .sum(),
            SplitMode::Equal | SplitMode::Amount => {
                self.items.iter().map(|item| item.amount).sum()
            }
        }
    }

    /// Merges `update` into the item at `index`.
    ///
    /// In percent mode a new percent drives the amount and a new amount
    /// drives the percent. In amount mode the percent is recomputed for
    /// display only. Equal-mode shares are fixed; only participant,
    /// description and notes can change there.
    pub fn update_item(&mut self, index: usize, update: ItemUpdate) -> Result<(), EngineError> {
        let len = self.items.len();
        if index >= len {
            return Err(EngineError::IndexOutOfRange { index, len });
        }
        if self.mode == SplitMode::Equal && (update.amount.is_some() || update.percent.is_some())
        {
            return Err(EngineError::SharesLocked);
        }
        if update.amount.is_some_and(|amount| amount < Decimal::ZERO) {
            return Err(EngineError::NegativeValue { field: "amount" });
        }
        if update.percent.is_some_and(|percent| percent < Decimal::ZERO) {
            return Err(EngineError::NegativeValue { field: "percent" });
        }
        if update.amount.is_some_and(|amount| !within_range(amount)) {
            return Err(EngineError::ValueOutOfRange {
                field: "amount",
                max: MAX_VALUE,
            });
        }
        if update.percent.is_some_and(|percent| !within_range(percent)) {
            return Err(EngineError::ValueOutOfRange {
                field: "percent",
                max: MAX_VALUE,
            });
        }
        let participant_name = match &update.participant_id {
            Some(id) => Some(
                self.participants
                    .iter()
                    .find(|p| &p.id == id)
                    .map(|p| p.display_name.clone())
                    .ok_or_else(|| EngineError::UnknownParticipant { id: id.clone() })?,
            ),
            None => None,
        };

        let total_amount = self.total_amount;
        let mode = self.mode;
        let item = &mut self.items[index];

        if let Some(id) = update.participant_id {
            item.participant_id = Some(id);
        }
        if let Some(name) = participant_name {
            item.participant_name = name;
        }
        if let Some(description) = update.description {
            item.description = description;
        }
        if let Some(notes) = update.notes {
            item.notes = Some(notes);
        }

        if let Some(percent) = update.percent {
            let percent = round2(percent);
            item.percent = Some(percent);
            if mode == SplitMode::Percent {
                item.amount = amount_for_percent(total_amount, percent);
            }
        }
        if let Some(amount) = update.amount {
            let amount = round2(amount);
            item.amount = amount;
            if let Some(percent) = percent_of(amount, total_amount) {
                item.percent = Some(percent);
            }
        }

        Ok(())
    }

    /// Appends an item for the first eligible participant (or an unassigned
    /// item when there is none). Nothing is rebalanced.
    pub fn add_item(&mut self) {
        let mut item = AllocationLineItem::blank();
        if let Some(first) = self.participants.first() {
            item.participant_id = Some(first.id.clone());
            item.participant_name.clone_from(&first.display_name);
        }
        self.items.push(item);
    }

    /// Removes and returns the item at `index`. Nothing is rebalanced.
    pub fn remove_item(&mut self, index: usize) -> Result<AllocationLineItem, EngineError> {
        let len = self.items.len();
        if index >= len {
            return Err(EngineError::IndexOutOfRange { index, len });
        }
        Ok(self.items.remove(index))
    }

    /// Redistributes the gap between [`total`](Self::total) and
    /// [`target`](Self::target), preferring untouched (zero) items.
    ///
    /// A no-op in equal mode and when already balanced.
    pub fn rebalance(&mut self) {
        match self.mode {
            SplitMode::Equal => {}
            SplitMode::Percent => {
                let current: Vec<Decimal> = self
                    .items
                    .iter()
                    .map(|item| item.percent.unwrap_or(Decimal::ZERO))
                    .collect();
                let balanced = rebalance(&current, Decimal::ONE_HUNDRED);
                for ((item, before), after) in self.items.iter_mut().zip(current).zip(balanced) {
                    if before != after {
                        item.percent = Some(after);
                        item.amount = amount_for_percent(self.total_amount, after);
                    }
                }
            }
            SplitMode::Amount => {
                let current: Vec<Decimal> = self.items.iter().map(|item| item.amount).collect();
                let balanced = rebalance(&current, self.total_amount);
                for ((item, before), after) in self.items.iter_mut().zip(current).zip(balanced) {
                    if before != after {
                        item.amount = after;
                        item.percent = percent_of(after, self.total_amount);
                    }
                }
            }
        }
        tracing::debug!(mode = %self.mode, total = %self.total(), "rebalanced allocation");
    }

    /// Runs the submit checks without producing output.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::EmptyAllocation);
        }

        let total = self.total();
        match self.mode {
            SplitMode::Percent if !nearly_equal(total, Decimal::ONE_HUNDRED) => {
                return Err(ValidationError::PercentMismatch { total });
            }
            SplitMode::Amount if !nearly_equal(total, self.total_amount) => {
                return Err(ValidationError::AmountMismatch {
                    actual: total,
                    expected: self.total_amount,
                });
            }
            _ => {}
        }

        if let Some(index) = self
            .items
            .iter()
            .position(|item| item.description.trim().is_empty())
        {
            return Err(ValidationError::MissingDescription { index });
        }

        if let Some(index) = self
            .items
            .iter()
            .position(|item| item.participant_id.is_none())
        {
            return Err(ValidationError::MissingParticipant { index });
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Validates and returns the finalized allocation.
    ///
    /// Participant names are re-resolved from the current participant list;
    /// a participant that is no longer eligible keeps its cached name.
    pub fn submit(&self) -> Result<Vec<FinalizedAllocation>, ValidationError> {
        self.validate()?;

        let mut finalized = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.iter().enumerate() {
            let Some(participant_id) = item.participant_id.clone() else {
                return Err(ValidationError::MissingParticipant { index });
            };
            let participant_name = match self.participants.iter().find(|p| p.id == participant_id)
            {
                Some(participant) => participant.display_name.clone(),
                None => {
                    tracing::warn!(
                        participant = %participant_id,
                        cached_name = %item.participant_name,
                        "participant is no longer eligible, keeping cached name"
                    );
                    item.participant_name.clone()
                }
            };
            finalized.push(FinalizedAllocation {
                participant_id,
                participant_name,
                description: item.description.trim().to_string(),
                amount: round2(item.amount),
                notes: item
                    .notes
                    .as_deref()
                    .map(str::trim)
                    .filter(|notes| !notes.is_empty())
                    .map(String::from),
            });
        }
        Ok(finalized)
    }
}

/// Builds one item per participant for a fresh allocation.
fn generate(
    total_amount: Decimal,
    description: &str,
    participants: &[Participant],
    mode: SplitMode,
) -> Vec<AllocationLineItem> {
    if participants.is_empty() {
        return Vec::new();
    }

    let (amounts, percent) = match mode {
        SplitMode::Equal => (split_evenly(total_amount, participants.len()), None),
        SplitMode::Percent => {
            let percent = Decimal::ONE_HUNDRED / Decimal::from(participants.len());
            (
                split_evenly(total_amount, participants.len()),
                Some(percent),
            )
        }
        SplitMode::Amount => (vec![Decimal::ZERO; participants.len()], None),
    };

    participants
        .iter()
        .zip(amounts)
        .map(|(participant, amount)| AllocationLineItem {
            participant_id: Some(participant.id.clone()),
            participant_name: participant.display_name.clone(),
            description: description.to_string(),
            amount,
            percent,
            notes: None,
        })
        .collect()
}

/// Fills in percents missing from saved items from their amounts.
fn seed_percents(saved: Vec<AllocationLineItem>, total_amount: Decimal) -> Vec<AllocationLineItem> {
    saved
        .into_iter()
        .map(|mut item| {
            if item.percent.is_none() {
                item.percent = percent_of(item.amount, total_amount);
            }
            item
        })
        .collect()
}
