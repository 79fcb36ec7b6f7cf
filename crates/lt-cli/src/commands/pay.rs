//! `lt pay`: record a repayment against an allocation line.

use std::io::Write;

use anyhow::{Context, Result, bail};
use lt_core::AllocationPaymentStatus;
use lt_core::money::{MAX_VALUE, round2, within_range};
use lt_db::Database;
use rust_decimal::Decimal;

use super::util::money;

/// Records `amount` against `allocation_id` and prints the new balance.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    allocation_id: &str,
    amount: Decimal,
) -> Result<()> {
    if !within_range(amount) {
        bail!("payment amount exceeds the maximum of {MAX_VALUE}");
    }
    let amount = round2(amount);
    if amount <= Decimal::ZERO {
        bail!("payment amount must be positive, got {amount}");
    }

    let before = db.get_allocation(allocation_id)?;
    let entry = db.get_entry(&before.entry_id)?;
    if amount > before.remaining() {
        tracing::warn!(
            allocation = allocation_id,
            %amount,
            remaining = %before.remaining(),
            "payment exceeds remaining balance"
        );
    }

    db.record_payment(allocation_id, amount)
        .context("failed to record payment")?;
    let after = db.get_allocation(allocation_id)?;
    let status = AllocationPaymentStatus::compute(after.amount, after.paid, entry.settled);

    writeln!(
        writer,
        "Recorded {} from {} for {}: {} of {} paid, {} remaining ({status})",
        money(amount),
        after.person_name,
        entry.name,
        money(after.paid),
        money(after.amount),
        money(after.remaining())
    )?;
    Ok(())
}
