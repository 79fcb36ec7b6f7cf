//! `lt allocations`: the saved split of an entry and what has been repaid.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use lt_core::AllocationPaymentStatus;
use lt_core::money::percent_of;
use lt_db::{AllocationRecord, Database, EntryRecord};
use rust_decimal::Decimal;
use serde::Serialize;

use super::util::{money, percent, truncate};

#[derive(Debug, Serialize)]
struct JsonAllocations<'a> {
    entry_id: &'a str,
    name: &'a str,
    amount: Decimal,
    settled: bool,
    allocations: Vec<JsonAllocation<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonAllocation<'a> {
    id: &'a str,
    person_id: &'a str,
    person_name: &'a str,
    description: &'a str,
    amount: Decimal,
    paid: Decimal,
    remaining: Decimal,
    status: AllocationPaymentStatus,
    notes: Option<&'a str>,
}

fn status_of(entry: &EntryRecord, allocation: &AllocationRecord) -> AllocationPaymentStatus {
    AllocationPaymentStatus::compute(allocation.amount, allocation.paid, entry.settled)
}

/// Shows the saved allocation of `entry_id`.
pub fn run<W: Write>(writer: &mut W, db: &Database, entry_id: &str, json: bool) -> Result<()> {
    let entry = db.get_entry(entry_id)?;
    let allocations = db.list_allocations(entry_id)?;

    if json {
        let report = JsonAllocations {
            entry_id: &entry.id,
            name: &entry.name,
            amount: entry.amount,
            settled: entry.settled,
            allocations: allocations
                .iter()
                .map(|a| JsonAllocation {
                    id: &a.id,
                    person_id: &a.person_id,
                    person_name: &a.person_name,
                    description: &a.description,
                    amount: a.amount,
                    paid: a.paid,
                    remaining: a.remaining(),
                    status: status_of(&entry, a),
                    notes: a.notes.as_deref(),
                })
                .collect(),
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write!(writer, "{}", format_allocations(&entry, &allocations))?;
    }
    Ok(())
}

/// Formats an entry's allocation lines with shares and repayment status.
pub fn format_allocations(entry: &EntryRecord, allocations: &[AllocationRecord]) -> String {
    let mut output = String::new();
    let state = if entry.settled { "settled" } else { "open" };
    writeln!(output, "{}: {} ({state})", entry.name, money(entry.amount)).unwrap();
    output.push('\n');

    if allocations.is_empty() {
        writeln!(
            output,
            "Not split yet. Run 'lt split {}' to create an allocation.",
            entry.id
        )
        .unwrap();
        return output;
    }

    writeln!(
        output,
        "{:<16}  {:<20}  {:>7}  {:>10}  {:>10}  {:<14}  ID",
        "PERSON", "DESCRIPTION", "SHARE", "AMOUNT", "PAID", "STATUS"
    )
    .unwrap();
    for allocation in allocations {
        let share = percent_of(allocation.amount, entry.amount)
            .map_or_else(|| "-".to_string(), percent);
        writeln!(
            output,
            "{:<16}  {:<20}  {:>7}  {:>10}  {:>10}  {:<14}  {}",
            truncate(&allocation.person_name, 16),
            truncate(&allocation.description, 20),
            share,
            money(allocation.amount),
            money(allocation.paid),
            status_of(entry, allocation).as_str(),
            allocation.id
        )
        .unwrap();
    }

    let paid: Decimal = allocations.iter().map(|a| a.paid).sum();
    let remaining: Decimal = allocations.iter().map(AllocationRecord::remaining).sum();
    output.push('\n');
    writeln!(
        output,
        "Paid {} of {}, {} remaining.",
        money(paid),
        money(entry.amount),
        money(remaining)
    )
    .unwrap();
    output
}
