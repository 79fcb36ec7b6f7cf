//! `lt entries`: the expenses being tracked.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result, bail};
use lt_core::AllocationPaymentStatus;
use lt_core::money::{MAX_VALUE, round2, within_range};
use lt_db::{Database, EntryRecord};
use rust_decimal::Decimal;
use serde::Serialize;

use super::util::{date_part, money, truncate};

#[derive(Debug, Serialize)]
struct JsonEntry<'a> {
    id: &'a str,
    name: &'a str,
    amount: Decimal,
    group_id: Option<&'a str>,
    settled: bool,
    created_at: &'a str,
    paid: Decimal,
    remaining: Decimal,
    status: AllocationPaymentStatus,
}

/// Records an expense and prints the new ID.
///
/// The amount is stored rounded to cents.
pub fn create<W: Write>(
    writer: &mut W,
    db: &Database,
    name: &str,
    amount: Decimal,
    group_id: Option<&str>,
) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("entry name cannot be empty");
    }
    if !within_range(amount) {
        bail!("entry amount exceeds the maximum of {MAX_VALUE}");
    }
    let amount = round2(amount);
    if amount <= Decimal::ZERO {
        bail!("entry amount must be positive, got {amount}");
    }
    let id = db
        .create_entry(name, amount, group_id)
        .context("failed to create entry")?;
    tracing::debug!(entry = %id, %amount, "created entry");
    writeln!(writer, "{id}")?;
    Ok(())
}

/// Lists entries, oldest first.
pub fn list<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let entries = db.list_entries()?;
    if json {
        let rows: Vec<_> = entries
            .iter()
            .map(|e| JsonEntry {
                id: &e.id,
                name: &e.name,
                amount: e.amount,
                group_id: e.group_id.as_deref(),
                settled: e.settled,
                created_at: &e.created_at,
                paid: e.paid,
                remaining: e.remaining(),
                status: e.status(),
            })
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&rows)?)?;
    } else {
        write!(writer, "{}", format_entries(&entries))?;
    }
    Ok(())
}

/// Marks an entry settled, or open again with `reopen`.
pub fn settle<W: Write>(writer: &mut W, db: &Database, entry_id: &str, reopen: bool) -> Result<()> {
    db.set_entry_settled(entry_id, !reopen)?;
    if reopen {
        writeln!(writer, "Reopened {entry_id}")?;
    } else {
        writeln!(writer, "Settled {entry_id}")?;
    }
    Ok(())
}

/// Formats entries as a table.
pub fn format_entries(entries: &[EntryRecord]) -> String {
    let mut output = String::new();
    if entries.is_empty() {
        output.push_str("No entries yet. Record one with 'lt entries create'.\n");
        return output;
    }

    writeln!(
        output,
        "{:<10}  {:<20}  {:>10}  {:>10}  {:<14}  ID",
        "DATE", "NAME", "AMOUNT", "REMAINING", "STATUS"
    )
    .unwrap();
    for entry in entries {
        writeln!(
            output,
            "{:<10}  {:<20}  {:>10}  {:>10}  {:<14}  {}",
            date_part(&entry.created_at),
            truncate(&entry.name, 20),
            money(entry.amount),
            money(entry.remaining()),
            entry.status().as_str(),
            entry.id
        )
        .unwrap();
    }
    output
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use rust_decimal_macros::dec;

    use super::*;

    fn entry(id: &str, name: &str, amount: Decimal, paid: Decimal, settled: bool) -> EntryRecord {
        EntryRecord {
            id: id.to_string(),
            name: name.to_string(),
            amount,
            group_id: None,
            settled,
            created_at: "2025-03-01T18:30:00.000Z".to_string(),
            paid,
        }
    }

    #[test]
    fn entries_table() {
        let entries = vec![
            entry("e-1", "Cabin", dec!(300), dec!(120), false),
            entry("e-2", "Groceries for the long weekend", dec!(87.5), Decimal::ZERO, true),
            entry("e-3", "Fuel", dec!(40), Decimal::ZERO, false),
        ];
        assert_snapshot!(format_entries(&entries), @r"
        DATE        NAME                      AMOUNT   REMAINING  STATUS          ID
        2025-03-01  Cabin                     300.00      180.00  PARTIALLY_PAID  e-1
        2025-03-01  Groceries for the...       87.50        0.00  PAID            e-2
        2025-03-01  Fuel                       40.00       40.00  UNPAID          e-3
        ");
    }

    #[test]
    fn list_json_reports_balance() {
        let mut db = Database::open_in_memory().unwrap();
        let group = db.create_group("Trip").unwrap();
        let ana = db.add_person("Ana").unwrap();
        db.add_group_member(&group, &ana).unwrap();
        let entry_id = db.create_entry("Cabin", dec!(40), Some(&group)).unwrap();
        let context = db.get_entry(&entry_id).unwrap().context().unwrap();
        let engine =
            lt_core::session::start(&db, &db, &context, lt_core::SplitMode::Equal).unwrap();
        lt_core::session::commit(&engine, &mut db, &context.expense_id).unwrap();
        let allocation = db.list_allocations(&entry_id).unwrap().remove(0);
        db.record_payment(&allocation.id, dec!(15)).unwrap();

        let mut output = Vec::new();
        list(&mut output, &db, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        let row = &value[0];
        assert_eq!(row["status"], "PARTIALLY_PAID");
        let paid: Decimal = row["paid"].as_str().unwrap().parse().unwrap();
        let remaining: Decimal = row["remaining"].as_str().unwrap().parse().unwrap();
        assert_eq!(paid, dec!(15));
        assert_eq!(remaining, dec!(25));
    }

    #[test]
    fn create_rounds_amount_to_cents() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        create(&mut output, &db, "Taxi", dec!(12.345), None).unwrap();

        let id = String::from_utf8(output).unwrap().trim().to_string();
        assert_eq!(db.get_entry(&id).unwrap().amount, dec!(12.35));
    }

    #[test]
    fn create_rejects_non_positive_amount() {
        let db = Database::open_in_memory().unwrap();
        let err = create(&mut Vec::new(), &db, "Taxi", dec!(0.004), None).unwrap_err();
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn create_rejects_oversized_amount() {
        let db = Database::open_in_memory().unwrap();
        let err = create(&mut Vec::new(), &db, "Taxi", Decimal::MAX, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "entry amount exceeds the maximum of 1000000000000"
        );
        assert!(db.list_entries().unwrap().is_empty());
    }

    #[test]
    fn create_rejects_unknown_group() {
        let db = Database::open_in_memory().unwrap();
        let err = create(&mut Vec::new(), &db, "Taxi", dec!(10), Some("g-x")).unwrap_err();
        assert_eq!(format!("{err:#}"), "failed to create entry: group not found: g-x");
    }

    #[test]
    fn settle_and_reopen() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_entry("Taxi", dec!(10), None).unwrap();
        let mut output = Vec::new();

        settle(&mut output, &db, &id, false).unwrap();
        assert!(db.get_entry(&id).unwrap().settled);
        settle(&mut output, &db, &id, true).unwrap();
        assert!(!db.get_entry(&id).unwrap().settled);

        assert!(settle(&mut Vec::new(), &db, "missing", false).is_err());
    }
}
