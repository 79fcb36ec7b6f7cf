//! `lt summary`: what is owed across every entry.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use lt_core::AllocationPaymentStatus;
use lt_db::{Database, EntryRecord};
use rust_decimal::Decimal;
use serde::Serialize;

use super::entries::format_entries;
use super::util::money;

/// How many entries the summary lists, newest first.
const RECENT_ENTRIES: usize = 5;

/// Entry counts by repayment status and the money involved.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_entries: usize,
    pub unpaid: usize,
    pub partially_paid: usize,
    pub paid: usize,
    pub total_borrowed: Decimal,
    pub total_remaining: Decimal,
}

impl Summary {
    pub fn from_entries(entries: &[EntryRecord]) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            summary.total_entries += 1;
            match entry.status() {
                AllocationPaymentStatus::Unpaid => summary.unpaid += 1,
                AllocationPaymentStatus::PartiallyPaid => summary.partially_paid += 1,
                AllocationPaymentStatus::Paid => summary.paid += 1,
            }
            summary.total_borrowed += entry.amount;
            summary.total_remaining += entry.remaining();
        }
        summary
    }
}

#[derive(Debug, Serialize)]
struct JsonSummary<'a> {
    #[serde(flatten)]
    summary: &'a Summary,
    recent: Vec<JsonRecent<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonRecent<'a> {
    id: &'a str,
    name: &'a str,
    amount: Decimal,
    remaining: Decimal,
    status: AllocationPaymentStatus,
    created_at: &'a str,
}

/// Prints entry totals and the most recent entries.
pub fn run<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let entries = db.list_entries()?;
    let summary = Summary::from_entries(&entries);
    let recent = most_recent(&entries);

    if json {
        let report = JsonSummary {
            summary: &summary,
            recent: recent
                .iter()
                .map(|e| JsonRecent {
                    id: &e.id,
                    name: &e.name,
                    amount: e.amount,
                    remaining: e.remaining(),
                    status: e.status(),
                    created_at: &e.created_at,
                })
                .collect(),
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write!(writer, "{}", format_summary(&summary, &recent))?;
    }
    Ok(())
}

/// The newest entries first, at most [`RECENT_ENTRIES`] of them.
fn most_recent(entries: &[EntryRecord]) -> Vec<EntryRecord> {
    entries.iter().rev().take(RECENT_ENTRIES).cloned().collect()
}

fn format_summary(summary: &Summary, recent: &[EntryRecord]) -> String {
    let mut output = String::new();
    writeln!(
        output,
        "Entries: {} ({} unpaid, {} partially paid, {} paid)",
        summary.total_entries, summary.unpaid, summary.partially_paid, summary.paid
    )
    .unwrap();
    writeln!(output, "Borrowed: {}", money(summary.total_borrowed)).unwrap();
    writeln!(output, "Remaining: {}", money(summary.total_remaining)).unwrap();

    if !recent.is_empty() {
        output.push_str("\nMost recent:\n");
        output.push_str(&format_entries(recent));
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

    fn sample() -> Vec<EntryRecord> {
        vec![
            entry("e-1", "Cabin", dec!(300), dec!(120), false),
            entry("e-2", "Groceries", dec!(87.5), Decimal::ZERO, true),
            entry("e-3", "Fuel", dec!(40), Decimal::ZERO, false),
        ]
    }

    #[test]
    fn counts_entries_by_status() {
        assert_eq!(
            Summary::from_entries(&sample()),
            Summary {
                total_entries: 3,
                unpaid: 1,
                partially_paid: 1,
                paid: 1,
                total_borrowed: dec!(427.5),
                total_remaining: dec!(220),
            }
        );
        assert_eq!(Summary::from_entries(&[]), Summary::default());
    }

    #[test]
    fn overpaid_entry_counts_as_paid_with_nothing_remaining() {
        let entries = vec![entry("e-1", "Taxi", dec!(20), dec!(25), false)];
        let summary = Summary::from_entries(&entries);
        assert_eq!(summary.paid, 1);
        assert_eq!(summary.total_remaining, Decimal::ZERO);
    }

    #[test]
    fn summary_lists_newest_first() {
        let entries = sample();
        let summary = Summary::from_entries(&entries);
        assert_snapshot!(format_summary(&summary, &most_recent(&entries)), @r"
        Entries: 3 (1 unpaid, 1 partially paid, 1 paid)
        Borrowed: 427.50
        Remaining: 220.00

        Most recent:
        DATE        NAME                      AMOUNT   REMAINING  STATUS          ID
        2025-03-01  Fuel                       40.00       40.00  UNPAID          e-3
        2025-03-01  Groceries                  87.50        0.00  PAID            e-2
        2025-03-01  Cabin                     300.00      180.00  PARTIALLY_PAID  e-1
        ");
    }

    #[test]
    fn only_the_latest_entries_are_listed() {
        let entries: Vec<EntryRecord> = (1..=7)
            .map(|i| entry(&format!("e-{i}"), "Taxi", dec!(10), Decimal::ZERO, false))
            .collect();
        let ids: Vec<String> = most_recent(&entries).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["e-7", "e-6", "e-5", "e-4", "e-3"]);
    }

    #[test]
    fn empty_database_has_no_recent_section() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        run(&mut output, &db, false).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Entries: 0 (0 unpaid, 0 partially paid, 0 paid)
        Borrowed: 0.00
        Remaining: 0.00
        ");
    }

    #[test]
    fn json_reports_totals_and_recent_entries() {
        let db = Database::open_in_memory().unwrap();
        db.create_entry("Cabin", dec!(90), None).unwrap();
        let settled = db.create_entry("Fuel", dec!(30), None).unwrap();
        db.set_entry_settled(&settled, true).unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();

        assert_eq!(value["total_entries"], 2);
        assert_eq!(value["unpaid"], 1);
        assert_eq!(value["paid"], 1);
        let borrowed: Decimal = value["total_borrowed"].as_str().unwrap().parse().unwrap();
        let remaining: Decimal = value["total_remaining"].as_str().unwrap().parse().unwrap();
        assert_eq!(borrowed, dec!(120));
        assert_eq!(remaining, dec!(90));
        assert_eq!(value["recent"].as_array().unwrap().len(), 2);
    }
}
