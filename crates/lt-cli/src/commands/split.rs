//! `lt split`: create or edit how an entry is divided among its group.
//!
//! Each invocation is one allocation session: the engine is initialized from
//! the entry (and, in percent mode, its saved split), the edits given on the
//! command line are applied, and the result is committed only if it passes
//! validation.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result, bail};
use lt_core::{
    AllocationEngine, AllocationLineItem, ItemUpdate, ParticipantId, SessionError, SplitMode,
    ValidationError, session,
};
use lt_db::Database;
use rust_decimal::Decimal;
use serde::Serialize;

use super::util::{money, percent, truncate};
use crate::SplitArgs;

/// What happened to the edited allocation.
#[derive(Debug)]
enum Outcome {
    DryRun,
    Saved(usize),
    Rejected(ValidationError),
}

#[derive(Debug, Serialize)]
struct JsonSplit<'a> {
    entry_id: &'a str,
    mode: SplitMode,
    total_amount: Decimal,
    target: Decimal,
    total: Decimal,
    items: &'a [AllocationLineItem],
    valid: bool,
    error: Option<String>,
    saved: bool,
}

/// Runs one allocation session for `args.entry`.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    args: &SplitArgs,
    default_mode: SplitMode,
) -> Result<()> {
    let entry = db.get_entry(&args.entry)?;
    if entry.settled {
        bail!(
            "entry {} is settled; reopen it before changing its split",
            entry.id
        );
    }
    let context = entry.context()?;
    let mode = args.mode.unwrap_or(default_mode);

    let mut engine = session::start(&*db, &*db, &context, mode)?;
    apply_edits(&mut engine, args)?;

    let outcome = if args.dry_run {
        Outcome::DryRun
    } else {
        match session::commit(&engine, db, &context.expense_id) {
            Ok(finalized) => Outcome::Saved(finalized.len()),
            Err(SessionError::Validation(err)) => Outcome::Rejected(err),
            Err(err) => return Err(err.into()),
        }
    };

    if args.json {
        let report = JsonSplit {
            entry_id: &entry.id,
            mode: engine.mode(),
            total_amount: engine.total_amount(),
            target: engine.target(),
            total: engine.total(),
            items: engine.items(),
            valid: engine.is_valid(),
            error: engine.validate().err().map(|e| e.to_string()),
            saved: matches!(outcome, Outcome::Saved(_)),
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write!(writer, "{}", format_split(&entry.name, &engine, &outcome))?;
    }

    if let Outcome::Rejected(err) = outcome {
        return Err(anyhow::Error::new(err).context("allocation was not saved"));
    }
    Ok(())
}

/// Applies the command-line edits to `engine`.
///
/// Removals run highest index first so earlier indexes stay meaningful.
/// Every later edit addresses items by their index after removals and
/// additions.
pub fn apply_edits(engine: &mut AllocationEngine, args: &SplitArgs) -> Result<()> {
    let mut removals = args.remove.clone();
    removals.sort_unstable_by(|a, b| b.cmp(a));
    removals.dedup();
    for index in removals {
        engine
            .remove_item(index)
            .with_context(|| format!("cannot remove item {index}"))?;
    }

    for person in &args.add {
        let participant = ParticipantId::new(person.as_str())?;
        engine.add_item();
        let index = engine.items().len() - 1;
        engine
            .update_item(index, ItemUpdate::default().participant(participant))
            .with_context(|| format!("cannot add item for {person}"))?;
    }

    for (index, person) in &args.assign {
        let participant = ParticipantId::new(person.as_str())?;
        engine
            .update_item(*index, ItemUpdate::default().participant(participant))
            .with_context(|| format!("cannot assign item {index}"))?;
    }

    for (index, value) in &args.set {
        let update = match engine.mode() {
            SplitMode::Percent => ItemUpdate::default().percent(*value),
            SplitMode::Equal | SplitMode::Amount => ItemUpdate::default().amount(*value),
        };
        engine
            .update_item(*index, update)
            .with_context(|| format!("cannot set item {index}"))?;
    }

    for (index, text) in &args.describe {
        engine
            .update_item(*index, ItemUpdate::default().description(text.as_str()))
            .with_context(|| format!("cannot describe item {index}"))?;
    }

    for (index, text) in &args.note {
        engine
            .update_item(*index, ItemUpdate::default().notes(text.as_str()))
            .with_context(|| format!("cannot annotate item {index}"))?;
    }

    if args.rebalance {
        engine.rebalance();
    }
    Ok(())
}

fn format_split(name: &str, engine: &AllocationEngine, outcome: &Outcome) -> String {
    let mut output = String::new();
    writeln!(
        output,
        "{name} ({}), total {}",
        engine.mode(),
        money(engine.total_amount())
    )
    .unwrap();
    output.push('\n');

    if engine.items().is_empty() {
        output.push_str("No items. The entry's group has no members.\n");
    } else {
        writeln!(
            output,
            "{:<3}  {:<16}  {:<20}  {:>8}  {:>10}",
            "#", "PERSON", "DESCRIPTION", "PERCENT", "AMOUNT"
        )
        .unwrap();
        for (index, item) in engine.items().iter().enumerate() {
            let person = if item.participant_name.is_empty() {
                "(unassigned)"
            } else {
                item.participant_name.as_str()
            };
            let share = item.percent.map_or_else(|| "-".to_string(), percent);
            writeln!(
                output,
                "{:<3}  {:<16}  {:<20}  {:>8}  {:>10}",
                index,
                truncate(person, 16),
                truncate(&item.description, 20),
                share,
                money(item.amount)
            )
            .unwrap();
        }
    }
    output.push('\n');

    let (total, target) = match engine.mode() {
        SplitMode::Percent => (percent(engine.total()), percent(engine.target())),
        SplitMode::Equal | SplitMode::Amount => (money(engine.total()), money(engine.target())),
    };
    writeln!(output, "Total: {total} of {target}").unwrap();

    let status = match outcome {
        Outcome::Saved(1) => "Saved 1 allocation.".to_string(),
        Outcome::Saved(count) => format!("Saved {count} allocations."),
        Outcome::Rejected(err) => format!("Not saved: {err}"),
        Outcome::DryRun => match engine.validate() {
            Ok(()) => "Valid. Dry run, nothing saved.".to_string(),
            Err(err) => format!("Invalid: {err}. Dry run, nothing saved."),
        },
    };
    writeln!(output, "{status}").unwrap();
    output
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use rust_decimal_macros::dec;

    use super::*;

    struct Fixture {
        db: Database,
        entry: String,
        people: Vec<String>,
    }

    fn fixture(names: &[&str], amount: Decimal) -> Fixture {
        let mut db = Database::open_in_memory().unwrap();
        let group = db.create_group("Trip").unwrap();
        let mut people = Vec::new();
        for name in names {
            let person = db.add_person(name).unwrap();
            db.add_group_member(&group, &person).unwrap();
            people.push(person);
        }
        let entry = db.create_entry("Cabin", amount, Some(&group)).unwrap();
        Fixture { db, entry, people }
    }

    fn split_args(entry: &str) -> SplitArgs {
        SplitArgs {
            entry: entry.to_string(),
            ..SplitArgs::default()
        }
    }

    fn run_split(db: &mut Database, args: &SplitArgs) -> (Result<()>, String) {
        let mut output = Vec::new();
        let result = run(&mut output, db, args, SplitMode::Equal);
        (result, String::from_utf8(output).unwrap())
    }

    fn saved_amounts(db: &Database, entry: &str) -> Vec<Decimal> {
        db.list_allocations(entry)
            .unwrap()
            .iter()
            .map(|a| a.amount)
            .collect()
    }

    #[test]
    fn equal_split_is_saved() {
        let mut fx = fixture(&["Ana", "Ben", "Cy"], dec!(100));
        let (result, output) = run_split(&mut fx.db, &split_args(&fx.entry));
        result.unwrap();

        assert_snapshot!(output, @r"
        Cabin (equal), total 100.00

        #    PERSON            DESCRIPTION            PERCENT      AMOUNT
        0    Ana               Cabin                        -       33.33
        1    Ben               Cabin                        -       33.33
        2    Cy                Cabin                        -       33.34

        Total: 100.00 of 100.00
        Saved 3 allocations.
        ");
        assert_eq!(
            saved_amounts(&fx.db, &fx.entry),
            vec![dec!(33.33), dec!(33.33), dec!(33.34)]
        );
    }

    #[test]
    fn percent_edit_starts_from_saved_split() {
        let mut fx = fixture(&["Ana", "Ben", "Cy"], dec!(100));
        run_split(&mut fx.db, &split_args(&fx.entry)).0.unwrap();

        let args = SplitArgs {
            mode: Some(SplitMode::Percent),
            set: vec![(0, dec!(50)), (1, Decimal::ZERO), (2, Decimal::ZERO)],
            rebalance: true,
            ..split_args(&fx.entry)
        };
        let (result, output) = run_split(&mut fx.db, &args);
        result.unwrap();

        assert_snapshot!(output, @r"
        Cabin (percent), total 100.00

        #    PERSON            DESCRIPTION            PERCENT      AMOUNT
        0    Ana               Cabin                   50.00%       50.00
        1    Ben               Cabin                   25.00%       25.00
        2    Cy                Cabin                   25.00%       25.00

        Total: 100.00% of 100.00%
        Saved 3 allocations.
        ");
        assert_eq!(
            saved_amounts(&fx.db, &fx.entry),
            vec![dec!(50), dec!(25), dec!(25)]
        );
    }

    #[test]
    fn unbalanced_amounts_are_not_saved() {
        let mut fx = fixture(&["Ana", "Ben"], dec!(100));
        let args = SplitArgs {
            mode: Some(SplitMode::Amount),
            set: vec![(0, dec!(30))],
            ..split_args(&fx.entry)
        };
        let (result, output) = run_split(&mut fx.db, &args);

        let err = result.unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            "allocation was not saved: total amount must equal 100.00, current: 30.00"
        );
        assert!(output.ends_with("Not saved: total amount must equal 100.00, current: 30.00\n"));
        assert!(saved_amounts(&fx.db, &fx.entry).is_empty());
    }

    #[test]
    fn rebalance_fills_untouched_amounts() {
        let mut fx = fixture(&["Ana", "Ben", "Cy"], dec!(100));
        let args = SplitArgs {
            mode: Some(SplitMode::Amount),
            set: vec![(0, dec!(30))],
            rebalance: true,
            ..split_args(&fx.entry)
        };
        run_split(&mut fx.db, &args).0.unwrap();
        assert_eq!(
            saved_amounts(&fx.db, &fx.entry),
            vec![dec!(30), dec!(35), dec!(35)]
        );
    }

    #[test]
    fn rebalanced_amounts_show_their_percent() {
        let mut fx = fixture(&["Ana", "Ben"], dec!(80));
        let args = SplitArgs {
            mode: Some(SplitMode::Amount),
            set: vec![(0, dec!(20))],
            rebalance: true,
            dry_run: true,
            ..split_args(&fx.entry)
        };
        let (result, output) = run_split(&mut fx.db, &args);
        result.unwrap();

        assert_snapshot!(output, @r"
        Cabin (amount), total 80.00

        #    PERSON            DESCRIPTION            PERCENT      AMOUNT
        0    Ana               Cabin                   25.00%       20.00
        1    Ben               Cabin                   75.00%       60.00

        Total: 80.00 of 80.00
        Valid. Dry run, nothing saved.
        ");
    }

    #[test]
    fn oversized_value_is_rejected() {
        let mut fx = fixture(&["Ana", "Ben"], dec!(1));
        let args = SplitArgs {
            mode: Some(SplitMode::Amount),
            set: vec![(0, Decimal::MAX)],
            ..split_args(&fx.entry)
        };
        let err = run_split(&mut fx.db, &args).0.unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            "cannot set item 0: amount exceeds the maximum of 1000000000000"
        );
        assert!(saved_amounts(&fx.db, &fx.entry).is_empty());
    }

    #[test]
    fn dry_run_leaves_store_untouched() {
        let mut fx = fixture(&["Ana", "Ben"], dec!(80));
        let args = SplitArgs {
            dry_run: true,
            ..split_args(&fx.entry)
        };
        let (result, output) = run_split(&mut fx.db, &args);
        result.unwrap();

        assert!(output.ends_with("Valid. Dry run, nothing saved.\n"));
        assert!(saved_amounts(&fx.db, &fx.entry).is_empty());
    }

    #[test]
    fn dry_run_json_reports_validation() {
        let mut fx = fixture(&["Ana", "Ben"], dec!(80));
        let args = SplitArgs {
            mode: Some(SplitMode::Percent),
            set: vec![(0, dec!(10))],
            dry_run: true,
            json: true,
            ..split_args(&fx.entry)
        };
        let (result, output) = run_split(&mut fx.db, &args);
        result.unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["mode"], "percent");
        assert_eq!(value["valid"], false);
        assert_eq!(value["saved"], false);
        assert_eq!(
            value["error"],
            "total percentage must equal 100%, current: 60.00%"
        );
        assert_eq!(value["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn removals_apply_highest_index_first() {
        let fx = fixture(&["Ana", "Ben", "Cy"], dec!(90));
        let mut engine = session::start(
            &fx.db,
            &fx.db,
            &fx.db.get_entry(&fx.entry).unwrap().context().unwrap(),
            SplitMode::Amount,
        )
        .unwrap();
        let args = SplitArgs {
            remove: vec![0, 2, 2],
            ..split_args(&fx.entry)
        };
        apply_edits(&mut engine, &args).unwrap();

        let names: Vec<_> = engine
            .items()
            .iter()
            .map(|item| item.participant_name.as_str())
            .collect();
        assert_eq!(names, vec!["Ben"]);
    }

    #[test]
    fn added_items_take_the_named_person() {
        let mut fx = fixture(&["Ana", "Ben"], dec!(60));
        let args = SplitArgs {
            mode: Some(SplitMode::Amount),
            add: vec![fx.people[1].clone()],
            set: vec![(0, dec!(20)), (1, dec!(20)), (2, dec!(20))],
            describe: vec![(2, "Firewood".to_string())],
            note: vec![(2, "paid at the door".to_string())],
            ..split_args(&fx.entry)
        };
        run_split(&mut fx.db, &args).0.unwrap();

        let saved = fx.db.list_allocations(&fx.entry).unwrap();
        assert_eq!(saved.len(), 3);
        assert_eq!(saved[2].person_name, "Ben");
        assert_eq!(saved[2].description, "Firewood");
        assert_eq!(saved[2].notes.as_deref(), Some("paid at the door"));
    }

    #[test]
    fn assigning_a_stranger_fails() {
        let mut fx = fixture(&["Ana"], dec!(60));
        let outsider = fx.db.add_person("Zed").unwrap();
        let args = SplitArgs {
            assign: vec![(0, outsider.clone())],
            ..split_args(&fx.entry)
        };
        let err = run_split(&mut fx.db, &args).0.unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            format!("cannot assign item 0: participant {outsider} is not eligible for this expense")
        );
    }

    #[test]
    fn equal_shares_cannot_be_set() {
        let mut fx = fixture(&["Ana", "Ben"], dec!(60));
        let args = SplitArgs {
            set: vec![(0, dec!(10))],
            ..split_args(&fx.entry)
        };
        let err = run_split(&mut fx.db, &args).0.unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            "cannot set item 0: shares cannot be edited in equal mode"
        );
    }

    #[test]
    fn settled_entries_are_locked() {
        let mut fx = fixture(&["Ana"], dec!(60));
        fx.db.set_entry_settled(&fx.entry, true).unwrap();
        let err = run_split(&mut fx.db, &split_args(&fx.entry)).0.unwrap_err();
        assert!(err.to_string().contains("is settled"));
    }

    #[test]
    fn entry_without_group_cannot_be_saved() {
        let mut db = Database::open_in_memory().unwrap();
        let entry = db.create_entry("Solo", dec!(10), None).unwrap();
        let (result, output) = run_split(&mut db, &split_args(&entry));

        assert!(output.contains("No items."));
        assert_eq!(
            format!("{:#}", result.unwrap_err()),
            "allocation was not saved: no allocation items to save"
        );
    }
}
