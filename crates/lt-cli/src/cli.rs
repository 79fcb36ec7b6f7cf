//! Command-line argument definitions.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use lt_core::SplitMode;
use rust_decimal::Decimal;

/// Loan tracker.
///
/// Records shared expenses and splits them among a group equally, by
/// percentage, or by fixed amounts.
#[derive(Debug, Parser)]
#[command(name = "lt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage people who can share expenses.
    #[command(subcommand)]
    People(PeopleAction),

    /// Manage groups of people expenses are split among.
    #[command(subcommand)]
    Groups(GroupsAction),

    /// Manage expense entries.
    #[command(subcommand)]
    Entries(EntriesAction),

    /// Create or edit the allocation of an entry.
    ///
    /// Edits are applied in order: removals, additions, assignments, values,
    /// descriptions, notes, then the optional rebalance. The result is saved
    /// only if it validates.
    Split(SplitArgs),

    /// Show the saved allocation of an entry.
    Allocations {
        /// Entry ID.
        entry: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Record a payment against an allocation line.
    Pay {
        /// Allocation ID (see `lt allocations`).
        allocation: String,

        /// Amount paid.
        amount: Decimal,
    },

    /// Show totals owed across every entry.
    Summary {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Subcommands for `lt people`.
#[derive(Debug, Subcommand)]
pub enum PeopleAction {
    /// Add a person and print their ID.
    Add {
        /// Full name.
        name: String,
    },

    /// List everyone.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Subcommands for `lt groups`.
#[derive(Debug, Subcommand)]
pub enum GroupsAction {
    /// Create a group and print its ID.
    Create {
        /// Group name.
        name: String,
    },

    /// Add a person to a group.
    AddMember {
        /// Group ID.
        group: String,

        /// Person ID.
        person: String,
    },

    /// List groups and their members.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Subcommands for `lt entries`.
#[derive(Debug, Subcommand)]
pub enum EntriesAction {
    /// Record an expense and print its ID.
    Create {
        /// What the expense was for.
        #[arg(long)]
        name: String,

        /// Total amount.
        #[arg(long)]
        amount: Decimal,

        /// Group the expense is split among.
        #[arg(long)]
        group: Option<String>,
    },

    /// List entries.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Mark an entry as settled.
    Settle {
        /// Entry ID.
        entry: String,

        /// Reopen a settled entry instead.
        #[arg(long)]
        reopen: bool,
    },
}

/// Arguments for `lt split`.
#[derive(Debug, Default, Args)]
pub struct SplitArgs {
    /// Entry ID.
    pub entry: String,

    /// Split mode: equal, percent or amount. Defaults to `default_mode` from config.
    #[arg(long)]
    pub mode: Option<SplitMode>,

    /// Remove the item at INDEX (repeatable).
    #[arg(long = "remove", value_name = "INDEX")]
    pub remove: Vec<usize>,

    /// Append an item for PERSON_ID (repeatable).
    #[arg(long = "add", value_name = "PERSON_ID")]
    pub add: Vec<String>,

    /// Reassign the item at INDEX to PERSON_ID.
    #[arg(long = "assign", value_name = "INDEX=PERSON_ID", value_parser = parse_assignment::<String>)]
    pub assign: Vec<(usize, String)>,

    /// Set the percent (percent mode) or amount (amount mode) of an item.
    #[arg(long = "set", value_name = "INDEX=VALUE", value_parser = parse_assignment::<Decimal>)]
    pub set: Vec<(usize, Decimal)>,

    /// Set the description of an item.
    #[arg(long = "describe", value_name = "INDEX=TEXT", value_parser = parse_assignment::<String>)]
    pub describe: Vec<(usize, String)>,

    /// Set the notes of an item.
    #[arg(long = "note", value_name = "INDEX=TEXT", value_parser = parse_assignment::<String>)]
    pub note: Vec<(usize, String)>,

    /// Redistribute the remainder after applying edits.
    #[arg(long)]
    pub rebalance: bool,

    /// Show the result without saving it.
    #[arg(long)]
    pub dry_run: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Parses `INDEX=VALUE` pairs used by the `split` edit flags.
pub fn parse_assignment<T>(s: &str) -> Result<(usize, T), String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let (index, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=VALUE, got `{s}`"))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid index `{index}`: {e}"))?;
    let value = value
        .parse::<T>()
        .map_err(|e| format!("invalid value `{value}`: {e}"))?;
    Ok((index, value))
}
