//! Loan tracker CLI library.
//!
//! This crate provides the CLI interface for the loan tracker.

mod cli;
pub mod commands;
mod config;

pub use cli::{
    Cli, Commands, EntriesAction, GroupsAction, PeopleAction, SplitArgs, parse_assignment,
};
pub use config::Config;
