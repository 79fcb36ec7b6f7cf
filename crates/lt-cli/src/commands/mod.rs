//! CLI subcommand implementations.

pub mod allocations;
pub mod entries;
pub mod groups;
pub mod pay;
pub mod people;
pub mod split;
pub mod summary;
mod util;
