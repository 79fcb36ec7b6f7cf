use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lt_cli::commands::{allocations, entries, groups, pay, people, split, summary};
use lt_cli::{Cli, Commands, Config, EntriesAction, GroupsAction, PeopleAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(lt_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = lt_db::Database::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::People(action) => match action {
            PeopleAction::Add { name } => people::add(&mut out, &db, name)?,
            PeopleAction::List { json } => people::list(&mut out, &db, *json)?,
        },
        Commands::Groups(action) => match action {
            GroupsAction::Create { name } => groups::create(&mut out, &db, name)?,
            GroupsAction::AddMember { group, person } => {
                groups::add_member(&mut out, &mut db, group, person)?;
            }
            GroupsAction::List { json } => groups::list(&mut out, &db, *json)?,
        },
        Commands::Entries(action) => match action {
            EntriesAction::Create {
                name,
                amount,
                group,
            } => entries::create(&mut out, &db, name, *amount, group.as_deref())?,
            EntriesAction::List { json } => entries::list(&mut out, &db, *json)?,
            EntriesAction::Settle { entry, reopen } => {
                entries::settle(&mut out, &db, entry, *reopen)?;
            }
        },
        Commands::Split(args) => split::run(&mut out, &mut db, args, config.default_mode)?,
        Commands::Allocations { entry, json } => allocations::run(&mut out, &db, entry, *json)?,
        Commands::Pay { allocation, amount } => pay::run(&mut out, &db, allocation, *amount)?,
        Commands::Summary { json } => summary::run(&mut out, &db, *json)?,
    }

    out.flush()?;
    Ok(())
}
