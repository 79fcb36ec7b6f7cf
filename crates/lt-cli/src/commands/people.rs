//! `lt people`: the people expenses can be split among.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result, bail};
use lt_db::{Database, PersonRecord};
use serde::Serialize;

use super::util::truncate;

#[derive(Debug, Serialize)]
struct JsonPerson<'a> {
    id: &'a str,
    full_name: &'a str,
}

/// Adds a person and prints the new ID.
pub fn add<W: Write>(writer: &mut W, db: &Database, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("name cannot be empty");
    }
    let id = db.add_person(name).context("failed to add person")?;
    writeln!(writer, "{id}")?;
    Ok(())
}

/// Lists everyone.
pub fn list<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let people = db.list_people()?;
    if json {
        let rows: Vec<_> = people
            .iter()
            .map(|p| JsonPerson {
                id: &p.id,
                full_name: &p.full_name,
            })
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&rows)?)?;
    } else {
        write!(writer, "{}", format_people(&people))?;
    }
    Ok(())
}

/// Formats people as a name/ID table.
pub fn format_people(people: &[PersonRecord]) -> String {
    let mut output = String::new();
    if people.is_empty() {
        output.push_str("No people yet. Add one with 'lt people add <name>'.\n");
        return output;
    }

    writeln!(output, "{:<24}  ID", "NAME").unwrap();
    for person in people {
        writeln!(output, "{:<24}  {}", truncate(&person.full_name, 24), person.id).unwrap();
    }
    output
}
