//! `lt groups`: who an expense is split among.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result, bail};
use lt_db::{Database, GroupRecord};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct JsonGroup<'a> {
    id: &'a str,
    name: &'a str,
    members: Vec<JsonMember<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonMember<'a> {
    id: &'a str,
    full_name: &'a str,
}

/// Creates a group and prints the new ID.
pub fn create<W: Write>(writer: &mut W, db: &Database, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("group name cannot be empty");
    }
    let id = db.create_group(name).context("failed to create group")?;
    writeln!(writer, "{id}")?;
    Ok(())
}

/// Appends a person to a group.
pub fn add_member<W: Write>(
    writer: &mut W,
    db: &mut Database,
    group_id: &str,
    person_id: &str,
) -> Result<()> {
    if db.add_group_member(group_id, person_id)? {
        writeln!(writer, "Added {person_id} to group {group_id}")?;
    } else {
        writeln!(writer, "{person_id} is already in group {group_id}")?;
    }
    Ok(())
}

/// Lists groups with their members.
pub fn list<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let groups = db.list_groups()?;
    if json {
        let rows: Vec<_> = groups
            .iter()
            .map(|group| JsonGroup {
                id: &group.id,
                name: &group.name,
                members: group
                    .members
                    .iter()
                    .map(|m| JsonMember {
                        id: &m.id,
                        full_name: &m.full_name,
                    })
                    .collect(),
            })
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&rows)?)?;
    } else {
        write!(writer, "{}", format_groups(&groups))?;
    }
    Ok(())
}

/// Formats each group followed by its numbered members.
pub fn format_groups(groups: &[GroupRecord]) -> String {
    let mut output = String::new();
    if groups.is_empty() {
        output.push_str("No groups yet. Create one with 'lt groups create <name>'.\n");
        return output;
    }

    for group in groups {
        writeln!(output, "{} ({})", group.name, group.id).unwrap();
        if group.members.is_empty() {
            output.push_str("  (no members)\n");
        }
        for (position, member) in group.members.iter().enumerate() {
            writeln!(
                output,
                "  {}. {} ({})",
                position + 1,
                member.full_name,
                member.id
            )
            .unwrap();
        }
    }
    output
}
