//! Storage layer for the loan tracker.
//!
//! Provides persistence for people, groups, entries (expenses) and their
//! allocations using `rusqlite`, and implements the [`ParticipantSource`] and
//! [`AllocationStore`] boundaries the allocation engine is driven through.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization (e.g., `Mutex<Database>`).
//!
//! # Schema
//!
//! ## Money
//!
//! Amounts are stored as TEXT in canonical decimal form (e.g., `33.34`) and
//! parsed back into `rust_decimal::Decimal`. SQLite's REAL would reintroduce
//! binary floating point, which the allocation invariants cannot tolerate.
//!
//! ## Timestamps
//!
//! Timestamps are stored as TEXT in ISO 8601 format (e.g., `2024-01-15T10:30:00Z`).
//!
//! ## Allocations
//!
//! An entry's allocation lines are only ever replaced as a whole
//! ([`AllocationStore::replace_all`]), inside one transaction. Payments
//! recorded against a replaced line are deleted with it.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use lt_core::{
    AllocationLineItem, AllocationPaymentStatus, AllocationStore, ExpenseContext, ExpenseId,
    FinalizedAllocation, GroupId, InvalidInput, Participant, ParticipantId, ParticipantSource,
};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A referenced row does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// A stored amount could not be parsed as a decimal.
    #[error("invalid amount for {id}: {value}")]
    InvalidAmount {
        id: String,
        value: String,
        #[source]
        source: rust_decimal::Error,
    },
    /// A stored identifier failed validation.
    #[error("invalid stored identifier: {0}")]
    InvalidId(#[from] InvalidInput),
    /// A payment must be strictly positive.
    #[error("payment amount must be positive, got {0}")]
    InvalidPayment(Decimal),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A person stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub id: String,
    pub full_name: String,
}

/// A group and its members, in the order they were added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub id: String,
    pub name: String,
    pub members: Vec<PersonRecord>,
}

/// An expense to be split among a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub id: String,
    pub name: String,
    pub amount: Decimal,
    pub group_id: Option<String>,
    pub settled: bool,
    pub created_at: String,
    /// Sum of the payments recorded against the entry's allocation lines.
    pub paid: Decimal,
}

impl EntryRecord {
    /// The allocation-session view of this entry.
    pub fn context(&self) -> Result<ExpenseContext, DbError> {
        Ok(ExpenseContext {
            expense_id: ExpenseId::new(self.id.clone())?,
            name: self.name.clone(),
            total_amount: self.amount,
            group_id: self.group_id.clone().map(GroupId::new).transpose()?,
        })
    }

    /// Amount still owed on the whole entry. Settled entries owe nothing.
    pub fn remaining(&self) -> Decimal {
        if self.settled {
            Decimal::ZERO
        } else {
            (self.amount - self.paid).max(Decimal::ZERO)
        }
    }

    /// Repayment status of the entry as a whole.
    pub fn status(&self) -> AllocationPaymentStatus {
        AllocationPaymentStatus::compute(self.amount, self.paid, self.settled)
    }
}

/// A persisted allocation line together with what has been paid against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRecord {
    pub id: String,
    pub entry_id: String,
    pub person_id: String,
    pub person_name: String,
    pub description: String,
    pub amount: Decimal,
    pub notes: Option<String>,
    pub paid: Decimal,
}

impl AllocationRecord {
    /// Amount still owed, never below zero.
    pub fn remaining(&self) -> Decimal {
        (self.amount - self.paid).max(Decimal::ZERO)
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS people (
                id TEXT PRIMARY KEY,
                full_name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS groups (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS group_members (
                group_id TEXT NOT NULL,
                person_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (group_id, person_id),
                FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE,
                FOREIGN KEY (person_id) REFERENCES people(id) ON DELETE CASCADE
            );

            -- amount: canonical decimal text (e.g., '150.00')
            CREATE TABLE IF NOT EXISTS entries (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                amount TEXT NOT NULL,
                group_id TEXT,
                settled INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS allocations (
                id TEXT PRIMARY KEY,
                entry_id TEXT NOT NULL,
                person_id TEXT NOT NULL,
                description TEXT NOT NULL,
                amount TEXT NOT NULL,
                notes TEXT,
                position INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE,
                FOREIGN KEY (person_id) REFERENCES people(id)
            );

            CREATE INDEX IF NOT EXISTS idx_allocations_entry ON allocations(entry_id);

            CREATE TABLE IF NOT EXISTS allocation_payments (
                id TEXT PRIMARY KEY,
                allocation_id TEXT NOT NULL,
                amount TEXT NOT NULL,
                paid_at TEXT NOT NULL,
                FOREIGN KEY (allocation_id) REFERENCES allocations(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_allocation_payments_allocation
                ON allocation_payments(allocation_id);
            ",
        )?;
        Ok(())
    }

    // ========== People & Groups ==========

    /// Adds a person and returns their generated ID.
    pub fn add_person(&self, full_name: &str) -> Result<String, DbError> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO people (id, full_name, created_at) VALUES (?, ?, ?)",
            params![id, full_name, now()],
        )?;
        Ok(id)
    }

    /// Lists all people ordered by name then ID.
    pub fn list_people(&self) -> Result<Vec<PersonRecord>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, full_name FROM people ORDER BY full_name ASC, id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(PersonRecord {
                id: row.get(0)?,
                full_name: row.get(1)?,
            })
        })?;
        let mut people = Vec::new();
        for row in rows {
            people.push(row?);
        }
        Ok(people)
    }

    /// Creates a group and returns its generated ID.
    pub fn create_group(&self, name: &str) -> Result<String, DbError> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO groups (id, name, created_at) VALUES (?, ?, ?)",
            params![id, name, now()],
        )?;
        Ok(id)
    }

    /// Appends a person to a group. Adding an existing member is a no-op.
    ///
    /// Returns whether the person was newly added.
    pub fn add_group_member(&mut self, group_id: &str, person_id: &str) -> Result<bool, DbError> {
        self.require("groups", "group", group_id)?;
        self.require("people", "person", person_id)?;

        let tx = self.conn.transaction()?;
        let position: i64 = tx.query_row(
            "SELECT COUNT(*) FROM group_members WHERE group_id = ?",
            params![group_id],
            |row| row.get(0),
        )?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO group_members (group_id, person_id, position) VALUES (?, ?, ?)",
            params![group_id, person_id, position],
        )?;
        tx.commit()?;
        Ok(inserted > 0)
    }

    /// Lists groups with their members.
    pub fn list_groups(&self) -> Result<Vec<GroupRecord>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM groups ORDER BY name ASC, id ASC")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get(1)?)))?;
        let mut groups = Vec::new();
        for row in rows {
            let (id, name) = row?;
            let members = self.group_members(&id)?;
            groups.push(GroupRecord { id, name, members });
        }
        Ok(groups)
    }

    /// Members of a group in the order they were added.
    pub fn group_members(&self, group_id: &str) -> Result<Vec<PersonRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT p.id, p.full_name
            FROM group_members m
            JOIN people p ON p.id = m.person_id
            WHERE m.group_id = ?
            ORDER BY m.position ASC
            ",
        )?;
        let rows = stmt.query_map(params![group_id], |row| {
            Ok(PersonRecord {
                id: row.get(0)?,
                full_name: row.get(1)?,
            })
        })?;
        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }

    // ========== Entries ==========

    /// Creates an expense entry owed by `group_id` and returns its ID.
    pub fn create_entry(
        &self,
        name: &str,
        amount: Decimal,
        group_id: Option<&str>,
    ) -> Result<String, DbError> {
        if let Some(group_id) = group_id {
            self.require("groups", "group", group_id)?;
        }
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO entries (id, name, amount, group_id, settled, created_at) VALUES (?, ?, ?, ?, 0, ?)",
            params![id, name, amount.to_string(), group_id, now()],
        )?;
        Ok(id)
    }

    /// Fetches an entry by ID.
    pub fn get_entry(&self, entry_id: &str) -> Result<EntryRecord, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, amount, group_id, settled, created_at FROM entries WHERE id = ?",
                params![entry_id],
                raw_entry,
            )
            .optional()?;
        let raw = row.ok_or_else(|| DbError::NotFound {
            kind: "entry",
            id: entry_id.to_string(),
        })?;
        let paid = self.paid_by_allocation(entry_id)?.values().copied().sum();
        raw.into_record(paid)
    }

    /// Lists entries, oldest first.
    pub fn list_entries(&self) -> Result<Vec<EntryRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, amount, group_id, settled, created_at FROM entries ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map([], raw_entry)?;
        let paid = self.paid_by_entry()?;
        let mut entries = Vec::new();
        for row in rows {
            let raw = row?;
            let entry_paid = paid.get(&raw.id).copied().unwrap_or(Decimal::ZERO);
            entries.push(raw.into_record(entry_paid)?);
        }
        Ok(entries)
    }

    /// Marks an entry as fully settled (or reopens it).
    pub fn set_entry_settled(&self, entry_id: &str, settled: bool) -> Result<(), DbError> {
        let updated = self.conn.execute(
            "UPDATE entries SET settled = ? WHERE id = ?",
            params![settled, entry_id],
        )?;
        if updated == 0 {
            return Err(DbError::NotFound {
                kind: "entry",
                id: entry_id.to_string(),
            });
        }
        Ok(())
    }

    // ========== Allocations ==========

    /// Lists an entry's allocation lines with the total paid against each.
    pub fn list_allocations(&self, entry_id: &str) -> Result<Vec<AllocationRecord>, DbError> {
        let paid = self.paid_by_allocation(entry_id)?;

        let mut stmt = self.conn.prepare(
            "
            SELECT a.id, a.entry_id, a.person_id, p.full_name, a.description, a.amount, a.notes
            FROM allocations a
            JOIN people p ON p.id = a.person_id
            WHERE a.entry_id = ?
            ORDER BY a.position ASC
            ",
        )?;
        let rows = stmt.query_map(params![entry_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut allocations = Vec::new();
        for row in rows {
            let (id, entry_id, person_id, person_name, description, amount, notes) = row?;
            let amount = parse_amount(&id, &amount)?;
            let paid = paid.get(&id).copied().unwrap_or(Decimal::ZERO);
            allocations.push(AllocationRecord {
                id,
                entry_id,
                person_id,
                person_name,
                description,
                amount,
                notes,
                paid,
            });
        }
        Ok(allocations)
    }

    /// Fetches one allocation line with its paid total.
    pub fn get_allocation(&self, allocation_id: &str) -> Result<AllocationRecord, DbError> {
        let not_found = || DbError::NotFound {
            kind: "allocation",
            id: allocation_id.to_string(),
        };
        let entry_id: Option<String> = self
            .conn
            .query_row(
                "SELECT entry_id FROM allocations WHERE id = ?",
                params![allocation_id],
                |row| row.get(0),
            )
            .optional()?;
        let entry_id = entry_id.ok_or_else(not_found)?;
        self.list_allocations(&entry_id)?
            .into_iter()
            .find(|allocation| allocation.id == allocation_id)
            .ok_or_else(not_found)
    }

    /// Records a payment against an allocation line and returns its ID.
    pub fn record_payment(&self, allocation_id: &str, amount: Decimal) -> Result<String, DbError> {
        if amount <= Decimal::ZERO {
            return Err(DbError::InvalidPayment(amount));
        }
        self.require("allocations", "allocation", allocation_id)?;
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO allocation_payments (id, allocation_id, amount, paid_at) VALUES (?, ?, ?, ?)",
            params![id, allocation_id, amount.to_string(), now()],
        )?;
        tracing::debug!(allocation = allocation_id, %amount, "recorded payment");
        Ok(id)
    }

    fn paid_by_allocation(&self, entry_id: &str) -> Result<HashMap<String, Decimal>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT pay.id, pay.allocation_id, pay.amount
            FROM allocation_payments pay
            JOIN allocations a ON a.id = pay.allocation_id
            WHERE a.entry_id = ?
            ",
        )?;
        let rows = stmt.query_map(params![entry_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut paid: HashMap<String, Decimal> = HashMap::new();
        for row in rows {
            let (payment_id, allocation_id, amount) = row?;
            let amount = parse_amount(&payment_id, &amount)?;
            *paid.entry(allocation_id).or_insert(Decimal::ZERO) += amount;
        }
        Ok(paid)
    }

    fn paid_by_entry(&self) -> Result<HashMap<String, Decimal>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT pay.id, a.entry_id, pay.amount
            FROM allocation_payments pay
            JOIN allocations a ON a.id = pay.allocation_id
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut paid: HashMap<String, Decimal> = HashMap::new();
        for row in rows {
            let (payment_id, entry_id, amount) = row?;
            let amount = parse_amount(&payment_id, &amount)?;
            *paid.entry(entry_id).or_insert(Decimal::ZERO) += amount;
        }
        Ok(paid)
    }

    /// Fails with [`DbError::NotFound`] unless `table` has a row with `id`.
    fn require(&self, table: &str, kind: &'static str, id: &str) -> Result<(), DbError> {
        let exists: bool = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?)"),
            params![id],
            |row| row.get(0),
        )?;
        if exists {
            Ok(())
        } else {
            Err(DbError::NotFound {
                kind,
                id: id.to_string(),
            })
        }
    }
}

impl ParticipantSource for Database {
    type Error = DbError;

    /// Members of the expense's borrower group; nobody when it has no group.
    fn list_eligible(&self, expense: &ExpenseContext) -> Result<Vec<Participant>, DbError> {
        let Some(group_id) = &expense.group_id else {
            return Ok(Vec::new());
        };
        self.group_members(group_id.as_str())?
            .into_iter()
            .map(|person| {
                Ok(Participant::new(
                    ParticipantId::new(person.id)?,
                    person.full_name,
                ))
            })
            .collect()
    }
}

impl AllocationStore for Database {
    type Error = DbError;

    fn load_existing(&self, expense_id: &ExpenseId) -> Result<Vec<AllocationLineItem>, DbError> {
        self.list_allocations(expense_id.as_str())?
            .into_iter()
            .map(|record| {
                Ok(AllocationLineItem {
                    participant_id: Some(ParticipantId::new(record.person_id)?),
                    participant_name: record.person_name,
                    description: record.description,
                    amount: record.amount,
                    percent: None,
                    notes: record.notes,
                })
            })
            .collect()
    }

    fn replace_all(
        &mut self,
        expense_id: &ExpenseId,
        allocations: &[FinalizedAllocation],
    ) -> Result<(), DbError> {
        self.require("entries", "entry", expense_id.as_str())?;

        let tx = self.conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM allocations WHERE entry_id = ?",
            params![expense_id.as_str()],
        )?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO allocations
                (id, entry_id, person_id, description, amount, notes, position, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )?;
            let created_at = now();
            for (position, allocation) in allocations.iter().enumerate() {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    expense_id.as_str(),
                    allocation.participant_id.as_str(),
                    allocation.description,
                    allocation.amount.to_string(),
                    allocation.notes,
                    i64::try_from(position).unwrap_or(i64::MAX),
                    created_at,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(
            entry = %expense_id,
            removed,
            inserted = allocations.len(),
            "replaced allocations"
        );
        Ok(())
    }
}

/// Entry row before its amount is parsed.
struct RawEntry {
    id: String,
    name: String,
    amount: String,
    group_id: Option<String>,
    settled: bool,
    created_at: String,
}

impl RawEntry {
    fn into_record(self, paid: Decimal) -> Result<EntryRecord, DbError> {
        Ok(EntryRecord {
            amount: parse_amount(&self.id, &self.amount)?,
            id: self.id,
            name: self.name,
            group_id: self.group_id,
            settled: self.settled,
            created_at: self.created_at,
            paid,
        })
    }
}

fn raw_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok(RawEntry {
        id: row.get(0)?,
        name: row.get(1)?,
        amount: row.get(2)?,
        group_id: row.get(3)?,
        settled: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn parse_amount(id: &str, value: &str) -> Result<Decimal, DbError> {
    Decimal::from_str(value).map_err(|source| DbError::InvalidAmount {
        id: id.to_string(),
        value: value.to_string(),
        source,
    })
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
