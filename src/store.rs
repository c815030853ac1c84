//! SQLite backed store of distinct sequences and their cumulative counts
use log::{debug, trace};
use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::Result;
use crate::extract::ExtractionCandidate;
use crate::resolver::{KnownSequence, Resolution, Resolver, ResolverMode};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sequences (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sequence TEXT UNIQUE,
    fixed_sequence TEXT,
    length INTEGER,
    count_of_repeat INTEGER DEFAULT 0
)";

/// One row of the `sequences` table.
///
/// The serde names double as the CSV export header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceEntity {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Sequence")]
    pub sequence: String,
    #[serde(rename = "Fixed Sequence")]
    pub fixed_sequence: String,
    #[serde(rename = "Length")]
    pub length: i64,
    #[serde(rename = "Count of Repeat")]
    pub count: u64,
}

/// What an upsert did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created { id: i64 },
    Accumulated { id: i64, near_duplicate: bool },
    /// Dropped in favour of a more frequent near-duplicate, store unchanged
    Discarded { near: i64 },
}

impl UpsertOutcome {
    pub fn created(&self) -> bool {
        matches!(self, UpsertOutcome::Created { .. })
    }
}

/// Handle to one sequence database, scoped to a processing run.
///
/// Every upsert runs in its own transaction, so the compare-then-write is
/// atomic and `snapshot_to` can never observe a half applied update.
pub struct SequenceStore {
    conn: Connection,
    resolver: Resolver,
}

impl SequenceStore {
    /// Open (or create) the database at `path` and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P, resolver: Resolver) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!("Opened sequence store at {:?}", path.as_ref());
        Self::with_connection(conn, resolver)
    }

    pub fn open_in_memory(resolver: Resolver) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, resolver)
    }

    fn with_connection(conn: Connection, resolver: Resolver) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(SequenceStore { conn, resolver })
    }

    pub fn resolver(&self) -> Resolver {
        self.resolver
    }

    pub fn set_resolver(&mut self, resolver: Resolver) {
        self.resolver = resolver;
    }

    /// Apply the resolver's decision for `candidate`, all or nothing
    pub fn upsert(&mut self, candidate: &ExtractionCandidate) -> Result<UpsertOutcome> {
        let resolver = self.resolver;
        let tx = self.conn.transaction()?;

        let mut known: Vec<KnownSequence> = exact_match(&tx, &candidate.sequence)?
            .into_iter()
            .collect();
        if known.is_empty() && resolver.mode == ResolverMode::NearDuplicateAware {
            known = all_known(&tx)?;
        }

        let outcome = match resolver.resolve(&candidate.sequence, candidate.occurrences, &known) {
            Resolution::Accumulate { id, near_duplicate } => {
                tx.execute(
                    "UPDATE sequences SET count_of_repeat = count_of_repeat + ?1 WHERE id = ?2",
                    params![candidate.occurrences as i64, id],
                )?;
                UpsertOutcome::Accumulated { id, near_duplicate }
            }
            Resolution::Discard { id } => UpsertOutcome::Discarded { near: id },
            Resolution::Create => {
                tx.execute(
                    "INSERT INTO sequences (sequence, fixed_sequence, length, count_of_repeat) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        candidate.sequence,
                        candidate.fixed_sequence,
                        candidate.len() as i64,
                        candidate.occurrences as i64
                    ],
                )?;
                UpsertOutcome::Created {
                    id: tx.last_insert_rowid(),
                }
            }
        };
        tx.commit()?;
        trace!("{} x{} -> {:?}", candidate.sequence, candidate.occurrences, outcome);
        Ok(outcome)
    }

    /// Full snapshot in storage order
    pub fn export(&self) -> Result<Vec<SequenceEntity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sequence, fixed_sequence, length, count_of_repeat \
             FROM sequences ORDER BY id",
        )?;
        let rows = stmt.query_map([], entity_from_row)?;
        let entities = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entities)
    }

    /// Re-insert exported entities, summing counts into rows that already exist.
    ///
    /// Stored ids are assigned anew; sequence, label, length and count are kept as given.
    pub fn import(&mut self, entities: &[SequenceEntity]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sequences (sequence, fixed_sequence, length, count_of_repeat) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(sequence) DO UPDATE SET \
                 count_of_repeat = count_of_repeat + excluded.count_of_repeat",
            )?;
            for entity in entities {
                stmt.execute(params![
                    entity.sequence,
                    entity.fixed_sequence,
                    entity.length,
                    entity.count as i64
                ])?;
            }
        }
        tx.commit()?;
        Ok(entities.len())
    }

    /// Look up a single entity by its exact sequence text
    pub fn get(&self, sequence: &str) -> Result<Option<SequenceEntity>> {
        let entity = self
            .conn
            .query_row(
                "SELECT id, sequence, fixed_sequence, length, count_of_repeat \
                 FROM sequences WHERE sequence = ?1",
                params![sequence],
                entity_from_row,
            )
            .optional()?;
        Ok(entity)
    }

    /// Number of distinct entities
    pub fn len(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sequences", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Consistent copy of the whole database to `path`.
    ///
    /// Takes `&self`, so it cannot run while an upsert holds the store.
    pub fn snapshot_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.conn.backup(DatabaseName::Main, path.as_ref(), None)?;
        debug!("Snapshot of sequence store written to {:?}", path.as_ref());
        Ok(())
    }

    /// Close the connection, surfacing any error on the way out
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e)?;
        Ok(())
    }
}

fn exact_match(tx: &Transaction<'_>, sequence: &str) -> Result<Option<KnownSequence>> {
    let known = tx
        .query_row(
            "SELECT id, sequence, count_of_repeat FROM sequences WHERE sequence = ?1",
            params![sequence],
            known_from_row,
        )
        .optional()?;
    Ok(known)
}

fn all_known(tx: &Transaction<'_>) -> Result<Vec<KnownSequence>> {
    let mut stmt = tx.prepare("SELECT id, sequence, count_of_repeat FROM sequences ORDER BY id")?;
    let rows = stmt.query_map([], known_from_row)?;
    let known = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(known)
}

fn entity_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SequenceEntity> {
    Ok(SequenceEntity {
        id: row.get(0)?,
        sequence: row.get(1)?,
        fixed_sequence: row.get(2)?,
        length: row.get(3)?,
        count: row.get::<_, i64>(4)? as u64,
    })
}

fn known_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<KnownSequence> {
    Ok(KnownSequence {
        id: row.get(0)?,
        sequence: row.get(1)?,
        count: row.get::<_, i64>(2)? as u64,
    })
}
