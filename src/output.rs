//! Helpers to write reports, backups and exports
use bio::io::fasta;
use chrono::Local;
use log::{info, warn};
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::store::{SequenceEntity, SequenceStore};

/// Description attached to every record of the new-sequences FASTA
pub const NEW_SEQUENCE_DESC: &str = "New sequence found";

/// `YYYYMMDD_HHMMSS` in local time, used in every artifact name
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// When a backup is taken relative to the writes of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPhase {
    PreUpdate,
    PostUpdate,
}

impl fmt::Display for BackupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupPhase::PreUpdate => write!(f, "pre_update"),
            BackupPhase::PostUpdate => write!(f, "post_update"),
        }
    }
}

pub fn backup_name(phase: BackupPhase, stamp: &str) -> String {
    format!("{}_{}.db", phase, stamp)
}

/// Best-effort snapshot of the store into `result_dir`.
///
/// Failures are logged and swallowed, the run goes on without the backup.
pub fn backup_store(store: &SequenceStore, result_dir: &Path, phase: BackupPhase) -> Option<PathBuf> {
    let path = result_dir.join(backup_name(phase, &timestamp()));
    match store.snapshot_to(&path) {
        Ok(()) => {
            info!("Backup of the database created at {:?}", path);
            Some(path)
        }
        Err(e) => {
            warn!("Failed to create {} database backup: {}", phase, e);
            None
        }
    }
}

/// Write `entities` as CSV with the `ID,Sequence,Fixed Sequence,Length,Count of Repeat` header
pub fn write_csv<W: io::Write>(entities: &[SequenceEntity], buf: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(buf);
    if entities.is_empty() {
        wtr.write_record(&["ID", "Sequence", "Fixed Sequence", "Length", "Count of Repeat"])?;
    }
    for entity in entities {
        wtr.serialize(entity)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_csv<R: io::Read>(buf: R) -> Result<Vec<SequenceEntity>> {
    let mut rdr = csv::Reader::from_reader(buf);
    let entities = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<SequenceEntity>, csv::Error>>()?;
    Ok(entities)
}

/// Dump the whole store to `database_export_{timestamp}.csv` in `result_dir`
pub fn export_csv(store: &SequenceStore, result_dir: &Path) -> Result<PathBuf> {
    let path = result_dir.join(format!("database_export_{}.csv", timestamp()));
    export_csv_to(store, &path)?;
    Ok(path)
}

pub fn export_csv_to(store: &SequenceStore, path: &Path) -> Result<()> {
    let entities = store.export()?;
    let file = File::create(path).map_err(|e| Error::file_io(path, e))?;
    write_csv(&entities, io::BufWriter::new(file))?;
    info!("Database exported to CSV at {:?} ({} sequences)", path, entities.len());
    Ok(())
}

/// A sequence created during a run, with the id of the record it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSequence {
    pub source_id: String,
    pub sequence: String,
}

/// Write newly created sequences to `new_sequences_{timestamp}.fasta`.
///
/// Nothing is written for an empty list.
pub fn write_new_sequences(new: &[NewSequence], result_dir: &Path) -> Result<Option<PathBuf>> {
    if new.is_empty() {
        return Ok(None);
    }
    let path = result_dir.join(format!("new_sequences_{}.fasta", timestamp()));
    let file = File::create(&path).map_err(|e| Error::file_io(&path, e))?;
    let mut writer = fasta::Writer::new(io::BufWriter::new(file));
    for rec in new {
        writer
            .write(&rec.source_id, Some(NEW_SEQUENCE_DESC), rec.sequence.as_bytes())
            .map_err(|e| Error::file_io(&path, e))?;
    }
    writer.flush().map_err(|e| Error::file_io(&path, e))?;
    info!("{} new sequences added and saved to {:?}", new.len(), path);
    Ok(Some(path))
}

/// One line per failed mate pair
pub fn write_failed_pairs<T: Write>(buf: &mut T, failed: &[String]) -> io::Result<()> {
    write!(buf, "{}", failed.join("\n"))
}
