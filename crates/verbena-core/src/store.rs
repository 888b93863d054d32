//! Durable RSVP registration store.
//!
//! Records are append-only and live in a redb table under one fixed key as a
//! JSON-serialized ordered array; the collection survives restarts and is
//! never mutated or deleted by the engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::{info, warn};

use crate::error::{VerbenaError, VerbenaResult};
use crate::types::RsvpRecord;

const REGISTRATIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("registrations");

/// Fixed storage key the record array lives under
const REGISTRATIONS_KEY: &str = "birthday-rsvp";

/// CSV header row for exports
pub const CSV_HEADER: &str = "Nombre,Fecha de Registro,Hora de Registro,Timestamp";

/// Base name for export files; the current date is appended
const EXPORT_BASENAME: &str = "invitados-cumpleanos";

/// Registration storage using redb for ACID-compliant persistence
pub struct RegistrationStore {
    db: Arc<RwLock<Database>>,
}

impl RegistrationStore {
    /// Create or open the store at the given path.
    pub fn new(path: impl AsRef<Path>) -> VerbenaResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(REGISTRATIONS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }

    /// Append a record for `name`.
    ///
    /// The name is re-trimmed defensively; an empty result is rejected.
    /// Only the persistence outcome is reported — the store never touches
    /// the network.
    pub fn record(&self, name: &str) -> VerbenaResult<RsvpRecord> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(VerbenaError::InvalidName(
                "name is empty after trimming".to_string(),
            ));
        }

        let mut records = self.read_records()?;
        let record = RsvpRecord::new(trimmed);
        records.push(record.clone());
        self.write_records(&records)?;

        info!(name = %record.name, id = %record.id, "registration saved");
        Ok(record)
    }

    /// All records, oldest first.
    ///
    /// Absent or unreadable storage degrades to an empty list rather than
    /// an error.
    pub fn list(&self) -> Vec<RsvpRecord> {
        match self.read_records() {
            Ok(records) => records,
            Err(err) => {
                warn!(%err, "could not read registrations, returning empty list");
                Vec::new()
            }
        }
    }

    pub fn count(&self) -> usize {
        self.list().len()
    }

    /// CSV text for `records`; `None` when there is nothing to export.
    pub fn to_csv(records: &[RsvpRecord]) -> Option<String> {
        if records.is_empty() {
            return None;
        }
        let mut csv = String::from(CSV_HEADER);
        csv.push('\n');
        for record in records {
            let name = record.name.replace('"', "\"\"");
            csv.push_str(&format!(
                "\"{}\",\"{}\",\"{}\",\"{}\"\n",
                name,
                record.date,
                record.time,
                record.timestamp.to_rfc3339()
            ));
        }
        Some(csv)
    }

    /// Pretty-printed JSON for `records`; `None` when there is nothing to
    /// export.
    pub fn to_json(records: &[RsvpRecord]) -> VerbenaResult<Option<String>> {
        if records.is_empty() {
            return Ok(None);
        }
        serde_json::to_string_pretty(records)
            .map(Some)
            .map_err(|e| VerbenaError::Serialization(e.to_string()))
    }

    /// Write a dated CSV export into `dir`.
    ///
    /// Returns `Ok(None)` without creating a file when the collection is
    /// empty.
    pub fn export_csv(&self, dir: &Path) -> VerbenaResult<Option<PathBuf>> {
        let records = self.list();
        let Some(csv) = Self::to_csv(&records) else {
            return Ok(None);
        };
        let path = dir.join(Self::export_file_name("csv"));
        std::fs::write(&path, csv)?;
        info!(count = records.len(), path = %path.display(), "CSV exported");
        Ok(Some(path))
    }

    /// Write a dated JSON export into `dir`; `Ok(None)` when empty.
    pub fn export_json(&self, dir: &Path) -> VerbenaResult<Option<PathBuf>> {
        let records = self.list();
        let Some(json) = Self::to_json(&records)? else {
            return Ok(None);
        };
        let path = dir.join(Self::export_file_name("json"));
        std::fs::write(&path, json)?;
        info!(count = records.len(), path = %path.display(), "JSON exported");
        Ok(Some(path))
    }

    fn export_file_name(ext: &str) -> String {
        format!(
            "{}-{}.{}",
            EXPORT_BASENAME,
            Local::now().format("%d-%m-%Y"),
            ext
        )
    }

    fn read_records(&self) -> VerbenaResult<Vec<RsvpRecord>> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(REGISTRATIONS_TABLE)?;

        match table.get(REGISTRATIONS_KEY)? {
            Some(value) => match serde_json::from_slice(value.value()) {
                Ok(records) => Ok(records),
                Err(err) => {
                    warn!(%err, "stored registrations are corrupt, treating as empty");
                    Ok(Vec::new())
                }
            },
            None => Ok(Vec::new()),
        }
    }

    fn write_records(&self, records: &[RsvpRecord]) -> VerbenaResult<()> {
        let data =
            serde_json::to_vec(records).map_err(|e| VerbenaError::Serialization(e.to_string()))?;
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(REGISTRATIONS_TABLE)?;
            table.insert(REGISTRATIONS_KEY, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
