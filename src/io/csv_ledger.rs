//! Ledger persisted to a CSV file
//!
//! Each append writes one row and flushes, so every entry the engine was told
//! about is on disk before `append` returns. Scans re-read the file from the
//! start, which keeps queries restartable without caching anything.
//!
//! Columns: `sender_id,receiver_id,amount,remarks,timestamp,status`.

use crate::core::ledger::LedgerFilter;
use crate::core::traits::LedgerLog;
use crate::types::{LedgerEntry, LedgerError};
use csv::{ReaderBuilder, WriterBuilder};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

const HEADER: [&str; 6] = [
    "sender_id",
    "receiver_id",
    "amount",
    "remarks",
    "timestamp",
    "status",
];

/// Append-only CSV ledger
#[derive(Debug)]
pub struct CsvLedger {
    path: PathBuf,
    writer: Mutex<csv::Writer<File>>,
}

impl CsvLedger {
    /// Open or create the ledger file, keeping existing entries
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let fresh = file.metadata()?.len() == 0;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if fresh {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        debug!(path = %path.display(), fresh, "Opened CSV ledger");
        Ok(CsvLedger {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerLog for CsvLedger {
    fn append(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        let mut writer = self.writer.lock();
        writer.serialize(&entry)?;
        writer.flush()?;
        Ok(())
    }

    fn scan(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, LedgerError> {
        // Hold the writer so no row is read half-written
        let _writer = self.writer.lock();

        let mut reader = ReaderBuilder::new().from_path(&self.path)?;
        let entries = reader
            .deserialize::<LedgerEntry>()
            .collect::<Result<Vec<_>, _>>()?;

        Ok(filter.select(entries.iter()))
    }
}
