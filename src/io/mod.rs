//! I/O module
//!
//! Handles file formats and the durable ledger.
//!
//! # Components
//!
//! - `csv_format` - Request conversion, account seeds, output serialization
//! - `sync_reader` - Synchronous CSV reader with iterator interface
//! - `async_reader` - Asynchronous CSV reader with batch reading interface
//! - `csv_ledger` - Append-only ledger file

pub mod async_reader;
pub mod csv_format;
pub mod csv_ledger;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_csv_record, read_accounts_csv, write_accounts_csv, write_response_line, CsvRecord,
};
pub use csv_ledger::CsvLedger;
pub use sync_reader::SyncReader;
