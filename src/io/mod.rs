//! I/O module
//!
//! CSV input and output for the replay pipeline, with pluggable sync and
//! async readers over the same format definitions.

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use csv_format::{convert_event_row, write_wallets_csv, EventRow};
pub use sync_reader::SyncReader;
