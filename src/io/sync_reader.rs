//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over marketplace events from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<MarketEvent, String>` for each CSV row, so replay code can use
//! idiomatic iteration and decide per-row how to handle errors.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row parsing errors are yielded as Err variants with line
//!   numbers for debugging
//!
//! # Memory Efficiency
//!
//! Rows are read one at a time; memory usage does not grow with file size.

use crate::io::csv_format::{convert_event_row, EventRow};
use crate::types::MarketEvent;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV event reader
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader trims whitespace and allows flexible field counts so
    /// rows may omit trailing optional operands.
    ///
    /// # Errors
    ///
    /// Returns an error string if the file could not be opened.
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<MarketEvent, String>;

    /// Get the next event from the CSV file
    ///
    /// # Returns
    ///
    /// * `Some(Ok(MarketEvent))` - Successfully parsed event
    /// * `Some(Err(String))` - Parse or conversion error with line number
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<EventRow>();

        match deserializer.next()? {
            Ok(row) => {
                self.line_num += 1;
                Some(convert_event_row(row).map_err(|e| format!("Line {}: {}", self.line_num + 1, e)))
            }
            Err(e) => {
                self.line_num += 1;
                Some(Err(format!(
                    "Line {}: CSV parse error: {}",
                    self.line_num + 1,
                    e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventOp;
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    const HEADER: &str = "op,actor,target,amount,rate,detail\n";

    #[test]
    fn test_sync_reader_new_fails_on_missing_file() {
        let result = SyncReader::new(Path::new("nonexistent.csv"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_reader_iterates_valid_events() {
        let csv_content = format!(
            "{}register,1,,,,individual\ndeposit,1,,500.00,,PSK123\nlist,1,,200,5.0000,\n",
            HEADER
        );
        let file = create_temp_csv(&csv_content);

        let reader = SyncReader::new(file.path()).unwrap();
        let events: Vec<_> = reader.filter_map(Result::ok).collect();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].op, EventOp::Register);
        assert_eq!(events[0].detail.as_deref(), Some("individual"));
        assert_eq!(events[1].op, EventOp::Deposit);
        assert_eq!(events[1].amount, Some(Decimal::new(50000, 2)));
        assert_eq!(events[2].op, EventOp::List);
        assert_eq!(events[2].rate, Some(Decimal::new(50000, 4)));
    }

    #[test]
    fn test_sync_reader_includes_line_numbers_in_errors() {
        let csv_content = format!(
            "{}register,1,,,,individual\ndeposit,1,,notmoney,,\nregister,2,,,,venture\n",
            HEADER
        );
        let file = create_temp_csv(&csv_content);

        let reader = SyncReader::new(file.path()).unwrap();
        let results: Vec<_> = reader.collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());

        let error = results[1].as_ref().unwrap_err();
        assert!(error.contains("Line 3")); // header occupies line 1
        assert!(error.contains("Invalid amount"));
    }

    #[test]
    fn test_sync_reader_continues_after_error() {
        let csv_content = format!(
            "{}register,1,,,,individual\nchargeback,1,1,,,\nregister,2,,,,company\n",
            HEADER
        );
        let file = create_temp_csv(&csv_content);

        let reader = SyncReader::new(file.path()).unwrap();
        let events: Vec<_> = reader.filter_map(Result::ok).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].actor, 2);
    }

    #[test]
    fn test_sync_reader_handles_whitespace() {
        let csv_content = format!("{}  deposit  , 1 ,, 500.00 ,, PSK1 \n", HEADER);
        let file = create_temp_csv(&csv_content);

        let reader = SyncReader::new(file.path()).unwrap();
        let events: Vec<_> = reader.filter_map(Result::ok).collect();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].amount, Some(Decimal::new(50000, 2)));
        assert_eq!(events[0].detail.as_deref(), Some("PSK1"));
    }

    #[test]
    fn test_sync_reader_empty_file_after_header() {
        let file = create_temp_csv(HEADER);
        let reader = SyncReader::new(file.path()).unwrap();
        assert_eq!(reader.count(), 0);
    }
}
