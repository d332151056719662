//! Synchronous processing strategy
//!
//! Single-threaded replay: streams events from the CSV file one at a time
//! through a `MarketEngine` and writes the final wallet states.
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Event semantics to `MarketEngine` (business logic)
//! - CSV output to `csv_format::write_wallets_csv` (format handling)

use crate::config::EngineConfig;
use crate::core::MarketEngine;
use crate::io::csv_format::write_wallets_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Synchronous replay strategy
///
/// Processes events in file order with constant memory usage; rejected
/// events are logged and skipped.
#[derive(Debug, Clone)]
pub struct SyncProcessingStrategy {
    engine_config: EngineConfig,
}

impl SyncProcessingStrategy {
    /// Create a strategy replaying into an engine with this configuration
    pub fn new(engine_config: EngineConfig) -> Self {
        Self { engine_config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Replay events from the input file and write wallet states to output
    ///
    /// Fatal errors (file not found, I/O errors) are returned immediately.
    /// Individual event errors are logged and replay continues.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let mut engine = MarketEngine::new(self.engine_config.clone());
        let reader = SyncReader::new(input_path)?;

        for result in reader {
            match result {
                Ok(event) => {
                    if let Err(e) = engine.process(event) {
                        warn!("Event rejected: {}", e);
                    }
                }
                Err(e) => {
                    warn!("CSV parsing error: {}", e);
                }
            }
        }

        let wallets = engine.wallets_snapshot();
        write_wallets_csv(&wallets, output)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn strategy() -> SyncProcessingStrategy {
        SyncProcessingStrategy::new(EngineConfig::default())
    }

    #[test]
    fn test_sync_strategy_processes_registration() {
        let csv_content = "op,actor,target,amount,rate,detail\nregister,1,,,,individual\n";
        let file = create_temp_csv(csv_content);
        let mut output = Vec::new();

        strategy().process(file.path(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("user,blocks,fiat,initial_allocation\n"));
        assert!(text.contains("1,100000.00,0.00,100000.00"));
    }

    #[test]
    fn test_sync_strategy_continues_on_rejected_event() {
        // second row lists more blocks than the seller holds
        let csv_content = "op,actor,target,amount,rate,detail\n\
                           register,1,,,,individual\n\
                           list,1,,999999999,5.0000,\n\
                           deposit,1,,250.00,,PSK1\n";
        let file = create_temp_csv(csv_content);
        let mut output = Vec::new();

        strategy().process(file.path(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("1,100000.00,250.00,100000.00"));
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let mut output = Vec::new();
        let result = strategy().process(Path::new("nonexistent.csv"), &mut output);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
