//! Asynchronous batched processing strategy
//!
//! Replays events by reading CSV batches ahead of the engine: a producer
//! task streams batches into a bounded channel while the consumer applies
//! them to the engine in file order.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── ReplayConfig (batch_size, read_ahead)
//!     ├── AsyncReader (batched CSV reading, producer task)
//!     ├── bounded mpsc channel (read-ahead buffer)
//!     └── MarketEngine (in-order event application)
//! ```
//!
//! # Ordering
//!
//! Marketplace events routinely touch several wallets (delivery rewards,
//! exchange trades), so batches are applied strictly in order on one
//! consumer; the concurrency here overlaps file I/O and parsing with
//! engine work rather than fanning application out. All balance mutations
//! serialize through the engine.

use crate::config::EngineConfig;
use crate::core::MarketEngine;
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_wallets_csv;
use crate::strategy::ProcessingStrategy;
use crate::types::MarketEvent;
use std::io::Write;
use std::path::Path;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::warn;

/// Configuration for batched replay
#[derive(Clone, Debug)]
pub struct ReplayConfig {
    /// Number of events per batch
    pub batch_size: usize,
    /// Number of batches buffered ahead of the engine
    pub read_ahead: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            read_ahead: 4,
        }
    }
}

impl ReplayConfig {
    /// Create a ReplayConfig, falling back to defaults for zero values
    pub fn new(batch_size: usize, read_ahead: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                "Invalid batch_size (0), using default ({})",
                default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let read_ahead = if read_ahead == 0 {
            warn!(
                "Invalid read_ahead (0), using default ({})",
                default.read_ahead
            );
            default.read_ahead
        } else {
            read_ahead
        };

        Self {
            batch_size,
            read_ahead,
        }
    }
}

/// Asynchronous batched replay strategy
///
/// Produces output identical to the synchronous strategy for the same
/// input; only the I/O overlap differs.
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    engine_config: EngineConfig,
    config: ReplayConfig,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy with the given configuration
    pub fn new(engine_config: EngineConfig, config: ReplayConfig) -> Self {
        Self {
            engine_config,
            config,
        }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay events from the input file and write wallet states to output
    ///
    /// Builds a multi-threaded tokio runtime, spawns the batch producer,
    /// applies batches in order, and writes the final wallet states.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to build tokio runtime: {}", e))?;

        let engine_config = self.engine_config.clone();
        let batch_size = self.config.batch_size;
        let read_ahead = self.config.read_ahead.max(1);
        let path = input_path.to_path_buf();

        let wallets = runtime.block_on(async move {
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;
            let mut reader = AsyncReader::new(file.compat());

            let (tx, mut rx) = tokio::sync::mpsc::channel::<Vec<MarketEvent>>(read_ahead);
            let producer = tokio::spawn(async move {
                loop {
                    let batch = reader.read_batch(batch_size).await;
                    if batch.is_empty() {
                        break;
                    }
                    // consumer dropped: stop reading
                    if tx.send(batch).await.is_err() {
                        break;
                    }
                }
            });

            let mut engine = MarketEngine::new(engine_config);
            while let Some(batch) = rx.recv().await {
                for event in batch {
                    if let Err(e) = engine.process(event) {
                        warn!("Event rejected: {}", e);
                    }
                }
            }

            producer
                .await
                .map_err(|e| format!("Reader task failed: {}", e))?;
            Ok::<_, String>(engine.wallets_snapshot())
        })?;

        write_wallets_csv(&wallets, output)
    }
}
