//! Processing strategy module for event replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing CSV event input, engine processing and wallet-state
//! output. This allows different implementations (synchronous streaming,
//! asynchronous batched) to be selected at runtime.

use crate::cli::StrategyType;
use crate::config::EngineConfig;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, ReplayConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
///
/// Each strategy reads marketplace events from a CSV file, applies them to
/// a fresh engine, and writes the final wallet states to output. Both
/// strategies apply events in file order, so they produce identical output
/// for identical input.
pub trait ProcessingStrategy: Send + Sync {
    /// Replay events from the input file and write wallet states to output
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the input CSV file containing events
    /// * `output` - Mutable reference to a writer for the wallet states
    ///
    /// # Returns
    ///
    /// * `Ok(())` if replay completed (possibly with rejected events)
    /// * `Err(String)` if a fatal error occurred (file not found, I/O
    ///   error, runtime construction failure)
    ///
    /// Individual event rejections are logged and skipped; replay
    /// continues with the next event.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of strategy to create (Sync or Async)
/// * `engine_config` - Engine parameters for the replay
/// * `replay` - Optional batching configuration (ignored for sync)
///
/// # Returns
///
/// A boxed trait object implementing the ProcessingStrategy trait
pub fn create_strategy(
    strategy_type: StrategyType,
    engine_config: EngineConfig,
    replay: Option<ReplayConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(engine_config)),
        StrategyType::Async => {
            let replay = replay.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(engine_config, replay))
        }
    }
}
