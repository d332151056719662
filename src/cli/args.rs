use crate::strategy::ReplayConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay marketplace events through the ledger engine
#[derive(Parser, Debug)]
#[command(name = "blockmarket-engine")]
#[command(about = "Replay marketplace events through the ledger engine", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing event rows
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy to use for the replay
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for streaming or 'async' for batched"
    )]
    pub strategy: StrategyType,

    /// Number of events per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of events per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of batches buffered ahead of the engine (async mode only)
    #[arg(
        long = "read-ahead",
        value_name = "COUNT",
        help = "Number of batches buffered ahead of the engine (default: 4)"
    )]
    pub read_ahead: Option<usize>,

    /// Optional TOML file overriding the engine configuration
    #[arg(
        long = "config",
        value_name = "FILE",
        help = "Path to a TOML engine configuration file"
    )]
    pub config: Option<PathBuf>,
}

/// Available processing strategies for event replay
#[derive(Clone, Debug, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a ReplayConfig from CLI arguments
    ///
    /// Uses the provided values where present and falls back to defaults,
    /// with zero values rejected back to defaults.
    pub fn to_replay_config(&self) -> ReplayConfig {
        if self.batch_size.is_some() || self.read_ahead.is_some() {
            let default = ReplayConfig::default();
            ReplayConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.read_ahead.unwrap_or(default.read_ahead),
            )
        } else {
            ReplayConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "input.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "input.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        match (&parsed.strategy, &expected) {
            (StrategyType::Sync, StrategyType::Sync) => (),
            (StrategyType::Async, StrategyType::Async) => (),
            _ => panic!("Expected {:?}, got {:?}", expected, parsed.strategy),
        }
    }

    #[rstest]
    #[case::batch_size(&["program", "--batch-size", "2000", "input.csv"], Some(2000), None)]
    #[case::read_ahead(&["program", "--read-ahead", "8", "input.csv"], None, Some(8))]
    #[case::no_options(&["program", "input.csv"], None, None)]
    #[case::all_options(
        &["program", "--strategy", "async", "--batch-size", "2000", "--read-ahead", "8", "input.csv"],
        Some(2000),
        Some(8)
    )]
    fn test_config_options(
        #[case] args: &[&str],
        #[case] batch_size: Option<usize>,
        #[case] read_ahead: Option<usize>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.batch_size, batch_size);
        assert_eq!(parsed.read_ahead, read_ahead);
    }

    #[rstest]
    #[case::all_defaults(&["program", "input.csv"], 1000, 4)]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "input.csv"], 2000, 4)]
    #[case::custom_read_ahead(&["program", "--read-ahead", "8", "input.csv"], 1000, 8)]
    #[case::zero_batch_size_falls_back(&["program", "--batch-size", "0", "input.csv"], 1000, 4)]
    fn test_replay_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_read_ahead: usize,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        let config = parsed.to_replay_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.read_ahead, expected_read_ahead);
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}
