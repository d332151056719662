//! Marketplace Ledger Engine CLI
//!
//! Command-line interface for replaying marketplace events from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- events.csv > wallets.csv
//! cargo run -- --strategy sync events.csv > wallets.csv
//! cargo run -- --strategy async --batch-size 2000 --read-ahead 8 events.csv > wallets.csv
//! cargo run -- --config engine.toml events.csv > wallets.csv
//! ```
//!
//! The program reads event rows from the input CSV file, applies them to
//! the marketplace engine using the selected processing strategy, and
//! writes the final wallet states to stdout. Set `RUST_LOG` to control
//! log verbosity (rejected events are logged at `warn`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, bad configuration, etc.)

use blockmarket_engine::cli;
use blockmarket_engine::config::EngineConfig;
use blockmarket_engine::strategy;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // Log to stderr so stdout stays clean CSV
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parse command-line arguments using clap
    let args = cli::parse_args();

    // Load engine configuration (defaults unless a TOML file is given)
    let engine_config = match &args.config {
        Some(path) => match EngineConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    // Create the appropriate processing strategy based on CLI arguments
    let strategy = {
        let replay = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_replay_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, engine_config, replay)
    };

    // Replay events using the selected strategy; output goes to stdout
    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
