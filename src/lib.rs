//! Marketplace Ledger Engine Library
//! # Overview
//!
//! This library implements the ledger and balance-transfer core of a
//! marketplace platform: users hold wallets with a block (internal point
//! currency) balance and a fiat balance, trade goods through escrowed
//! orders, trade blocks for fiat on a peer-to-peer exchange, and move fiat
//! in and out through an external payment processor.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Wallet, LedgerEntry, Order, ...)
//! - [`config`] - Engine configuration (rates, allocations, webhook secret)
//! - [`cli`] - CLI argument parsing
//! - [`core`] - Business logic components:
//!   - [`core::transfer`] - The transfer engine: atomic, multi-party
//!     balance mutations, each mirrored by ledger entries
//!   - [`core::ledger_store`] - Append-only audit log and reconciliation
//!   - [`core::orders`] - Order state machine (PENDING → ESCROWED →
//!     COMPLETED / CANCELLED)
//!   - [`core::exchange`] - Block sell listings with escrow-style holds
//!   - [`core::engine`] - The authenticated operation boundary
//! - [`webhook`] - Payment-processor webhook verification and parsing
//! - [`payments`] - Payment-processor trait and the flows built on it
//! - [`io`] - CSV replay input/output with pluggable readers
//! - [`strategy`] - Sync and async replay pipelines
//!
//! # Invariants
//!
//! - Balances never go negative; operations that would are rejected whole
//! - Every balance change appends exactly one ledger entry; replaying a
//!   user's entries reproduces their balance (per currency)
//! - Multi-wallet operations commit entirely or not at all
//! - Webhook deliveries are idempotent by external reference

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod payments;
pub mod strategy;
pub mod types;
pub mod webhook;

pub use config::EngineConfig;
pub use core::{
    AdjustAction, DeliverySettlement, DepositOutcome, MarketEngine, PlatformSummary,
    TradeSettlement, TransferEngine, WebhookOutcome, WithdrawalSettlement,
};
pub use io::write_wallets_csv;
pub use types::{
    Currency, ExchangeListing, LedgerEntry, MarketError, MarketEvent, Order, OrderStatus,
    Transaction, UserCategory, UserId, UserProfile, Wallet,
};
