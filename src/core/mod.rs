//! Core business logic module
//!
//! Components are layered: the stores (`wallet_store`, `ledger_store`,
//! `transaction_log`, `referrals`) hold state, the `TransferEngine` is the
//! only path that moves balances, the `OrderBook` and `ListingBook` guard
//! their state machines, and the `MarketEngine` wires it all together
//! behind authenticated entry points.

pub mod engine;
pub mod exchange;
pub mod ledger_store;
pub mod orders;
pub mod referrals;
pub mod transaction_log;
pub mod transfer;
pub mod wallet_store;

pub use engine::{MarketEngine, PlatformSummary, WebhookOutcome};
pub use exchange::ListingBook;
pub use ledger_store::{HistoryFilter, LedgerStore};
pub use orders::OrderBook;
pub use referrals::{Referral, ReferralBook};
pub use transaction_log::{TransactionDraft, TransactionLog};
pub use transfer::{
    AdjustAction, DeliverySettlement, DepositOutcome, TradeSettlement, TransferEngine,
    WithdrawalSettlement,
};
pub use wallet_store::WalletStore;
