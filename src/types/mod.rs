//! Types module
//!
//! Core data types used throughout the marketplace engine.

pub mod error;
pub mod event;
pub mod ledger;
pub mod listing;
pub mod order;
pub mod transaction;
pub mod user;
pub mod wallet;

pub use error::MarketError;
pub use event::{EventOp, MarketEvent};
pub use ledger::{Currency, EntryId, LedgerEntry};
pub use listing::{ExchangeListing, ListingId, ListingStatus};
pub use order::{Order, OrderId, OrderStatus};
pub use transaction::{Transaction, TransactionId, TransactionKind, TransactionStatus};
pub use user::{AuthorizedActor, UserCategory, UserId, UserProfile};
pub use wallet::Wallet;
