//! Ledger types for the marketplace engine
//!
//! This module defines the immutable audit record written for every balance
//! change. For any user and currency, replaying all entries in order and
//! summing `change` reproduces the current wallet balance exactly.

use super::user::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger entry identifier
///
/// Assigned monotonically by the ledger store, starting at 1.
pub type EntryId = u64;

/// Currency a balance change is denominated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    /// The platform's internal point currency
    Block,
    /// Wallet fiat balance
    Fiat,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Block => write!(f, "block"),
            Currency::Fiat => write!(f, "fiat"),
        }
    }
}

/// Immutable record of one balance change
///
/// Appended by the transfer engine in the same unit of work as the wallet
/// mutation it mirrors. Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    /// Monotonic entry ID
    pub id: EntryId,

    /// The user whose balance changed
    pub user_id: UserId,

    /// Currency of the balance that changed
    pub currency: Currency,

    /// Signed change amount (positive credit, negative debit)
    pub change: Decimal,

    /// The wallet balance immediately after this change
    pub balance_after: Decimal,

    /// Human-readable reason for the change
    pub reason: String,

    /// Optional external reference (order ID, payment reference, ...)
    pub reference: Option<String>,

    /// When the change was recorded
    pub timestamp: DateTime<Utc>,
}
