//! Transaction record types for the marketplace engine
//!
//! A transaction records a fiat- or block-denominated event between two
//! parties, or between a party and the system. Transactions are the
//! external-facing history; the ledger remains the reconciliation source.
//! The `reference` field is the idempotency key for webhook-driven events.

use super::ledger::Currency;
use super::order::OrderId;
use super::user::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction record identifier
pub type TransactionId = u64;

/// Kind of event a transaction records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Inbound fiat deposit confirmed by the payment processor
    Deposit,
    /// Outbound fiat withdrawal through the payment processor
    Withdrawal,
    /// Escrow funding of a product order
    Purchase,
    /// Block transfer from seller to buyer on delivery confirmation
    DeliveryReward,
    /// Newly minted blocks credited on delivery confirmation
    MinedBlock,
    /// Block sale settled through the exchange
    BlockSale,
    /// Platform fee retained on an exchange trade
    AdminFee,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdrawal => "WITHDRAWAL",
            TransactionKind::Purchase => "PURCHASE",
            TransactionKind::DeliveryReward => "DELIVERY_REWARD",
            TransactionKind::MinedBlock => "MINED_BLOCK",
            TransactionKind::BlockSale => "BLOCK_SALE",
            TransactionKind::AdminFee => "ADMIN_FEE",
        };
        write!(f, "{}", s)
    }
}

/// Settlement status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Awaiting settlement by the payment processor
    Pending,
    /// Settled
    Successful,
    /// Rejected or reversed by the payment processor
    Failed,
}

/// One recorded transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Transaction record ID
    pub id: TransactionId,

    /// Sending party; `None` for system-generated events (minting)
    pub sender: Option<UserId>,

    /// Receiving party; `None` when the platform is the receiver
    pub receiver: Option<UserId>,

    /// The order this transaction settles, if any
    pub order_id: Option<OrderId>,

    /// Amount moved
    pub amount: Decimal,

    /// Currency the amount is denominated in
    pub currency: Currency,

    /// Kind of event recorded
    pub kind: TransactionKind,

    /// Settlement status
    pub status: TransactionStatus,

    /// External reference; unique when present (idempotency key)
    pub reference: Option<String>,

    /// Human-readable description
    pub description: String,

    /// When the transaction was recorded
    pub created_at: DateTime<Utc>,
}
