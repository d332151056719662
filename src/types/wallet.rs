//! Wallet types for the marketplace engine
//!
//! This module defines the per-user wallet holding the block and fiat
//! balances. Wallets are mutated only through `TransferEngine` operations;
//! every balance change is mirrored by exactly one ledger entry.

use super::user::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Per-user wallet state
///
/// One wallet exists per registered user. Balances are fixed-point decimals
/// with two-decimal precision and are never negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Wallet {
    /// The owning user ID
    pub user_id: UserId,

    /// Spendable block balance
    ///
    /// Blocks held by active exchange listings are not part of this balance;
    /// they are moved out when the listing is created and restored on
    /// cancellation.
    pub block_balance: Decimal,

    /// Spendable fiat balance
    pub fiat_balance: Decimal,

    /// Block allocation minted at registration
    ///
    /// Snapshot taken when the wallet is opened; immutable afterwards. Used
    /// as the spend threshold gating fiat withdrawals.
    pub initial_block_allocation: Decimal,

    /// Customer handle at the external payment processor
    pub processor_customer: Option<String>,

    /// Dedicated deposit account reference at the external payment processor
    ///
    /// Inbound deposit webhooks locate the wallet through this reference.
    pub processor_account: Option<String>,

    /// Bank name backing the dedicated account
    pub processor_bank: Option<String>,

    /// When the wallet was opened
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// Open a wallet holding the initial block allocation
    ///
    /// # Arguments
    ///
    /// * `user_id` - The owning user
    /// * `initial_allocation` - Blocks minted at registration
    /// * `created_at` - Wallet opening timestamp
    pub fn open(user_id: UserId, initial_allocation: Decimal, created_at: DateTime<Utc>) -> Self {
        Wallet {
            user_id,
            block_balance: initial_allocation,
            fiat_balance: Decimal::ZERO,
            initial_block_allocation: initial_allocation,
            processor_customer: None,
            processor_account: None,
            processor_bank: None,
            created_at,
        }
    }
}
