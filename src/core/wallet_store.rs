//! Wallet state management
//!
//! This module provides the `WalletStore` which maintains the state of all
//! user wallets. It is owned by the `TransferEngine`; balance mutators are
//! crate-private so no caller outside the transfer path can move money.
//!
//! The WalletStore is responsible for:
//! - Opening wallets with their initial block allocation
//! - Tracking block and fiat balances
//! - Linking wallets to external payment-processor accounts
//! - Providing sorted wallet listings for output

use crate::types::{Currency, MarketError, UserId, Wallet};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Manages all user wallets
///
/// Maintains an in-memory map of user IDs to wallet state. Balance writes
/// happen exclusively through the transfer engine's validated posting
/// batches; this store only checks structural invariants (wallet exists,
/// arithmetic stays in range, balances non-negative).
pub struct WalletStore {
    /// Map of user IDs to wallets
    wallets: HashMap<UserId, Wallet>,
}

impl WalletStore {
    /// Create a new WalletStore with no wallets
    pub fn new() -> Self {
        WalletStore {
            wallets: HashMap::new(),
        }
    }

    /// Open a wallet holding the initial block allocation
    ///
    /// # Arguments
    ///
    /// * `user_id` - The owning user
    /// * `initial_allocation` - Blocks minted at registration
    /// * `now` - Wallet opening timestamp
    ///
    /// # Errors
    ///
    /// Returns `UserExists` if the user already has a wallet.
    pub(crate) fn open(
        &mut self,
        user_id: UserId,
        initial_allocation: Decimal,
        now: DateTime<Utc>,
    ) -> Result<&Wallet, MarketError> {
        if self.wallets.contains_key(&user_id) {
            return Err(MarketError::UserExists { user: user_id });
        }
        let wallet = Wallet::open(user_id, initial_allocation, now);
        Ok(self.wallets.entry(user_id).or_insert(wallet))
    }

    /// Get a wallet by user ID
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if no wallet exists for the user.
    pub fn get(&self, user_id: UserId) -> Result<&Wallet, MarketError> {
        self.wallets
            .get(&user_id)
            .ok_or(MarketError::WalletNotFound { user: user_id })
    }

    /// Current balance in the given currency
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if no wallet exists for the user.
    pub fn balance(&self, user_id: UserId, currency: Currency) -> Result<Decimal, MarketError> {
        let wallet = self.get(user_id)?;
        Ok(match currency {
            Currency::Block => wallet.block_balance,
            Currency::Fiat => wallet.fiat_balance,
        })
    }

    /// Find the wallet linked to an external processor account reference
    pub fn find_by_processor_account(&self, account: &str) -> Option<&Wallet> {
        self.wallets
            .values()
            .find(|w| w.processor_account.as_deref() == Some(account))
    }

    /// Record the payment-processor linkage on a wallet
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if no wallet exists for the user.
    pub(crate) fn link_processor_account(
        &mut self,
        user_id: UserId,
        customer: String,
        account: String,
        bank: String,
    ) -> Result<(), MarketError> {
        let wallet = self
            .wallets
            .get_mut(&user_id)
            .ok_or(MarketError::WalletNotFound { user: user_id })?;
        wallet.processor_customer = Some(customer);
        wallet.processor_account = Some(account);
        wallet.processor_bank = Some(bank);
        Ok(())
    }

    /// Overwrite a balance with a value computed by a validated posting batch
    ///
    /// The transfer engine computes the resulting balance (checked
    /// arithmetic, non-negative) during validation; this write cannot fail
    /// once the wallet's existence has been established.
    ///
    /// # Panics
    ///
    /// Panics if the wallet does not exist. The transfer engine validates
    /// existence before committing, so this indicates a bug in the caller.
    pub(crate) fn commit_balance(&mut self, user_id: UserId, currency: Currency, value: Decimal) {
        let wallet = self
            .wallets
            .get_mut(&user_id)
            .unwrap_or_else(|| panic!("commit for unvalidated wallet {}", user_id));
        match currency {
            Currency::Block => wallet.block_balance = value,
            Currency::Fiat => wallet.fiat_balance = value,
        }
    }

    /// Get all wallets sorted by user ID
    ///
    /// Sorting provides deterministic output for CSV generation.
    pub fn all_sorted(&self) -> Vec<&Wallet> {
        let mut wallets: Vec<&Wallet> = self.wallets.values().collect();
        wallets.sort_by_key(|w| w.user_id);
        wallets
    }
}

impl Default for WalletStore {
    fn default() -> Self {
        Self::new()
    }
}
