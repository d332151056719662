//! External payment processor collaborators
//!
//! The processor is an opaque dependency: this module defines the trait the
//! engine consumes (`PaymentProcessor`) and the two flows built on it:
//! wallet account provisioning and fiat withdrawal. Implementations talk
//! HTTP somewhere else; nothing here performs I/O itself.
//!
//! # Ordering
//!
//! Balance mutations never wrap processor calls. Provisioning touches no
//! balances at all. Withdrawal resolves and registers the recipient first,
//! then debits the wallet and records the pending transaction, and only
//! then initiates the transfer; a synchronous initiation failure is
//! compensated by refunding the debit. Only `resolve_bank_account`, an
//! idempotent read, is ever retried. Transfer initiation is never retried.

use crate::core::MarketEngine;
use crate::types::{MarketError, UserId};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Customer handle returned by the processor
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerHandle {
    /// Processor-side customer code
    pub code: String,
}

/// Dedicated deposit account created for a customer
#[derive(Debug, Clone, PartialEq)]
pub struct DedicatedAccount {
    /// Account number deposits arrive through
    pub account_number: String,
    /// Bank backing the account
    pub bank_name: String,
}

/// A resolved bank account, confirmed to exist
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAccount {
    /// Name on the account
    pub account_name: String,
    /// Account number
    pub account_number: String,
    /// Bank code
    pub bank_code: String,
}

/// Transfer recipient registered with the processor
#[derive(Debug, Clone, PartialEq)]
pub struct RecipientHandle {
    /// Processor-side recipient code
    pub code: String,
}

/// Acknowledgement of an initiated transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    /// Reference under which the transfer settles
    pub reference: String,
}

/// The payment processor contract
///
/// All operations are synchronous request/response; failures surface as
/// `MarketError::ExternalService`.
pub trait PaymentProcessor {
    /// Create a customer record
    fn create_customer(&self, user: UserId, phone: &str) -> Result<CustomerHandle, MarketError>;

    /// Create a dedicated deposit account for a customer
    fn create_dedicated_account(
        &self,
        customer: &CustomerHandle,
    ) -> Result<DedicatedAccount, MarketError>;

    /// Resolve a bank account number (idempotent read)
    fn resolve_bank_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<ResolvedAccount, MarketError>;

    /// Register a transfer recipient
    fn create_transfer_recipient(
        &self,
        account: &ResolvedAccount,
    ) -> Result<RecipientHandle, MarketError>;

    /// Initiate an outbound transfer
    ///
    /// The supplied reference is the settlement key echoed by the
    /// processor's webhooks.
    fn initiate_transfer(
        &self,
        recipient: &RecipientHandle,
        amount: Decimal,
        reference: &str,
        reason: &str,
    ) -> Result<TransferReceipt, MarketError>;
}

/// Provision a wallet's deposit account at the processor
///
/// Creates the customer and dedicated account, then stores the linkage on
/// the wallet so inbound deposit webhooks can find it.
///
/// # Errors
///
/// Processor failures surface as `ExternalService` with no wallet change.
pub fn provision_wallet_account(
    engine: &mut MarketEngine,
    processor: &dyn PaymentProcessor,
    user: UserId,
    phone: &str,
) -> Result<DedicatedAccount, MarketError> {
    engine.profile(user)?;

    let customer = processor.create_customer(user, phone)?;
    let account = processor.create_dedicated_account(&customer)?;
    engine.link_processor_account(
        user,
        customer.code,
        account.account_number.clone(),
        account.bank_name.clone(),
    )?;
    info!(user, account = %account.account_number, "deposit account provisioned");
    Ok(account)
}

/// Withdraw fiat to an external bank account
///
/// Flow: check the allocation-spend gate, resolve the bank account (one
/// retry), register the recipient, debit the wallet with a pending
/// withdrawal record, then initiate the transfer. A failed initiation
/// refunds the debit and marks the withdrawal failed before the error is
/// returned.
///
/// # Errors
///
/// * `WithdrawalsLocked` - the user has not yet spent their initial
///   allocation through completed orders
/// * `InsufficientFiatBalance` - the wallet cannot cover the amount
/// * `ExternalService` - a processor call failed
pub fn request_withdrawal(
    engine: &mut MarketEngine,
    processor: &dyn PaymentProcessor,
    user: UserId,
    amount: Decimal,
    account_number: &str,
    bank_code: &str,
) -> Result<TransferReceipt, MarketError> {
    engine.ensure_withdrawals_unlocked(user)?;

    let resolved = match processor.resolve_bank_account(account_number, bank_code) {
        Ok(resolved) => resolved,
        Err(MarketError::ExternalService { .. }) => {
            // resolution is an idempotent read; retry once
            processor.resolve_bank_account(account_number, bank_code)?
        }
        Err(e) => return Err(e),
    };
    let recipient = processor.create_transfer_recipient(&resolved)?;

    let reference = engine.withdraw_fiat(user, amount, None)?;
    match processor.initiate_transfer(
        &recipient,
        amount,
        &reference,
        "Withdrawal from wallet",
    ) {
        Ok(receipt) => {
            info!(user, %amount, reference = %receipt.reference, "transfer initiated");
            Ok(receipt)
        }
        Err(e) => {
            warn!(user, reference = %reference, "transfer initiation failed, refunding");
            engine.settle_withdrawal(&reference, false)?;
            Err(e)
        }
    }
}
