//! Error types for the marketplace engine
//!
//! This module defines all error types that can occur while processing
//! marketplace operations.
//!
//! # Error Categories
//!
//! - **Validation Errors**: non-positive amounts, unknown categories, etc.
//!   Rejected before any mutation.
//! - **Business-Rule Errors**: insufficient balances, sales-limit breaches,
//!   state-machine guard violations. The operation aborts with no effect.
//! - **Lookup Errors**: user/wallet/order/listing/transaction not found.
//! - **Webhook Errors**: bad signatures and malformed payloads. Duplicate
//!   deliveries are NOT errors; they resolve as already-processed successes.
//! - **External Errors**: payment processor calls that failed or returned a
//!   non-success response.

use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the marketplace engine
///
/// Each variant carries the context needed to diagnose the rejection.
/// Errors raised inside a transfer operation guarantee that no wallet or
/// ledger write from that operation survives.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketError {
    /// Amount operand failed validation (zero, negative, or absent)
    ///
    /// Rejected before any mutation.
    #[error("Invalid amount {amount} for {operation}")]
    InvalidAmount {
        /// The offending amount
        amount: Decimal,
        /// Operation that rejected it
        operation: String,
    },

    /// A required operand was missing from a replay event
    #[error("{operation} requires {operand}")]
    MissingOperand {
        /// Operation that was attempted
        operation: String,
        /// Name of the missing operand
        operand: String,
    },

    /// Debit would drive the block balance negative
    #[error(
        "Insufficient block balance for user {user}: available {available}, requested {requested}"
    )]
    InsufficientBlockBalance {
        /// User ID
        user: u64,
        /// Available block balance
        available: Decimal,
        /// Requested debit amount
        requested: Decimal,
    },

    /// Seller cannot cover the delivery deduction
    ///
    /// The whole delivery confirmation aborts; neither wallet changes.
    #[error(
        "Seller {seller} lacks sufficient block balance: available {available}, required {required}"
    )]
    InsufficientSellerBalance {
        /// Selling user ID
        seller: u64,
        /// Seller's block balance
        available: Decimal,
        /// Deduction the confirmation requires
        required: Decimal,
    },

    /// Debit would drive the fiat balance negative
    #[error(
        "Insufficient fiat balance for user {user}: available {available}, requested {requested}"
    )]
    InsufficientFiatBalance {
        /// User ID
        user: u64,
        /// Available fiat balance
        available: Decimal,
        /// Requested debit amount
        requested: Decimal,
    },

    /// Order price exceeds the seller's sales limit
    ///
    /// The limit is the seller's block balance times a configured multiplier.
    #[error("Price {requested} exceeds sales limit {limit} for seller {seller}")]
    SalesLimitExceeded {
        /// Selling user ID
        seller: u64,
        /// Maximum allowed price
        limit: Decimal,
        /// Requested price
        requested: Decimal,
    },

    /// Order state-machine guard violation
    ///
    /// The order is untouched.
    #[error("Cannot {action} order {order} in status {status}")]
    InvalidTransition {
        /// Order ID
        order: u64,
        /// Current order status
        status: String,
        /// Action that was attempted
        action: String,
    },

    /// Listing is no longer available for purchase or cancellation
    #[error("Listing {listing} is not available (status {status})")]
    ListingUnavailable {
        /// Listing ID
        listing: u64,
        /// Current listing status
        status: String,
    },

    /// No user registered under this ID
    #[error("User {user} not found")]
    UserNotFound {
        /// User ID
        user: u64,
    },

    /// No wallet exists for this user
    #[error("Wallet not found for user {user}")]
    WalletNotFound {
        /// User ID
        user: u64,
    },

    /// No wallet is linked to this processor account reference
    #[error("No wallet linked to processor account '{account}'")]
    AccountNotLinked {
        /// Processor account reference
        account: String,
    },

    /// No order exists under this ID
    #[error("Order {order} not found")]
    OrderNotFound {
        /// Order ID
        order: u64,
    },

    /// No listing exists under this ID
    #[error("Listing {listing} not found")]
    ListingNotFound {
        /// Listing ID
        listing: u64,
    },

    /// No transaction carries this external reference
    #[error("Transaction with reference '{reference}' not found")]
    TransactionNotFound {
        /// External reference
        reference: String,
    },

    /// A user is already registered under this ID
    #[error("User {user} is already registered")]
    UserExists {
        /// User ID
        user: u64,
    },

    /// The referred user already has a referral on record
    #[error("User {referred} already has a referral applied")]
    ReferralExists {
        /// Referred user ID
        referred: u64,
    },

    /// The acting user is frozen
    #[error("User {user} is frozen")]
    UserFrozen {
        /// User ID
        user: u64,
    },

    /// The operation requires admin authority
    #[error("User {user} is not an administrator")]
    AdminRequired {
        /// User ID that attempted the operation
        user: u64,
    },

    /// The acting user does not own the entity they tried to operate on
    #[error("User {actual} cannot {operation}: belongs to user {expected}")]
    ActorMismatch {
        /// Owning user ID
        expected: u64,
        /// Acting user ID
        actual: u64,
        /// Operation that was attempted
        operation: String,
    },

    /// Withdrawals stay locked until the initial allocation is spent
    #[error(
        "Withdrawals locked for user {user}: spent {spent} of required {required} blocks"
    )]
    WithdrawalsLocked {
        /// User ID
        user: u64,
        /// Completed-order spend required before withdrawing
        required: Decimal,
        /// Completed-order spend so far
        spent: Decimal,
    },

    /// Webhook signature did not verify against the shared secret
    ///
    /// The payload is rejected outright with no side effects.
    #[error("Webhook signature verification failed")]
    InvalidSignature,

    /// Webhook payload could not be parsed
    #[error("Malformed webhook payload: {message}")]
    MalformedPayload {
        /// Description of the parse failure
        message: String,
    },

    /// A payment processor call failed or returned non-success
    #[error("Payment processor {operation} failed: {message}")]
    ExternalService {
        /// Processor operation that failed
        operation: String,
        /// Failure description from the processor
        message: String,
    },

    /// Arithmetic overflow would occur
    ///
    /// The operation is rejected to preserve balance integrity.
    #[error("Arithmetic overflow in {operation} for user {user}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// User ID
        user: u64,
    },

    /// Engine configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },
}

// Helper functions for creating common errors

impl MarketError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal, operation: &str) -> Self {
        MarketError::InvalidAmount {
            amount,
            operation: operation.to_string(),
        }
    }

    /// Create a MissingOperand error
    pub fn missing_operand(operation: &str, operand: &str) -> Self {
        MarketError::MissingOperand {
            operation: operation.to_string(),
            operand: operand.to_string(),
        }
    }

    /// Create an InsufficientBlockBalance error
    pub fn insufficient_blocks(user: u64, available: Decimal, requested: Decimal) -> Self {
        MarketError::InsufficientBlockBalance {
            user,
            available,
            requested,
        }
    }

    /// Create an InsufficientFiatBalance error
    pub fn insufficient_fiat(user: u64, available: Decimal, requested: Decimal) -> Self {
        MarketError::InsufficientFiatBalance {
            user,
            available,
            requested,
        }
    }

    /// Create an InvalidTransition error
    pub fn invalid_transition(order: u64, status: impl ToString, action: &str) -> Self {
        MarketError::InvalidTransition {
            order,
            status: status.to_string(),
            action: action.to_string(),
        }
    }

    /// Create a ListingUnavailable error
    pub fn listing_unavailable(listing: u64, status: impl ToString) -> Self {
        MarketError::ListingUnavailable {
            listing,
            status: status.to_string(),
        }
    }

    /// Create an ActorMismatch error
    pub fn actor_mismatch(expected: u64, actual: u64, operation: &str) -> Self {
        MarketError::ActorMismatch {
            expected,
            actual,
            operation: operation.to_string(),
        }
    }

    /// Create an ExternalService error
    pub fn external(operation: &str, message: impl ToString) -> Self {
        MarketError::ExternalService {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, user: u64) -> Self {
        MarketError::ArithmeticOverflow {
            operation: operation.to_string(),
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal::Decimal;

    #[rstest]
    #[case::insufficient_blocks(
        MarketError::InsufficientBlockBalance {
            user: 1,
            available: Decimal::new(30000, 2),
            requested: Decimal::new(50000, 2),
        },
        "Insufficient block balance for user 1: available 300.00, requested 500.00"
    )]
    #[case::insufficient_seller(
        MarketError::InsufficientSellerBalance {
            seller: 2,
            available: Decimal::new(5000, 2),
            required: Decimal::new(10000, 2),
        },
        "Seller 2 lacks sufficient block balance: available 50.00, required 100.00"
    )]
    #[case::insufficient_fiat(
        MarketError::InsufficientFiatBalance {
            user: 3,
            available: Decimal::ZERO,
            requested: Decimal::new(100000, 2),
        },
        "Insufficient fiat balance for user 3: available 0, requested 1000.00"
    )]
    #[case::sales_limit(
        MarketError::SalesLimitExceeded {
            seller: 4,
            limit: Decimal::new(100000, 2),
            requested: Decimal::new(200000, 2),
        },
        "Price 2000.00 exceeds sales limit 1000.00 for seller 4"
    )]
    #[case::invalid_transition(
        MarketError::invalid_transition(9, "PENDING", "confirm delivery of"),
        "Cannot confirm delivery of order 9 in status PENDING"
    )]
    #[case::listing_unavailable(
        MarketError::listing_unavailable(5, "SOLD"),
        "Listing 5 is not available (status SOLD)"
    )]
    #[case::user_frozen(
        MarketError::UserFrozen { user: 8 },
        "User 8 is frozen"
    )]
    #[case::admin_required(
        MarketError::AdminRequired { user: 6 },
        "User 6 is not an administrator"
    )]
    #[case::invalid_signature(
        MarketError::InvalidSignature,
        "Webhook signature verification failed"
    )]
    #[case::external(
        MarketError::external("initiate_transfer", "processor unavailable"),
        "Payment processor initiate_transfer failed: processor unavailable"
    )]
    fn test_error_display(#[case] error: MarketError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::insufficient_blocks(
        MarketError::insufficient_blocks(1, Decimal::ONE, Decimal::TWO),
        MarketError::InsufficientBlockBalance {
            user: 1,
            available: Decimal::ONE,
            requested: Decimal::TWO,
        }
    )]
    #[case::actor_mismatch(
        MarketError::actor_mismatch(1, 2, "cancel"),
        MarketError::ActorMismatch {
            expected: 1,
            actual: 2,
            operation: "cancel".to_string(),
        }
    )]
    fn test_helper_functions(#[case] result: MarketError, #[case] expected: MarketError) {
        assert_eq!(result, expected);
    }
}
