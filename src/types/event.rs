//! Replay event types for the marketplace engine
//!
//! This module defines the event record consumed by the replay pipeline.
//! Each record names an operation, the acting user, and the operands the
//! operation needs; the engine validates arity and semantics when the
//! event is processed.

use super::user::UserId;
use rust_decimal::Decimal;

/// Operations accepted by the replay pipeline
///
/// Each variant maps to one engine entry point. Identifier-style operands
/// (order IDs, listing IDs, counterparty user IDs) travel in the event's
/// `target` field; monetary operands in `amount`/`rate`; strings (category
/// names, payment references) in `detail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOp {
    /// Register a user and open their wallet (`detail` = category)
    Register,
    /// Apply a referral: `actor` was referred by `target`
    Refer,
    /// Credit a fiat deposit (`detail` = external reference)
    Deposit,
    /// Debit a fiat withdrawal (`detail` = external reference)
    Withdraw,
    /// Create an order: `actor` buys from `target` at `amount` total
    Order,
    /// Confirm escrow funding of order `target` (`detail` = payment reference)
    Pay,
    /// Confirm delivery of order `target`
    Deliver,
    /// Cancel pending order `target`
    CancelOrder,
    /// List `amount` blocks for sale at `rate` per block
    List,
    /// Buy listing `target`
    Buy,
    /// Cancel listing `target`, restoring the held blocks
    CancelListing,
    /// Admin credit of `amount` blocks to user `target`
    AdjustAdd,
    /// Admin debit of `amount` blocks from user `target`
    AdjustDeduct,
    /// Admin freeze of user `target`
    Freeze,
    /// Admin unfreeze of user `target`
    Unfreeze,
}

impl EventOp {
    /// Parse an operation from its lowercase snake_case name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "register" => Some(EventOp::Register),
            "refer" => Some(EventOp::Refer),
            "deposit" => Some(EventOp::Deposit),
            "withdraw" => Some(EventOp::Withdraw),
            "order" => Some(EventOp::Order),
            "pay" => Some(EventOp::Pay),
            "deliver" => Some(EventOp::Deliver),
            "cancel_order" => Some(EventOp::CancelOrder),
            "list" => Some(EventOp::List),
            "buy" => Some(EventOp::Buy),
            "cancel_listing" => Some(EventOp::CancelListing),
            "adjust_add" => Some(EventOp::AdjustAdd),
            "adjust_deduct" => Some(EventOp::AdjustDeduct),
            "freeze" => Some(EventOp::Freeze),
            "unfreeze" => Some(EventOp::Unfreeze),
            _ => None,
        }
    }
}

/// One replay event
///
/// Operand presence is validated against the operation when the event is
/// converted from its CSV row (see `io::csv_format`), so downstream code
/// can rely on the operands its operation requires.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketEvent {
    /// The operation to perform
    pub op: EventOp,

    /// The acting (authenticated) user
    pub actor: UserId,

    /// Identifier operand: counterparty, order ID, or listing ID
    pub target: Option<u64>,

    /// Monetary operand with two-decimal precision
    pub amount: Option<Decimal>,

    /// Rate operand with four-decimal precision (listings only)
    pub rate: Option<Decimal>,

    /// String operand: category name or external reference
    pub detail: Option<String>,
}
