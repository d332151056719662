//! Order types for the marketplace engine
//!
//! This module defines the product-purchase order and its lifecycle states.
//!
//! # Lifecycle
//!
//! ```text
//! PENDING ──payment confirmed──► ESCROWED ──delivery confirmed──► COMPLETED
//!    │
//!    └──buyer cancels──► CANCELLED
//! ```
//!
//! COMPLETED and CANCELLED are terminal; no transition skips a state.

use super::user::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order identifier
pub type OrderId = u64;

/// Lifecycle status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Created by the buyer; awaiting escrow funding
    Pending,
    /// Payment confirmed by the processor; funds held in escrow
    Escrowed,
    /// Buyer confirmed delivery; rewards distributed (terminal)
    Completed,
    /// Cancelled by the buyer while still pending (terminal)
    Cancelled,
}

impl OrderStatus {
    /// Whether no further transition is accepted from this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::Escrowed => write!(f, "ESCROWED"),
            OrderStatus::Completed => write!(f, "COMPLETED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A buyer's purchase of a product from a seller
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// Order ID
    pub id: OrderId,

    /// The product being purchased (catalog service identifier)
    pub product_id: u64,

    /// The purchasing user
    pub buyer: UserId,

    /// The selling user
    pub seller: UserId,

    /// Agreed total price (unit price x quantity, fiat)
    pub price: Decimal,

    /// Number of units purchased
    pub quantity: u32,

    /// Current lifecycle status
    pub status: OrderStatus,

    /// External payment reference attached when escrow is confirmed
    pub payment_reference: Option<String>,

    /// When the order was created
    pub created_at: DateTime<Utc>,

    /// When delivery was confirmed by the buyer
    pub delivered_at: Option<DateTime<Utc>>,

    /// When the order completed
    pub completed_at: Option<DateTime<Utc>>,

    /// When the order was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Escrowed.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(OrderStatus::Pending.to_string(), "PENDING");
        assert_eq!(OrderStatus::Escrowed.to_string(), "ESCROWED");
        assert_eq!(OrderStatus::Completed.to_string(), "COMPLETED");
        assert_eq!(OrderStatus::Cancelled.to_string(), "CANCELLED");
    }
}
