//! Exchange listing types for the marketplace engine
//!
//! A listing is a seller's offer of blocks at a fiat rate per block. The
//! offered blocks are moved out of the seller's spendable balance when the
//! listing is created (an escrow-style hold) and either transfer to the
//! buyer on purchase or return to the seller on cancellation.

use super::user::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Listing identifier
pub type ListingId = u64;

/// Lifecycle status of an exchange listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListingStatus {
    /// Offered for sale; blocks held
    Active,
    /// Purchased; blocks transferred to the buyer (terminal)
    Sold,
    /// Withdrawn by the seller; blocks restored (terminal)
    Cancelled,
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingStatus::Active => write!(f, "ACTIVE"),
            ListingStatus::Sold => write!(f, "SOLD"),
            ListingStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A seller's offer of blocks for sale
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeListing {
    /// Listing ID
    pub id: ListingId,

    /// The selling user
    pub seller: UserId,

    /// Number of blocks offered (held from the seller's balance)
    pub block_amount: Decimal,

    /// Fiat price per block, four-decimal precision
    pub rate_per_block: Decimal,

    /// Minimum purchase bound (informational; a purchase consumes the
    /// whole listing)
    pub min_purchase: Decimal,

    /// Maximum purchase bound (informational)
    pub max_purchase: Decimal,

    /// Current lifecycle status
    pub status: ListingStatus,

    /// The purchasing user, set when the listing sells
    pub buyer: Option<UserId>,

    /// When the listing was created
    pub created_at: DateTime<Utc>,

    /// When the listing last changed state
    pub updated_at: DateTime<Utc>,
}

impl ExchangeListing {
    /// Total fiat cost of the listing, rounded to two decimals
    pub fn fiat_total(&self) -> Decimal {
        (self.block_amount * self.rate_per_block).round_dp(2)
    }
}
