//! Exchange listing management
//!
//! This module provides the `ListingBook` holding block-for-sale listings.
//! The blocks behind a listing are debited from the seller's wallet before
//! the listing is inserted, so a listing's `block_amount` is always backed
//! by a hold. Once a listing leaves ACTIVE it can never be consumed again;
//! the single-sale guarantee lives in the `mark_sold` guard.

use crate::types::{ExchangeListing, ListingId, ListingStatus, MarketError, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Store of exchange listings with lifecycle guards
pub struct ListingBook {
    listings: HashMap<ListingId, ExchangeListing>,
    next_id: ListingId,
}

impl ListingBook {
    /// Create a new, empty book. The first listing gets ID 1.
    pub fn new() -> Self {
        ListingBook {
            listings: HashMap::new(),
            next_id: 1,
        }
    }

    /// The ID the next created listing will receive
    ///
    /// The engine needs the ID before the listing exists so the block hold
    /// can reference it in the ledger.
    pub(crate) fn preview_id(&self) -> ListingId {
        self.next_id
    }

    /// Insert an ACTIVE listing
    ///
    /// The caller has already held (debited) `block_amount` from the
    /// seller's wallet.
    pub(crate) fn create(
        &mut self,
        seller: UserId,
        block_amount: Decimal,
        rate_per_block: Decimal,
        now: DateTime<Utc>,
    ) -> &ExchangeListing {
        let id = self.next_id;
        self.next_id += 1;
        self.listings.entry(id).or_insert(ExchangeListing {
            id,
            seller,
            block_amount,
            rate_per_block,
            min_purchase: Decimal::ZERO,
            max_purchase: Decimal::ZERO,
            status: ListingStatus::Active,
            buyer: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a listing by ID
    ///
    /// # Errors
    ///
    /// Returns `ListingNotFound` for unknown IDs.
    pub fn get(&self, id: ListingId) -> Result<&ExchangeListing, MarketError> {
        self.listings
            .get(&id)
            .ok_or(MarketError::ListingNotFound { listing: id })
    }

    /// Consume an ACTIVE listing: ACTIVE → SOLD
    ///
    /// Exactly one purchase can succeed; any later attempt sees SOLD and
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns `ListingUnavailable` unless the listing is ACTIVE.
    pub(crate) fn mark_sold(
        &mut self,
        id: ListingId,
        buyer: UserId,
        now: DateTime<Utc>,
    ) -> Result<&ExchangeListing, MarketError> {
        let listing = self
            .listings
            .get_mut(&id)
            .ok_or(MarketError::ListingNotFound { listing: id })?;
        if listing.status != ListingStatus::Active {
            return Err(MarketError::listing_unavailable(id, listing.status));
        }
        listing.status = ListingStatus::Sold;
        listing.buyer = Some(buyer);
        listing.updated_at = now;
        Ok(listing)
    }

    /// Withdraw an ACTIVE listing: ACTIVE → CANCELLED
    ///
    /// The caller restores the held blocks to the seller.
    ///
    /// # Errors
    ///
    /// Returns `ListingUnavailable` unless the listing is ACTIVE.
    pub(crate) fn mark_cancelled(
        &mut self,
        id: ListingId,
        now: DateTime<Utc>,
    ) -> Result<&ExchangeListing, MarketError> {
        let listing = self
            .listings
            .get_mut(&id)
            .ok_or(MarketError::ListingNotFound { listing: id })?;
        if listing.status != ListingStatus::Active {
            return Err(MarketError::listing_unavailable(id, listing.status));
        }
        listing.status = ListingStatus::Cancelled;
        listing.updated_at = now;
        Ok(listing)
    }

    /// All ACTIVE listings, oldest first
    pub fn active(&self) -> Vec<&ExchangeListing> {
        let mut result: Vec<&ExchangeListing> = self
            .listings
            .values()
            .filter(|l| l.status == ListingStatus::Active)
            .collect();
        result.sort_by_key(|l| l.id);
        result
    }

    /// Every listing regardless of status, oldest first
    pub fn all(&self) -> Vec<&ExchangeListing> {
        let mut result: Vec<&ExchangeListing> = self.listings.values().collect();
        result.sort_by_key(|l| l.id);
        result
    }

    /// Blocks currently held by ACTIVE listings
    ///
    /// Used for platform-wide supply accounting: circulating blocks are
    /// wallet balances plus these holds.
    pub fn held_blocks(&self) -> Decimal {
        self.listings
            .values()
            .filter(|l| l.status == ListingStatus::Active)
            .map(|l| l.block_amount)
            .sum()
    }
}

impl Default for ListingBook {
    fn default() -> Self {
        Self::new()
    }
}
