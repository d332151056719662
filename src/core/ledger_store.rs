//! Append-only ledger storage
//!
//! This module provides the `LedgerStore`, the source of truth for
//! reconciliation. Every balance change committed by the transfer engine
//! appends exactly one entry here; entries are never updated or removed.
//!
//! # Reconciliation
//!
//! For any user and currency, summing `change` over all of that user's
//! entries reproduces the current wallet balance, and every entry's
//! `balance_after` equals the running sum at that point.

use crate::types::{Currency, EntryId, LedgerEntry, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Filters applied to a ledger history query
///
/// All filters are optional; an empty filter returns the full history.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Case-insensitive substring match against the entry reason
    pub reason_contains: Option<String>,

    /// Only entries in this currency
    pub currency: Option<Currency>,

    /// Only entries at or after this instant
    pub from: Option<DateTime<Utc>>,

    /// Only entries at or before this instant
    pub to: Option<DateTime<Utc>>,
}

/// Append-only ledger of balance changes
///
/// Entry IDs start at 1 and increase monotonically with each append.
pub struct LedgerStore {
    entries: Vec<LedgerEntry>,
    next_id: EntryId,
}

impl LedgerStore {
    /// Create a new, empty ledger. The first appended entry will have ID 1.
    pub fn new() -> Self {
        LedgerStore {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Append one balance change
    ///
    /// Called by the transfer engine in the same unit of work as the wallet
    /// write it mirrors; `balance_after` is the balance that write produced.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn append(
        &mut self,
        user_id: UserId,
        currency: Currency,
        change: Decimal,
        balance_after: Decimal,
        reason: String,
        reference: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> &LedgerEntry {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(LedgerEntry {
            id,
            user_id,
            currency,
            change,
            balance_after,
            reason,
            reference,
            timestamp,
        });
        self.entries.last().expect("entry just pushed")
    }

    /// All entries in append order
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Number of entries in the ledger
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// History for one user, newest first
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user whose entries to return
    /// * `filter` - Optional reason/currency/date-range restrictions
    pub fn history(&self, user_id: UserId, filter: &HistoryFilter) -> Vec<&LedgerEntry> {
        let needle = filter
            .reason_contains
            .as_ref()
            .map(|s| s.to_lowercase());

        let mut matched: Vec<&LedgerEntry> = self
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter(|e| filter.currency.map_or(true, |c| e.currency == c))
            .filter(|e| filter.from.map_or(true, |from| e.timestamp >= from))
            .filter(|e| filter.to.map_or(true, |to| e.timestamp <= to))
            .filter(|e| {
                needle
                    .as_ref()
                    .map_or(true, |n| e.reason.to_lowercase().contains(n))
            })
            .collect();

        matched.reverse();
        matched
    }

    /// Sum of all changes for a user in one currency
    ///
    /// By the reconciliation invariant this equals the user's current
    /// wallet balance in that currency.
    pub fn reconcile(&self, user_id: UserId, currency: Currency) -> Decimal {
        self.entries
            .iter()
            .filter(|e| e.user_id == user_id && e.currency == currency)
            .map(|e| e.change)
            .sum()
    }

    /// Verify the running `balance_after` chain for a user and currency
    ///
    /// Returns `true` when every entry's `balance_after` equals the sum of
    /// changes up to and including that entry.
    pub fn chain_consistent(&self, user_id: UserId, currency: Currency) -> bool {
        let mut running = Decimal::ZERO;
        for entry in self
            .entries
            .iter()
            .filter(|e| e.user_id == user_id && e.currency == currency)
        {
            running += entry.change;
            if entry.balance_after != running {
                return false;
            }
        }
        true
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ledger() -> LedgerStore {
        let mut ledger = LedgerStore::new();
        let now = Utc::now();
        ledger.append(
            1,
            Currency::Block,
            Decimal::new(100000, 2),
            Decimal::new(100000, 2),
            "Initial block allocation".into(),
            None,
            now,
        );
        ledger.append(
            1,
            Currency::Block,
            Decimal::new(-20000, 2),
            Decimal::new(80000, 2),
            "Listed 200.00 blocks for sale".into(),
            Some("listing-1".into()),
            now,
        );
        ledger.append(
            2,
            Currency::Fiat,
            Decimal::new(50000, 2),
            Decimal::new(50000, 2),
            "Deposit from payment processor".into(),
            Some("PSK123".into()),
            now,
        );
        ledger
    }

    #[test]
    fn test_append_assigns_monotonic_ids() {
        let ledger = sample_ledger();
        let ids: Vec<EntryId> = ledger.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_history_is_newest_first() {
        let ledger = sample_ledger();
        let history = ledger.history(1, &HistoryFilter::default());
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, 2);
        assert_eq!(history[1].id, 1);
    }

    #[test]
    fn test_history_reason_filter() {
        let ledger = sample_ledger();
        let filter = HistoryFilter {
            reason_contains: Some("listed".into()),
            ..Default::default()
        };
        let history = ledger.history(1, &filter);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, 2);
    }

    #[test]
    fn test_history_currency_filter() {
        let ledger = sample_ledger();
        let filter = HistoryFilter {
            currency: Some(Currency::Fiat),
            ..Default::default()
        };
        assert!(ledger.history(1, &filter).is_empty());
        assert_eq!(ledger.history(2, &filter).len(), 1);
    }

    #[test]
    fn test_reconcile_sums_changes() {
        let ledger = sample_ledger();
        assert_eq!(
            ledger.reconcile(1, Currency::Block),
            Decimal::new(80000, 2)
        );
        assert_eq!(ledger.reconcile(1, Currency::Fiat), Decimal::ZERO);
        assert_eq!(ledger.reconcile(2, Currency::Fiat), Decimal::new(50000, 2));
    }

    #[test]
    fn test_chain_consistency() {
        let ledger = sample_ledger();
        assert!(ledger.chain_consistent(1, Currency::Block));
        assert!(ledger.chain_consistent(2, Currency::Fiat));
        // a user with no entries is trivially consistent
        assert!(ledger.chain_consistent(9, Currency::Block));
    }

    #[test]
    fn test_chain_inconsistency_detected() {
        let mut ledger = LedgerStore::new();
        let now = Utc::now();
        ledger.append(
            1,
            Currency::Block,
            Decimal::new(100, 2),
            Decimal::new(999, 2), // wrong running balance
            "bad entry".into(),
            None,
            now,
        );
        assert!(!ledger.chain_consistent(1, Currency::Block));
    }
}
