//! Transaction record storage
//!
//! This module provides the `TransactionLog`, the external-facing history
//! of deposits, withdrawals, purchases and rewards. The log's
//! reference index is the idempotency boundary for webhook processing:
//! a payment reference that already exists means the event was processed.
//!
//! The ledger, not this log, is the reconciliation source; the log exists
//! for statements, settlement tracking and duplicate detection.

use crate::types::{
    Currency, OrderId, Transaction, TransactionId, TransactionKind, TransactionStatus, UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Parameters for recording one transaction
///
/// Gathers the record fields so call sites stay readable.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    /// Sending party; `None` for system-generated events
    pub sender: Option<UserId>,
    /// Receiving party; `None` when the platform receives
    pub receiver: Option<UserId>,
    /// The order this transaction settles, if any
    pub order_id: Option<OrderId>,
    /// Amount moved
    pub amount: Decimal,
    /// Currency of the amount
    pub currency: Currency,
    /// Kind of event recorded
    pub kind: TransactionKind,
    /// Settlement status
    pub status: TransactionStatus,
    /// External reference (idempotency key), unique when present
    pub reference: Option<String>,
    /// Human-readable description
    pub description: String,
}

/// Store of transaction records with a reference index
pub struct TransactionLog {
    transactions: Vec<Transaction>,
    by_reference: HashMap<String, usize>,
    next_id: TransactionId,
}

impl TransactionLog {
    /// Create a new, empty log. The first recorded transaction has ID 1.
    pub fn new() -> Self {
        TransactionLog {
            transactions: Vec::new(),
            by_reference: HashMap::new(),
            next_id: 1,
        }
    }

    /// Record one transaction
    ///
    /// If the draft carries a reference, the reference is indexed for later
    /// duplicate checks and settlement lookups. First occurrence wins: a
    /// reference already present keeps pointing at its original record.
    pub(crate) fn record(&mut self, draft: TransactionDraft, now: DateTime<Utc>) -> &Transaction {
        let id = self.next_id;
        self.next_id += 1;

        let index = self.transactions.len();
        if let Some(ref reference) = draft.reference {
            self.by_reference.entry(reference.clone()).or_insert(index);
        }

        self.transactions.push(Transaction {
            id,
            sender: draft.sender,
            receiver: draft.receiver,
            order_id: draft.order_id,
            amount: draft.amount,
            currency: draft.currency,
            kind: draft.kind,
            status: draft.status,
            reference: draft.reference,
            description: draft.description,
            created_at: now,
        });
        self.transactions.last().expect("transaction just pushed")
    }

    /// Look up a transaction by external reference
    pub fn find_by_reference(&self, reference: &str) -> Option<&Transaction> {
        self.by_reference
            .get(reference)
            .map(|&i| &self.transactions[i])
    }

    /// Update the settlement status of the transaction with this reference
    ///
    /// Returns the updated record.
    pub(crate) fn set_status_by_reference(
        &mut self,
        reference: &str,
        status: TransactionStatus,
    ) -> Option<&Transaction> {
        let index = *self.by_reference.get(reference)?;
        self.transactions[index].status = status;
        Some(&self.transactions[index])
    }

    /// All transactions in record order
    pub fn all(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Transactions a user sent, newest first
    pub fn sent_by(&self, user_id: UserId) -> Vec<&Transaction> {
        let mut result: Vec<&Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.sender == Some(user_id))
            .collect();
        result.reverse();
        result
    }

    /// Transactions a user received, newest first
    pub fn received_by(&self, user_id: UserId) -> Vec<&Transaction> {
        let mut result: Vec<&Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.receiver == Some(user_id))
            .collect();
        result.reverse();
        result
    }

    /// Next reference number for locally generated withdrawal references
    pub(crate) fn next_id(&self) -> TransactionId {
        self.next_id
    }
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit_draft(reference: &str) -> TransactionDraft {
        TransactionDraft {
            sender: None,
            receiver: Some(1),
            order_id: None,
            amount: Decimal::new(50000, 2),
            currency: Currency::Fiat,
            kind: TransactionKind::Deposit,
            status: TransactionStatus::Successful,
            reference: Some(reference.to_string()),
            description: "Deposit".into(),
        }
    }

    #[test]
    fn test_record_and_find_by_reference() {
        let mut log = TransactionLog::new();
        log.record(deposit_draft("PSK123"), Utc::now());

        let found = log.find_by_reference("PSK123");
        assert!(found.is_some());
        assert_eq!(found.unwrap().amount, Decimal::new(50000, 2));
        assert!(log.find_by_reference("PSK999").is_none());
    }

    #[test]
    fn test_duplicate_reference_first_wins() {
        let mut log = TransactionLog::new();
        log.record(deposit_draft("PSK123"), Utc::now());

        let mut second = deposit_draft("PSK123");
        second.amount = Decimal::new(99999, 2);
        log.record(second, Utc::now());

        // the index still resolves to the first record
        let found = log.find_by_reference("PSK123").unwrap();
        assert_eq!(found.id, 1);
        assert_eq!(found.amount, Decimal::new(50000, 2));
    }

    #[test]
    fn test_set_status_by_reference() {
        let mut log = TransactionLog::new();
        let mut draft = deposit_draft("WD-000001");
        draft.kind = TransactionKind::Withdrawal;
        draft.status = TransactionStatus::Pending;
        log.record(draft, Utc::now());

        let updated = log.set_status_by_reference("WD-000001", TransactionStatus::Failed);
        assert!(updated.is_some());
        assert_eq!(updated.unwrap().status, TransactionStatus::Failed);

        assert!(log
            .set_status_by_reference("WD-404", TransactionStatus::Failed)
            .is_none());
    }

    #[test]
    fn test_sent_and_received_views() {
        let mut log = TransactionLog::new();
        let mut transfer = deposit_draft("T1");
        transfer.sender = Some(2);
        transfer.receiver = Some(1);
        log.record(transfer, Utc::now());

        assert_eq!(log.sent_by(2).len(), 1);
        assert_eq!(log.received_by(1).len(), 1);
        assert!(log.sent_by(1).is_empty());
    }
}
