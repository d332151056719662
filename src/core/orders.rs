//! Order lifecycle management
//!
//! This module provides the `OrderBook`, the state machine behind product
//! purchases. Transitions are guarded here; the `MarketEngine` performs
//! identity checks (is the caller the buyer?) and invokes the transfer
//! engine for the balance movements a transition triggers.
//!
//! Valid transitions: PENDING → ESCROWED → COMPLETED, PENDING → CANCELLED.
//! Every other request is rejected with `InvalidTransition` and leaves the
//! order untouched.

use crate::types::{MarketError, Order, OrderId, OrderStatus, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Store of orders with transition guards
pub struct OrderBook {
    orders: HashMap<OrderId, Order>,
    next_id: OrderId,
    /// Total price of completed orders per buyer, feeding the
    /// withdrawal gate
    completed_spend: HashMap<UserId, Decimal>,
}

impl OrderBook {
    /// Create a new, empty order book. The first order gets ID 1.
    pub fn new() -> Self {
        OrderBook {
            orders: HashMap::new(),
            next_id: 1,
            completed_spend: HashMap::new(),
        }
    }

    /// Create an order in PENDING
    ///
    /// Sales-limit validation happens in the engine before this is called.
    /// When no catalog product ID is supplied the order's own ID stands in.
    pub(crate) fn create(
        &mut self,
        product_id: Option<u64>,
        buyer: UserId,
        seller: UserId,
        price: Decimal,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> &Order {
        let id = self.next_id;
        self.next_id += 1;
        self.orders.entry(id).or_insert(Order {
            id,
            product_id: product_id.unwrap_or(id),
            buyer,
            seller,
            price,
            quantity,
            status: OrderStatus::Pending,
            payment_reference: None,
            created_at: now,
            delivered_at: None,
            completed_at: None,
            cancelled_at: None,
        })
    }

    /// Get an order by ID
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` for unknown IDs.
    pub fn get(&self, id: OrderId) -> Result<&Order, MarketError> {
        self.orders
            .get(&id)
            .ok_or(MarketError::OrderNotFound { order: id })
    }

    /// Attach the payment reference and move PENDING → ESCROWED
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the order is PENDING.
    pub(crate) fn confirm_payment(
        &mut self,
        id: OrderId,
        reference: String,
    ) -> Result<&Order, MarketError> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or(MarketError::OrderNotFound { order: id })?;
        if order.status != OrderStatus::Pending {
            return Err(MarketError::invalid_transition(
                id,
                order.status,
                "confirm payment for",
            ));
        }
        order.status = OrderStatus::Escrowed;
        order.payment_reference = Some(reference);
        Ok(order)
    }

    /// Move ESCROWED → COMPLETED and record the buyer's completed spend
    ///
    /// The transfer engine settles the rewards before this is called; the
    /// engine checks the ESCROWED guard first so the settlement and the
    /// flip cannot diverge.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the order is ESCROWED.
    pub(crate) fn complete(
        &mut self,
        id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<&Order, MarketError> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or(MarketError::OrderNotFound { order: id })?;
        if order.status != OrderStatus::Escrowed {
            return Err(MarketError::invalid_transition(
                id,
                order.status,
                "confirm delivery of",
            ));
        }
        order.status = OrderStatus::Completed;
        order.delivered_at = Some(now);
        order.completed_at = Some(now);

        let spent = self
            .completed_spend
            .entry(order.buyer)
            .or_insert(Decimal::ZERO);
        *spent += order.price;
        Ok(order)
    }

    /// Move PENDING → CANCELLED
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the order is PENDING.
    pub(crate) fn cancel(
        &mut self,
        id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<&Order, MarketError> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or(MarketError::OrderNotFound { order: id })?;
        if order.status != OrderStatus::Pending {
            return Err(MarketError::invalid_transition(id, order.status, "cancel"));
        }
        order.status = OrderStatus::Cancelled;
        order.cancelled_at = Some(now);
        Ok(order)
    }

    /// Total completed-order spend for a buyer
    pub fn completed_spend(&self, buyer: UserId) -> Decimal {
        self.completed_spend
            .get(&buyer)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// All orders a user bought or sold, newest first
    pub fn for_user(&self, user: UserId) -> Vec<&Order> {
        let mut result: Vec<&Order> = self
            .orders
            .values()
            .filter(|o| o.buyer == user || o.seller == user)
            .collect();
        result.sort_by(|a, b| b.id.cmp(&a.id));
        result
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_with_order() -> (OrderBook, OrderId) {
        let mut book = OrderBook::new();
        let id = book
            .create(None, 1, 2, Decimal::new(100000, 2), 1, Utc::now())
            .id;
        (book, id)
    }

    #[test]
    fn test_create_starts_pending() {
        let (book, id) = book_with_order();
        let order = book.get(id).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.payment_reference.is_none());
    }

    #[test]
    fn test_full_lifecycle() {
        let (mut book, id) = book_with_order();

        book.confirm_payment(id, "PSK1".into()).unwrap();
        assert_eq!(book.get(id).unwrap().status, OrderStatus::Escrowed);
        assert_eq!(
            book.get(id).unwrap().payment_reference.as_deref(),
            Some("PSK1")
        );

        book.complete(id, Utc::now()).unwrap();
        let order = book.get(id).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.completed_at.is_some());
        assert_eq!(book.completed_spend(1), Decimal::new(100000, 2));
    }

    #[test]
    fn test_cancel_only_from_pending() {
        let (mut book, id) = book_with_order();
        book.confirm_payment(id, "PSK1".into()).unwrap();

        let result = book.cancel(id, Utc::now());
        assert!(matches!(result, Err(MarketError::InvalidTransition { .. })));
        assert_eq!(book.get(id).unwrap().status, OrderStatus::Escrowed);
    }

    #[test]
    fn test_complete_requires_escrow() {
        // Confirming delivery on a PENDING order is rejected
        let (mut book, id) = book_with_order();
        let result = book.complete(id, Utc::now());
        assert!(matches!(result, Err(MarketError::InvalidTransition { .. })));
        assert_eq!(book.get(id).unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn test_terminal_states_accept_no_transition() {
        let (mut book, id) = book_with_order();
        book.cancel(id, Utc::now()).unwrap();

        assert!(book.confirm_payment(id, "x".into()).is_err());
        assert!(book.complete(id, Utc::now()).is_err());
        assert!(book.cancel(id, Utc::now()).is_err());
    }

    #[test]
    fn test_double_payment_confirmation_rejected() {
        let (mut book, id) = book_with_order();
        book.confirm_payment(id, "PSK1".into()).unwrap();

        let result = book.confirm_payment(id, "PSK2".into());
        assert!(matches!(result, Err(MarketError::InvalidTransition { .. })));
        // first reference survives
        assert_eq!(
            book.get(id).unwrap().payment_reference.as_deref(),
            Some("PSK1")
        );
    }

    #[test]
    fn test_completed_spend_accumulates() {
        let mut book = OrderBook::new();
        for _ in 0..2 {
            let id = book
                .create(None, 1, 2, Decimal::new(50000, 2), 1, Utc::now())
                .id;
            book.confirm_payment(id, format!("ref-{}", id)).unwrap();
            book.complete(id, Utc::now()).unwrap();
        }
        assert_eq!(book.completed_spend(1), Decimal::new(100000, 2));
        assert_eq!(book.completed_spend(2), Decimal::ZERO);
    }

    #[test]
    fn test_for_user_newest_first() {
        let mut book = OrderBook::new();
        book.create(None, 1, 2, Decimal::ONE, 1, Utc::now());
        book.create(None, 3, 1, Decimal::ONE, 1, Utc::now());
        book.create(None, 4, 5, Decimal::ONE, 1, Utc::now());

        let orders = book.for_user(1);
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, 2);
        assert_eq!(orders[1].id, 1);
    }
}
