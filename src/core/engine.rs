//! Marketplace engine orchestration
//!
//! This module provides the `MarketEngine` that coordinates the user
//! registry, the order state machine, the exchange listing book and the
//! transfer engine. It is the boundary where authenticated identities are
//! resolved: frozen-user checks, ownership checks and admin capabilities
//! happen here, before any balance-moving call.
//!
//! The engine enforces rules such as:
//! - Frozen users are rejected from every operation
//! - Only the buyer may cancel or confirm delivery of their order
//! - Sellers cannot accept orders above their sales limit
//! - Webhook payloads must authenticate before they touch any balance

use crate::config::EngineConfig;
use crate::core::exchange::ListingBook;
use crate::core::ledger_store::LedgerStore;
use crate::core::orders::OrderBook;
use crate::core::referrals::ReferralBook;
use crate::core::transaction_log::TransactionLog;
use crate::core::transfer::{
    AdjustAction, DeliverySettlement, DepositOutcome, TradeSettlement, TransferEngine,
    WithdrawalSettlement,
};
use crate::core::wallet_store::WalletStore;
use crate::types::{
    AuthorizedActor, EventOp, ExchangeListing, ListingId, ListingStatus, MarketError, MarketEvent,
    Order, OrderId, UserCategory, UserId, UserProfile, Wallet,
};
use crate::webhook::{self, WebhookEvent};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Result of processing one webhook delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A deposit was credited to a wallet
    DepositCredited,
    /// The deposit reference was already processed; nothing changed
    DuplicateDeposit,
    /// A pending withdrawal was marked successful
    WithdrawalConfirmed,
    /// A pending withdrawal failed and the debit was refunded
    WithdrawalRefunded,
    /// The referenced withdrawal was already settled
    AlreadySettled,
    /// The event kind is not consumed by this engine
    Ignored,
}

/// Platform-wide economic summary (admin view)
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformSummary {
    /// Blocks sitting in wallets
    pub wallet_blocks: Decimal,
    /// Blocks held by active listings
    pub held_blocks: Decimal,
    /// Wallet blocks plus listing holds
    pub circulating_blocks: Decimal,
    /// Fiat collected as platform fees
    pub platform_fees: Decimal,
    /// Number of recorded transactions
    pub transactions: usize,
    /// Number of ACTIVE listings
    pub active_listings: usize,
    /// Number of SOLD listings
    pub sold_listings: usize,
}

/// The marketplace engine
///
/// Owns all state and exposes one method per business operation. Methods
/// take `&mut self`, so concurrent callers serialize here, which is the
/// in-process equivalent of per-operation transaction isolation.
pub struct MarketEngine {
    users: HashMap<UserId, UserProfile>,
    transfer: TransferEngine,
    orders: OrderBook,
    listings: ListingBook,
}

impl MarketEngine {
    /// Create an engine with the given configuration
    pub fn new(config: EngineConfig) -> Self {
        MarketEngine {
            users: HashMap::new(),
            transfer: TransferEngine::new(config),
            orders: OrderBook::new(),
            listings: ListingBook::new(),
        }
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Register a user and open their wallet
    ///
    /// Mints the category's initial block allocation with a ledger entry.
    ///
    /// # Errors
    ///
    /// Returns `UserExists` if the ID is already registered.
    pub fn register_user(&mut self, profile: UserProfile) -> Result<(), MarketError> {
        if self.users.contains_key(&profile.id) {
            return Err(MarketError::UserExists { user: profile.id });
        }
        let allocation = self
            .transfer
            .config()
            .initial_allocation(profile.category);
        self.transfer.open_wallet(profile.id, allocation, Utc::now())?;
        self.users.insert(profile.id, profile);
        Ok(())
    }

    /// Look up a registered profile
    pub fn profile(&self, user: UserId) -> Result<&UserProfile, MarketError> {
        self.users
            .get(&user)
            .ok_or(MarketError::UserNotFound { user })
    }

    /// Resolve an authenticated, unfrozen profile
    fn require_active(&self, user: UserId) -> Result<&UserProfile, MarketError> {
        let profile = self.profile(user)?;
        if profile.is_frozen {
            return Err(MarketError::UserFrozen { user });
        }
        Ok(profile)
    }

    /// Build the authorization capability for a user
    pub fn actor(&self, user: UserId) -> Result<AuthorizedActor, MarketError> {
        Ok(AuthorizedActor::for_profile(self.require_active(user)?))
    }

    /// Freeze or unfreeze a user (admin operation)
    ///
    /// # Errors
    ///
    /// Returns `AdminRequired` unless the actor holds admin authority.
    pub fn set_frozen(
        &mut self,
        actor: AuthorizedActor,
        user: UserId,
        frozen: bool,
    ) -> Result<(), MarketError> {
        if !actor.is_admin {
            return Err(MarketError::AdminRequired {
                user: actor.user_id,
            });
        }
        let profile = self
            .users
            .get_mut(&user)
            .ok_or(MarketError::UserNotFound { user })?;
        profile.is_frozen = frozen;
        debug!(admin = actor.user_id, user, frozen, "frozen flag updated");
        Ok(())
    }

    /// Apply a referral: `referred` was brought in by `referrer`
    ///
    /// # Errors
    ///
    /// Returns `ReferralExists` if the referred user already has one
    /// applied, and `UserNotFound` for unknown parties.
    pub fn apply_referral(
        &mut self,
        referred: UserId,
        referrer: UserId,
    ) -> Result<(), MarketError> {
        self.require_active(referred)?;
        self.profile(referrer)?;
        if referrer == referred {
            return Err(MarketError::missing_operand("refer", "a distinct referrer"));
        }
        self.transfer.apply_referral(referrer, referred, Utc::now())
    }

    // ------------------------------------------------------------------
    // Wallet operations
    // ------------------------------------------------------------------

    /// Credit a fiat deposit into a user's wallet
    ///
    /// When a reference is supplied it deduplicates redelivery: a reference
    /// seen before returns `DepositOutcome::Duplicate` without crediting.
    pub fn deposit_fiat(
        &mut self,
        user: UserId,
        amount: Decimal,
        reference: Option<String>,
    ) -> Result<DepositOutcome, MarketError> {
        self.require_active(user)?;
        self.transfer.credit_deposit(
            user,
            amount,
            reference,
            "Deposit".to_string(),
            Utc::now(),
        )
    }

    /// Debit a fiat withdrawal from a user's wallet
    ///
    /// Records a pending withdrawal transaction under the returned
    /// reference; processor webhooks settle it later.
    pub fn withdraw_fiat(
        &mut self,
        user: UserId,
        amount: Decimal,
        reference: Option<String>,
    ) -> Result<String, MarketError> {
        self.require_active(user)?;
        self.transfer
            .initiate_withdrawal(user, amount, reference, Utc::now())
    }

    /// Settle a pending withdrawal by reference
    ///
    /// Normally driven by `handle_webhook`; also used by the withdrawal
    /// flow to compensate a transfer initiation that failed synchronously.
    pub fn settle_withdrawal(
        &mut self,
        reference: &str,
        success: bool,
    ) -> Result<WithdrawalSettlement, MarketError> {
        self.transfer.settle_withdrawal(reference, success, Utc::now())
    }

    /// Check the completed-spend gate protecting withdrawals
    ///
    /// Withdrawals stay locked until the user's completed-order spend
    /// reaches their initial block allocation.
    ///
    /// # Errors
    ///
    /// Returns `WithdrawalsLocked` while the gate is closed.
    pub fn ensure_withdrawals_unlocked(&self, user: UserId) -> Result<(), MarketError> {
        let wallet = self.transfer.wallets().get(user)?;
        let required = wallet.initial_block_allocation;
        let spent = self.orders.completed_spend(user);
        if spent < required {
            return Err(MarketError::WithdrawalsLocked {
                user,
                required,
                spent,
            });
        }
        Ok(())
    }

    /// Record the payment-processor linkage on a user's wallet
    pub fn link_processor_account(
        &mut self,
        user: UserId,
        customer: String,
        account: String,
        bank: String,
    ) -> Result<(), MarketError> {
        self.profile(user)?;
        self.transfer
            .link_processor_account(user, customer, account, bank)
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Create an order in PENDING
    ///
    /// Validates the price and quantity, and the seller's sales limit
    /// (price must not exceed block balance times the configured
    /// multiplier).
    ///
    /// # Returns
    ///
    /// The new order's ID.
    pub fn create_order(
        &mut self,
        buyer: UserId,
        seller: UserId,
        product_id: Option<u64>,
        price: Decimal,
        quantity: u32,
    ) -> Result<OrderId, MarketError> {
        self.require_active(buyer)?;
        self.require_active(seller)?;
        if price <= Decimal::ZERO {
            return Err(MarketError::invalid_amount(price, "create_order"));
        }
        if quantity == 0 {
            return Err(MarketError::invalid_amount(
                Decimal::ZERO,
                "create_order quantity",
            ));
        }
        self.transfer.check_sales_limit(seller, price)?;

        let order = self
            .orders
            .create(product_id, buyer, seller, price, quantity, Utc::now());
        debug!(order = order.id, buyer, seller, %price, "order created");
        Ok(order.id)
    }

    /// Confirm escrow funding of an order (processor callback)
    ///
    /// Re-validates the seller's sales limit before funds are accepted into
    /// escrow, attaches the payment reference, and records the PURCHASE
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the order is PENDING.
    pub fn confirm_order_payment(
        &mut self,
        order_id: OrderId,
        reference: String,
    ) -> Result<(), MarketError> {
        let (seller, buyer, price) = {
            let order = self.orders.get(order_id)?;
            if order.status != crate::types::OrderStatus::Pending {
                return Err(MarketError::invalid_transition(
                    order_id,
                    order.status,
                    "confirm payment for",
                ));
            }
            (order.seller, order.buyer, order.price)
        };
        self.transfer.check_sales_limit(seller, price)?;

        let now = Utc::now();
        self.orders.confirm_payment(order_id, reference.clone())?;
        self.transfer.record_escrow_funding(
            order_id,
            buyer,
            seller,
            price,
            reference,
            now,
        );
        Ok(())
    }

    /// Confirm delivery of an escrowed order (buyer operation)
    ///
    /// Settles the delivery rewards atomically and flips the order to
    /// COMPLETED.
    ///
    /// # Errors
    ///
    /// Returns `ActorMismatch` when the caller is not the buyer and
    /// `InvalidTransition` unless the order is ESCROWED. A failed
    /// settlement (e.g. `InsufficientSellerBalance`) leaves the order
    /// ESCROWED and every balance unchanged.
    pub fn confirm_delivery(
        &mut self,
        actor: UserId,
        order_id: OrderId,
    ) -> Result<DeliverySettlement, MarketError> {
        self.require_active(actor)?;
        let order = {
            let order = self.orders.get(order_id)?;
            if order.buyer != actor {
                return Err(MarketError::actor_mismatch(
                    order.buyer,
                    actor,
                    "confirm delivery",
                ));
            }
            if order.status != crate::types::OrderStatus::Escrowed {
                return Err(MarketError::invalid_transition(
                    order_id,
                    order.status,
                    "confirm delivery of",
                ));
            }
            order.clone()
        };

        let now = Utc::now();
        let settlement = self.transfer.confirm_delivery(&order, now)?;
        self.orders.complete(order_id, now)?;
        Ok(settlement)
    }

    /// Cancel a pending order (buyer operation)
    ///
    /// # Errors
    ///
    /// Returns `ActorMismatch` when the caller is not the buyer and
    /// `InvalidTransition` unless the order is PENDING.
    pub fn cancel_order(&mut self, actor: UserId, order_id: OrderId) -> Result<(), MarketError> {
        self.require_active(actor)?;
        let buyer = self.orders.get(order_id)?.buyer;
        if buyer != actor {
            return Err(MarketError::actor_mismatch(buyer, actor, "cancel order"));
        }
        self.orders.cancel(order_id, Utc::now())?;
        Ok(())
    }

    /// Look up an order
    pub fn order(&self, order_id: OrderId) -> Result<&Order, MarketError> {
        self.orders.get(order_id)
    }

    /// All orders a user bought or sold, newest first
    pub fn orders_for(&self, user: UserId) -> Vec<&Order> {
        self.orders.for_user(user)
    }

    // ------------------------------------------------------------------
    // Exchange
    // ------------------------------------------------------------------

    /// List blocks for sale
    ///
    /// Holds the quantity out of the seller's spendable balance immediately
    /// (ledger debit "listed for sale") and creates the ACTIVE listing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for non-positive quantity or rate and
    /// `InsufficientBlockBalance` when the seller cannot cover the hold.
    pub fn list_blocks(
        &mut self,
        seller: UserId,
        quantity: Decimal,
        rate_per_block: Decimal,
    ) -> Result<ListingId, MarketError> {
        self.require_active(seller)?;
        if quantity <= Decimal::ZERO {
            return Err(MarketError::invalid_amount(quantity, "list_blocks"));
        }
        if rate_per_block <= Decimal::ZERO {
            return Err(MarketError::invalid_amount(rate_per_block, "list_blocks rate"));
        }

        let now = Utc::now();
        let id = self.listings.preview_id();
        self.transfer.debit_blocks(
            seller,
            quantity,
            format!("Listed {} blocks for sale", quantity),
            Some(format!("listing-{}", id)),
            now,
        )?;
        let listing = self.listings.create(seller, quantity, rate_per_block, now);
        debug!(listing = listing.id, seller, %quantity, %rate_per_block, "listing created");
        Ok(listing.id)
    }

    /// Buy a listing (whole-listing purchase)
    ///
    /// Delegates the balance movements to the transfer engine and marks
    /// the listing SOLD. Once consumed, further purchase attempts fail
    /// with `ListingUnavailable`.
    pub fn buy_listing(
        &mut self,
        buyer: UserId,
        listing_id: ListingId,
    ) -> Result<TradeSettlement, MarketError> {
        self.require_active(buyer)?;
        let listing = self.listings.get(listing_id)?.clone();
        // a frozen seller cannot receive trade proceeds
        self.require_active(listing.seller)?;

        let now = Utc::now();
        let settlement = self.transfer.execute_exchange_trade(&listing, buyer, now)?;
        self.listings.mark_sold(listing_id, buyer, now)?;
        Ok(settlement)
    }

    /// Cancel an active listing, restoring the held blocks (seller operation)
    ///
    /// # Errors
    ///
    /// Returns `ActorMismatch` when the caller is not the seller and
    /// `ListingUnavailable` unless the listing is ACTIVE.
    pub fn cancel_listing(
        &mut self,
        actor: UserId,
        listing_id: ListingId,
    ) -> Result<(), MarketError> {
        self.require_active(actor)?;
        let listing = self.listings.get(listing_id)?;
        if listing.seller != actor {
            return Err(MarketError::actor_mismatch(
                listing.seller,
                actor,
                "cancel listing",
            ));
        }
        if listing.status != ListingStatus::Active {
            return Err(MarketError::listing_unavailable(listing_id, listing.status));
        }
        let amount = listing.block_amount;

        let now = Utc::now();
        self.transfer.credit_blocks(
            actor,
            amount,
            format!("Cancelled listing {}, blocks restored", listing_id),
            Some(format!("listing-{}", listing_id)),
            now,
        )?;
        self.listings.mark_cancelled(listing_id, now)?;
        Ok(())
    }

    /// ACTIVE listings, oldest first
    pub fn active_listings(&self) -> Vec<&ExchangeListing> {
        self.listings.active()
    }

    /// Every listing regardless of status, oldest first
    pub fn all_listings(&self) -> Vec<&ExchangeListing> {
        self.listings.all()
    }

    /// Look up a listing
    pub fn listing(&self, listing_id: ListingId) -> Result<&ExchangeListing, MarketError> {
        self.listings.get(listing_id)
    }

    // ------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------

    /// Administrative block balance adjustment
    ///
    /// # Errors
    ///
    /// Returns `AdminRequired` unless the acting user is an admin and
    /// `InsufficientBlockBalance` when a deduction would go negative.
    pub fn adjust_blocks(
        &mut self,
        actor: UserId,
        target: UserId,
        amount: Decimal,
        action: AdjustAction,
    ) -> Result<Decimal, MarketError> {
        let capability = self.actor(actor)?;
        self.profile(target)?;
        self.transfer
            .adjust_balance(capability, target, amount, action, Utc::now())
    }

    /// Platform-wide economic summary (admin view)
    ///
    /// # Errors
    ///
    /// Returns `AdminRequired` unless the actor holds admin authority.
    pub fn platform_summary(
        &self,
        actor: AuthorizedActor,
    ) -> Result<PlatformSummary, MarketError> {
        if !actor.is_admin {
            return Err(MarketError::AdminRequired {
                user: actor.user_id,
            });
        }
        let wallet_blocks: Decimal = self
            .transfer
            .wallets()
            .all_sorted()
            .iter()
            .map(|w| w.block_balance)
            .sum();
        let held_blocks = self.listings.held_blocks();
        let sold_listings = self
            .listings
            .all()
            .iter()
            .filter(|l| l.status == ListingStatus::Sold)
            .count();
        Ok(PlatformSummary {
            wallet_blocks,
            held_blocks,
            circulating_blocks: wallet_blocks + held_blocks,
            platform_fees: self.transfer.platform_fees(),
            transactions: self.transfer.transactions().all().len(),
            active_listings: self.listings.active().len(),
            sold_listings,
        })
    }

    // ------------------------------------------------------------------
    // Webhooks
    // ------------------------------------------------------------------

    /// Process one payment-processor webhook delivery
    ///
    /// Authenticates the raw body against the shared secret, parses the
    /// event, and applies it idempotently: duplicate deposits and
    /// already-settled withdrawals resolve as successes without side
    /// effects.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignature` / `MalformedPayload` for payloads that
    /// fail authentication or parsing (no side effects), and
    /// `AccountNotLinked` when a deposit names an unknown account.
    pub fn handle_webhook(
        &mut self,
        body: &[u8],
        signature: &str,
    ) -> Result<WebhookOutcome, MarketError> {
        webhook::verify_signature(&self.transfer.config().webhook_secret, body, signature)?;

        match webhook::parse_event(body)? {
            WebhookEvent::DepositConfirmed {
                account,
                amount,
                reference,
            } => {
                let user = self
                    .transfer
                    .wallets()
                    .find_by_processor_account(&account)
                    .map(|w| w.user_id)
                    .ok_or(MarketError::AccountNotLinked { account })?;
                let outcome = self.transfer.credit_deposit(
                    user,
                    amount,
                    Some(reference),
                    "Webhook deposit".to_string(),
                    Utc::now(),
                )?;
                Ok(match outcome {
                    DepositOutcome::Credited => WebhookOutcome::DepositCredited,
                    DepositOutcome::Duplicate => WebhookOutcome::DuplicateDeposit,
                })
            }
            WebhookEvent::TransferSucceeded { reference } => {
                match self.transfer.settle_withdrawal(&reference, true, Utc::now())? {
                    WithdrawalSettlement::Confirmed => Ok(WebhookOutcome::WithdrawalConfirmed),
                    _ => Ok(WebhookOutcome::AlreadySettled),
                }
            }
            WebhookEvent::TransferFailed { reference } => {
                match self.transfer.settle_withdrawal(&reference, false, Utc::now())? {
                    WithdrawalSettlement::Refunded(_) => Ok(WebhookOutcome::WithdrawalRefunded),
                    _ => Ok(WebhookOutcome::AlreadySettled),
                }
            }
            WebhookEvent::Unrecognized { event } => {
                warn!(event = %event, "ignoring unrecognized webhook event");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Wallet state (read-only)
    pub fn wallets(&self) -> &WalletStore {
        self.transfer.wallets()
    }

    /// The append-only ledger (read-only)
    pub fn ledger(&self) -> &LedgerStore {
        self.transfer.ledger()
    }

    /// The transaction log (read-only)
    pub fn transactions(&self) -> &TransactionLog {
        self.transfer.transactions()
    }

    /// The referral registry (read-only)
    pub fn referrals(&self) -> &ReferralBook {
        self.transfer.referrals()
    }

    /// Fiat collected as platform fees
    pub fn platform_fees(&self) -> Decimal {
        self.transfer.platform_fees()
    }

    /// Owned snapshot of every wallet, sorted by user ID
    pub fn wallets_snapshot(&self) -> Vec<Wallet> {
        self.transfer
            .wallets()
            .all_sorted()
            .into_iter()
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Replay dispatch
    // ------------------------------------------------------------------

    /// Process a single replay event
    ///
    /// Routes the event to the matching engine operation, validating that
    /// the operands its operation requires are present.
    ///
    /// # Errors
    ///
    /// Returns `MissingOperand` for events with absent operands, plus
    /// whatever the routed operation rejects.
    pub fn process(&mut self, event: MarketEvent) -> Result<(), MarketError> {
        match event.op {
            EventOp::Register => {
                let detail = event
                    .detail
                    .ok_or_else(|| MarketError::missing_operand("register", "a category"))?;
                let (category_str, admin) = match detail.split_once('+') {
                    Some((category, "admin")) => (category.to_string(), true),
                    _ => (detail, false),
                };
                let category = UserCategory::parse(&category_str).ok_or_else(|| {
                    MarketError::missing_operand(
                        "register",
                        "a valid category (individual|venture|company)",
                    )
                })?;
                let mut profile = UserProfile::new(event.actor, category);
                profile.is_admin = admin;
                self.register_user(profile)
            }
            EventOp::Refer => {
                let referrer = event
                    .target
                    .ok_or_else(|| MarketError::missing_operand("refer", "a referrer"))?;
                self.apply_referral(event.actor, referrer)
            }
            EventOp::Deposit => {
                let amount = event
                    .amount
                    .ok_or_else(|| MarketError::missing_operand("deposit", "an amount"))?;
                self.deposit_fiat(event.actor, amount, event.detail)
                    .map(|_| ())
            }
            EventOp::Withdraw => {
                let amount = event
                    .amount
                    .ok_or_else(|| MarketError::missing_operand("withdraw", "an amount"))?;
                self.withdraw_fiat(event.actor, amount, event.detail)
                    .map(|_| ())
            }
            EventOp::Order => {
                let seller = event
                    .target
                    .ok_or_else(|| MarketError::missing_operand("order", "a seller"))?;
                let price = event
                    .amount
                    .ok_or_else(|| MarketError::missing_operand("order", "a price"))?;
                self.create_order(event.actor, seller, None, price, 1)
                    .map(|_| ())
            }
            EventOp::Pay => {
                let order = event
                    .target
                    .ok_or_else(|| MarketError::missing_operand("pay", "an order"))?;
                let reference = event
                    .detail
                    .ok_or_else(|| MarketError::missing_operand("pay", "a payment reference"))?;
                self.confirm_order_payment(order, reference)
            }
            EventOp::Deliver => {
                let order = event
                    .target
                    .ok_or_else(|| MarketError::missing_operand("deliver", "an order"))?;
                self.confirm_delivery(event.actor, order).map(|_| ())
            }
            EventOp::CancelOrder => {
                let order = event
                    .target
                    .ok_or_else(|| MarketError::missing_operand("cancel_order", "an order"))?;
                self.cancel_order(event.actor, order)
            }
            EventOp::List => {
                let quantity = event
                    .amount
                    .ok_or_else(|| MarketError::missing_operand("list", "a quantity"))?;
                let rate = event
                    .rate
                    .ok_or_else(|| MarketError::missing_operand("list", "a rate"))?;
                self.list_blocks(event.actor, quantity, rate).map(|_| ())
            }
            EventOp::Buy => {
                let listing = event
                    .target
                    .ok_or_else(|| MarketError::missing_operand("buy", "a listing"))?;
                self.buy_listing(event.actor, listing).map(|_| ())
            }
            EventOp::CancelListing => {
                let listing = event
                    .target
                    .ok_or_else(|| MarketError::missing_operand("cancel_listing", "a listing"))?;
                self.cancel_listing(event.actor, listing)
            }
            EventOp::AdjustAdd | EventOp::AdjustDeduct => {
                let target = event
                    .target
                    .ok_or_else(|| MarketError::missing_operand("adjust", "a target user"))?;
                let amount = event
                    .amount
                    .ok_or_else(|| MarketError::missing_operand("adjust", "an amount"))?;
                let action = if event.op == EventOp::AdjustAdd {
                    AdjustAction::Add
                } else {
                    AdjustAction::Deduct
                };
                self.adjust_blocks(event.actor, target, amount, action)
                    .map(|_| ())
            }
            EventOp::Freeze | EventOp::Unfreeze => {
                let target = event
                    .target
                    .ok_or_else(|| MarketError::missing_operand("freeze", "a target user"))?;
                let capability = self.actor(event.actor)?;
                self.set_frozen(capability, target, event.op == EventOp::Freeze)
            }
        }
    }
}

impl Default for MarketEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
