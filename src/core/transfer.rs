//! Balance transfer engine
//!
//! This module provides the `TransferEngine`, the only component permitted
//! to change a wallet's block or fiat balance. Every business event is one
//! operation here; each operation builds a batch of postings, validates the
//! entire batch, then commits every wallet write together with its ledger
//! entry. A failed validation leaves no effect.
//!
//! # Atomicity
//!
//! An operation touching N wallets produces N (or more) ledger entries or
//! none at all. Validation computes the resulting balance of every posting
//! up front (wallet exists, balance stays non-negative, arithmetic stays in
//! range); only a fully validated batch reaches the commit phase, and the
//! commit phase cannot fail. Callers hold `&mut TransferEngine`, so
//! concurrent operations serialize at this boundary.

use crate::config::EngineConfig;
use crate::core::ledger_store::LedgerStore;
use crate::core::referrals::ReferralBook;
use crate::core::transaction_log::{TransactionDraft, TransactionLog};
use crate::core::wallet_store::WalletStore;
use crate::types::{
    Currency, ExchangeListing, ListingStatus, MarketError, Order, TransactionKind,
    TransactionStatus, UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// One pending balance change inside an operation
#[derive(Debug, Clone)]
struct Posting {
    user: UserId,
    currency: Currency,
    change: Decimal,
    reason: String,
    reference: Option<String>,
}

/// Direction of an administrative balance adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustAction {
    /// Credit blocks to the user
    Add,
    /// Debit blocks from the user
    Deduct,
}

/// Amounts settled by a delivery confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct DeliverySettlement {
    /// Blocks deducted from the seller (transferred portion)
    pub seller_deduction: Decimal,
    /// Blocks newly minted for the buyer
    pub minted: Decimal,
    /// Total blocks credited to the buyer (transferred + minted)
    pub buyer_credit: Decimal,
    /// Referral reward paid to the buyer's referrer, if one fired
    pub referral_reward: Option<Decimal>,
}

/// Amounts settled by an exchange trade
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSettlement {
    /// Blocks transferred to the buyer
    pub blocks: Decimal,
    /// Total fiat paid by the buyer
    pub fiat_total: Decimal,
    /// Fiat retained by the platform
    pub admin_fee: Decimal,
    /// Fiat credited to the seller
    pub seller_proceeds: Decimal,
}

/// Result of a deposit credit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositOutcome {
    /// The wallet was credited
    Credited,
    /// The reference was already processed; nothing changed
    Duplicate,
}

/// Result of a withdrawal settlement
#[derive(Debug, Clone, PartialEq)]
pub enum WithdrawalSettlement {
    /// The withdrawal was marked successful
    Confirmed,
    /// The withdrawal failed; the debited amount was refunded
    Refunded(Decimal),
    /// The referenced withdrawal was already settled (duplicate delivery)
    AlreadySettled,
}

/// The engine executing atomic, multi-party balance mutations
///
/// Owns the wallet store, the ledger, the transaction log, the referral
/// registry and the platform fee account. `MarketEngine` is the boundary
/// that resolves authenticated identities and frozen flags before calling
/// in here.
pub struct TransferEngine {
    wallets: WalletStore,
    ledger: LedgerStore,
    transactions: TransactionLog,
    referrals: ReferralBook,
    /// Fiat accumulated as platform/admin fees
    platform_fees: Decimal,
    config: EngineConfig,
}

impl TransferEngine {
    /// Create a new engine with no wallets
    pub fn new(config: EngineConfig) -> Self {
        TransferEngine {
            wallets: WalletStore::new(),
            ledger: LedgerStore::new(),
            transactions: TransactionLog::new(),
            referrals: ReferralBook::new(),
            platform_fees: Decimal::ZERO,
            config,
        }
    }

    /// Wallet state (read-only)
    pub fn wallets(&self) -> &WalletStore {
        &self.wallets
    }

    /// The append-only ledger (read-only)
    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    /// The transaction log (read-only)
    pub fn transactions(&self) -> &TransactionLog {
        &self.transactions
    }

    /// The referral registry (read-only)
    pub fn referrals(&self) -> &ReferralBook {
        &self.referrals
    }

    /// Fiat collected as platform fees
    pub fn platform_fees(&self) -> Decimal {
        self.platform_fees
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate a posting batch and commit it
    ///
    /// Phase 1 walks the postings computing each resulting balance with
    /// checked arithmetic, tracking running balances so several postings
    /// against the same wallet validate against each other. Phase 2 writes
    /// the computed balances and appends the mirroring ledger entries;
    /// nothing in phase 2 can fail.
    fn execute(&mut self, postings: Vec<Posting>, now: DateTime<Utc>) -> Result<(), MarketError> {
        // Phase 1: validate, computing balance_after for every posting
        let mut running: HashMap<(UserId, Currency), Decimal> = HashMap::new();
        let mut after = Vec::with_capacity(postings.len());

        for posting in &postings {
            let key = (posting.user, posting.currency);
            let current = match running.get(&key) {
                Some(balance) => *balance,
                None => self.wallets.balance(posting.user, posting.currency)?,
            };

            if posting.change < Decimal::ZERO {
                let requested = -posting.change;
                if current < requested {
                    return Err(match posting.currency {
                        Currency::Block => {
                            MarketError::insufficient_blocks(posting.user, current, requested)
                        }
                        Currency::Fiat => {
                            MarketError::insufficient_fiat(posting.user, current, requested)
                        }
                    });
                }
            }

            let next = current
                .checked_add(posting.change)
                .ok_or_else(|| MarketError::arithmetic_overflow(&posting.reason, posting.user))?;
            running.insert(key, next);
            after.push(next);
        }

        // Phase 2: commit wallet writes and ledger entries together
        for (posting, balance_after) in postings.into_iter().zip(after) {
            self.wallets
                .commit_balance(posting.user, posting.currency, balance_after);
            self.ledger.append(
                posting.user,
                posting.currency,
                posting.change,
                balance_after,
                posting.reason,
                posting.reference,
                now,
            );
        }
        Ok(())
    }

    /// Multiply an amount by a rate, rounded to two decimals
    fn pct(
        &self,
        amount: Decimal,
        rate: Decimal,
        operation: &str,
        user: UserId,
    ) -> Result<Decimal, MarketError> {
        amount
            .checked_mul(rate)
            .map(|v| v.round_dp(2))
            .ok_or_else(|| MarketError::arithmetic_overflow(operation, user))
    }

    /// Reject non-positive amounts before any mutation
    fn require_positive(amount: Decimal, operation: &str) -> Result<(), MarketError> {
        if amount <= Decimal::ZERO {
            return Err(MarketError::invalid_amount(amount, operation));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Wallet lifecycle
    // ------------------------------------------------------------------

    /// Open a wallet and mint the initial block allocation
    ///
    /// Writes the minting ledger entry so the allocation reconciles like
    /// every other balance change.
    ///
    /// # Errors
    ///
    /// Returns `UserExists` if the user already has a wallet.
    pub fn open_wallet(
        &mut self,
        user: UserId,
        allocation: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        self.wallets.open(user, allocation, now)?;
        if allocation > Decimal::ZERO {
            self.ledger.append(
                user,
                Currency::Block,
                allocation,
                allocation,
                "Initial block allocation".to_string(),
                None,
                now,
            );
        }
        info!(user, %allocation, "wallet opened");
        Ok(())
    }

    /// Record the payment-processor account linkage on a wallet
    pub fn link_processor_account(
        &mut self,
        user: UserId,
        customer: String,
        account: String,
        bank: String,
    ) -> Result<(), MarketError> {
        self.wallets
            .link_processor_account(user, customer, account, bank)
    }

    // ------------------------------------------------------------------
    // Elementary movements
    // ------------------------------------------------------------------

    /// Credit blocks to a wallet
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for non-positive amounts and `WalletNotFound`
    /// for unknown users.
    pub fn credit_blocks(
        &mut self,
        user: UserId,
        amount: Decimal,
        reason: String,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        Self::require_positive(amount, "credit_blocks")?;
        self.execute(
            vec![Posting {
                user,
                currency: Currency::Block,
                change: amount,
                reason,
                reference,
            }],
            now,
        )
    }

    /// Debit blocks from a wallet
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBlockBalance` if the debit would drive the
    /// balance negative.
    pub fn debit_blocks(
        &mut self,
        user: UserId,
        amount: Decimal,
        reason: String,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        Self::require_positive(amount, "debit_blocks")?;
        self.execute(
            vec![Posting {
                user,
                currency: Currency::Block,
                change: -amount,
                reason,
                reference,
            }],
            now,
        )
    }

    /// Credit fiat to a wallet
    pub fn credit_fiat(
        &mut self,
        user: UserId,
        amount: Decimal,
        reason: String,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        Self::require_positive(amount, "credit_fiat")?;
        self.execute(
            vec![Posting {
                user,
                currency: Currency::Fiat,
                change: amount,
                reason,
                reference,
            }],
            now,
        )
    }

    /// Debit fiat from a wallet
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFiatBalance` if the debit would drive the
    /// balance negative.
    pub fn debit_fiat(
        &mut self,
        user: UserId,
        amount: Decimal,
        reason: String,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        Self::require_positive(amount, "debit_fiat")?;
        self.execute(
            vec![Posting {
                user,
                currency: Currency::Fiat,
                change: -amount,
                reason,
                reference,
            }],
            now,
        )
    }

    // ------------------------------------------------------------------
    // Business operations
    // ------------------------------------------------------------------

    /// The maximum order price a seller may currently accept
    pub fn sales_limit(&self, seller: UserId) -> Result<Decimal, MarketError> {
        let balance = self.wallets.balance(seller, Currency::Block)?;
        balance
            .checked_mul(self.config.sales_limit_multiplier)
            .ok_or_else(|| MarketError::arithmetic_overflow("sales_limit", seller))
    }

    /// Validate a price against the seller's sales limit
    ///
    /// # Errors
    ///
    /// Returns `SalesLimitExceeded` when the price is above the limit.
    pub fn check_sales_limit(&self, seller: UserId, price: Decimal) -> Result<(), MarketError> {
        let limit = self.sales_limit(seller)?;
        if price > limit {
            return Err(MarketError::SalesLimitExceeded {
                seller,
                limit,
                requested: price,
            });
        }
        Ok(())
    }

    /// Settle a delivery confirmation
    ///
    /// Deducts the transfer portion of the order value from the seller and
    /// credits the buyer with the transfer portion plus an equal minted
    /// portion, in one atomic batch. If the buyer has an unrewarded
    /// referral, the referrer's reward joins the same batch. Writes the
    /// ledger entries and the DELIVERY_REWARD / MINED_BLOCK transaction
    /// records.
    ///
    /// The caller (order machine) is responsible for state guards and for
    /// flipping the order to COMPLETED after this returns.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientSellerBalance` when the seller cannot cover the
    /// deduction; the entire operation aborts with no partial effect.
    pub fn confirm_delivery(
        &mut self,
        order: &Order,
        now: DateTime<Utc>,
    ) -> Result<DeliverySettlement, MarketError> {
        let reward = self.pct(
            order.price,
            self.config.delivery_reward_rate,
            "confirm_delivery",
            order.seller,
        )?;
        let minted = self.pct(
            order.price,
            self.config.mint_rate,
            "confirm_delivery",
            order.buyer,
        )?;
        let buyer_credit = reward
            .checked_add(minted)
            .ok_or_else(|| MarketError::arithmetic_overflow("confirm_delivery", order.buyer))?;

        let seller_balance = self.wallets.balance(order.seller, Currency::Block)?;
        if seller_balance < reward {
            return Err(MarketError::InsufficientSellerBalance {
                seller: order.seller,
                available: seller_balance,
                required: reward,
            });
        }
        // buyer wallet must exist before any posting commits
        self.wallets.get(order.buyer)?;

        let order_ref = format!("order-{}", order.id);
        let mut postings = vec![
            Posting {
                user: order.seller,
                currency: Currency::Block,
                change: -reward,
                reason: format!("Deduction for sale to buyer {}", order.buyer),
                reference: Some(order_ref.clone()),
            },
            Posting {
                user: order.buyer,
                currency: Currency::Block,
                change: buyer_credit,
                reason: format!(
                    "Reward for confirming delivery of product {}",
                    order.product_id
                ),
                reference: Some(order_ref.clone()),
            },
        ];

        // One-time referral reward rides in the same batch
        let referral = match self.referrals.for_referred(order.buyer) {
            Some(r) if !r.rewarded => {
                if self.wallets.get(r.referrer).is_ok() {
                    let reward = self.pct(
                        order.price,
                        self.config.referral_rate,
                        "reward_referrer",
                        r.referrer,
                    )?;
                    postings.push(Posting {
                        user: r.referrer,
                        currency: Currency::Block,
                        change: reward,
                        reason: format!("Referral reward from referred user {}", order.buyer),
                        reference: Some(order_ref.clone()),
                    });
                    Some((r.referrer, reward))
                } else {
                    warn!(
                        referrer = r.referrer,
                        referred = order.buyer,
                        "referrer has no wallet, skipping reward"
                    );
                    None
                }
            }
            _ => None,
        };

        self.execute(postings, now)?;

        self.transactions.record(
            TransactionDraft {
                sender: Some(order.seller),
                receiver: Some(order.buyer),
                order_id: Some(order.id),
                amount: reward,
                currency: Currency::Block,
                kind: TransactionKind::DeliveryReward,
                status: TransactionStatus::Successful,
                reference: None,
                description: format!(
                    "10% transferred from seller to buyer on order {}",
                    order.id
                ),
            },
            now,
        );
        self.transactions.record(
            TransactionDraft {
                sender: None,
                receiver: Some(order.buyer),
                order_id: Some(order.id),
                amount: minted,
                currency: Currency::Block,
                kind: TransactionKind::MinedBlock,
                status: TransactionStatus::Successful,
                reference: None,
                description: format!("10% newly mined block reward for order {}", order.id),
            },
            now,
        );

        if let Some((referrer, amount)) = referral {
            self.referrals.mark_rewarded(order.buyer);
            debug!(referrer, %amount, "referral reward paid");
        }

        info!(
            order = order.id,
            seller = order.seller,
            buyer = order.buyer,
            %reward,
            %minted,
            "delivery confirmed"
        );
        Ok(DeliverySettlement {
            seller_deduction: reward,
            minted,
            buyer_credit,
            referral_reward: referral.map(|(_, amount)| amount),
        })
    }

    /// Settle an exchange trade
    ///
    /// Moves the listing's fiat total from the buyer, splits it between the
    /// seller and the platform fee account, and credits the buyer with the
    /// blocks the listing held. Writes the ledger entries and the
    /// BLOCK_SALE / ADMIN_FEE transaction records.
    ///
    /// The caller (listing engine) flips the listing to SOLD after this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns `ListingUnavailable` if the listing is not ACTIVE and
    /// `InsufficientFiatBalance` if the buyer cannot cover the cost.
    pub fn execute_exchange_trade(
        &mut self,
        listing: &ExchangeListing,
        buyer: UserId,
        now: DateTime<Utc>,
    ) -> Result<TradeSettlement, MarketError> {
        if listing.status != ListingStatus::Active {
            return Err(MarketError::listing_unavailable(listing.id, listing.status));
        }

        let fiat_total = listing.fiat_total();
        let admin_fee = self.pct(fiat_total, self.config.admin_fee_rate, "exchange_trade", buyer)?;
        let seller_proceeds = fiat_total
            .checked_sub(admin_fee)
            .ok_or_else(|| MarketError::arithmetic_overflow("exchange_trade", listing.seller))?;

        let buyer_fiat = self.wallets.balance(buyer, Currency::Fiat)?;
        if buyer_fiat < fiat_total {
            return Err(MarketError::insufficient_fiat(buyer, buyer_fiat, fiat_total));
        }
        self.wallets.get(listing.seller)?;
        let new_platform_fees = self
            .platform_fees
            .checked_add(admin_fee)
            .ok_or_else(|| MarketError::arithmetic_overflow("exchange_trade", buyer))?;

        let listing_ref = format!("listing-{}", listing.id);
        self.execute(
            vec![
                Posting {
                    user: buyer,
                    currency: Currency::Fiat,
                    change: -fiat_total,
                    reason: format!(
                        "Payment for {} blocks from seller {}",
                        listing.block_amount, listing.seller
                    ),
                    reference: Some(listing_ref.clone()),
                },
                Posting {
                    user: listing.seller,
                    currency: Currency::Fiat,
                    change: seller_proceeds,
                    reason: format!("Proceeds from block sale to buyer {}", buyer),
                    reference: Some(listing_ref.clone()),
                },
                Posting {
                    user: buyer,
                    currency: Currency::Block,
                    change: listing.block_amount,
                    reason: format!(
                        "Purchased {} blocks from seller {}",
                        listing.block_amount, listing.seller
                    ),
                    reference: Some(listing_ref.clone()),
                },
            ],
            now,
        )?;
        self.platform_fees = new_platform_fees;

        self.transactions.record(
            TransactionDraft {
                sender: Some(listing.seller),
                receiver: Some(buyer),
                order_id: None,
                amount: listing.block_amount,
                currency: Currency::Block,
                kind: TransactionKind::BlockSale,
                status: TransactionStatus::Successful,
                reference: Some(listing_ref),
                description: format!(
                    "Sold {} blocks at {} per block",
                    listing.block_amount, listing.rate_per_block
                ),
            },
            now,
        );
        self.transactions.record(
            TransactionDraft {
                sender: Some(buyer),
                receiver: None,
                order_id: None,
                amount: admin_fee,
                currency: Currency::Fiat,
                kind: TransactionKind::AdminFee,
                status: TransactionStatus::Successful,
                reference: None,
                description: format!("Platform fee on listing {}", listing.id),
            },
            now,
        );

        info!(
            listing = listing.id,
            seller = listing.seller,
            buyer,
            %fiat_total,
            %admin_fee,
            "exchange trade settled"
        );
        Ok(TradeSettlement {
            blocks: listing.block_amount,
            fiat_total,
            admin_fee,
            seller_proceeds,
        })
    }

    /// Pay the one-time referral reward for a referred buyer
    ///
    /// No-op (not an error) when the buyer has no referral, the referral
    /// was already rewarded, or the referrer has no wallet.
    ///
    /// # Returns
    ///
    /// The reward amount when one was paid.
    pub fn reward_referrer(
        &mut self,
        buyer: UserId,
        transaction_value: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<Decimal>, MarketError> {
        let (referrer, reward) = match self.referrals.for_referred(buyer) {
            Some(r) if !r.rewarded => {
                if self.wallets.get(r.referrer).is_err() {
                    return Ok(None);
                }
                let reward = self.pct(
                    transaction_value,
                    self.config.referral_rate,
                    "reward_referrer",
                    r.referrer,
                )?;
                (r.referrer, reward)
            }
            _ => return Ok(None),
        };

        self.execute(
            vec![Posting {
                user: referrer,
                currency: Currency::Block,
                change: reward,
                reason: format!("Referral reward from referred user {}", buyer),
                reference: None,
            }],
            now,
        )?;
        self.referrals.mark_rewarded(buyer);
        debug!(referrer, %reward, "referral reward paid");
        Ok(Some(reward))
    }

    /// Apply a referral relationship
    ///
    /// # Errors
    ///
    /// Returns `ReferralExists` when the referred user already has one.
    pub fn apply_referral(
        &mut self,
        referrer: UserId,
        referred: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        self.referrals.apply(referrer, referred, now)?;
        Ok(())
    }

    /// Administrative block balance override
    ///
    /// # Arguments
    ///
    /// * `actor` - The authenticated capability; must carry admin authority
    /// * `user` - The wallet to adjust
    /// * `amount` - Blocks to add or deduct
    /// * `action` - Direction of the adjustment
    ///
    /// # Errors
    ///
    /// Returns `AdminRequired` for non-admin actors and
    /// `InsufficientBlockBalance` when a deduction would go negative.
    pub fn adjust_balance(
        &mut self,
        actor: crate::types::AuthorizedActor,
        user: UserId,
        amount: Decimal,
        action: AdjustAction,
        now: DateTime<Utc>,
    ) -> Result<Decimal, MarketError> {
        if !actor.is_admin {
            return Err(MarketError::AdminRequired {
                user: actor.user_id,
            });
        }
        Self::require_positive(amount, "adjust_balance")?;

        let (change, reason) = match action {
            AdjustAction::Add => (amount, "Admin adjustment (add)"),
            AdjustAction::Deduct => (-amount, "Admin adjustment (deduct)"),
        };
        self.execute(
            vec![Posting {
                user,
                currency: Currency::Block,
                change,
                reason: reason.to_string(),
                reference: None,
            }],
            now,
        )?;
        info!(admin = actor.user_id, user, %amount, ?action, "balance adjusted");
        self.wallets.balance(user, Currency::Block)
    }

    /// Record the PURCHASE transaction for a funded escrow
    ///
    /// Escrow funds live at the payment processor, not in wallets, so no
    /// posting accompanies this record.
    pub(crate) fn record_escrow_funding(
        &mut self,
        order_id: crate::types::OrderId,
        buyer: UserId,
        seller: UserId,
        price: Decimal,
        reference: String,
        now: DateTime<Utc>,
    ) {
        self.transactions.record(
            TransactionDraft {
                sender: Some(buyer),
                receiver: Some(seller),
                order_id: Some(order_id),
                amount: price,
                currency: Currency::Fiat,
                kind: TransactionKind::Purchase,
                status: TransactionStatus::Successful,
                reference: Some(reference),
                description: format!("Escrow funded for order {}", order_id),
            },
            now,
        );
    }

    // ------------------------------------------------------------------
    // Deposits and withdrawals
    // ------------------------------------------------------------------

    /// Credit a confirmed fiat deposit
    ///
    /// The reference is the idempotency key: if a transaction already
    /// carries it, the deposit was processed and this call is a no-op
    /// success (`DepositOutcome::Duplicate`).
    pub fn credit_deposit(
        &mut self,
        user: UserId,
        amount: Decimal,
        reference: Option<String>,
        description: String,
        now: DateTime<Utc>,
    ) -> Result<DepositOutcome, MarketError> {
        Self::require_positive(amount, "credit_deposit")?;
        if let Some(ref r) = reference {
            if self.transactions.find_by_reference(r).is_some() {
                debug!(reference = %r, "duplicate deposit, already credited");
                return Ok(DepositOutcome::Duplicate);
            }
        }

        self.execute(
            vec![Posting {
                user,
                currency: Currency::Fiat,
                change: amount,
                reason: "Deposit from payment processor".to_string(),
                reference: reference.clone(),
            }],
            now,
        )?;
        self.transactions.record(
            TransactionDraft {
                sender: None,
                receiver: Some(user),
                order_id: None,
                amount,
                currency: Currency::Fiat,
                kind: TransactionKind::Deposit,
                status: TransactionStatus::Successful,
                reference,
                description,
            },
            now,
        );
        info!(user, %amount, "deposit credited");
        Ok(DepositOutcome::Credited)
    }

    /// Debit fiat for a withdrawal and record the pending transaction
    ///
    /// # Arguments
    ///
    /// * `reference` - External reference; generated locally when absent
    ///
    /// # Returns
    ///
    /// The reference under which the withdrawal settles.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFiatBalance` if the wallet cannot cover it.
    pub fn initiate_withdrawal(
        &mut self,
        user: UserId,
        amount: Decimal,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<String, MarketError> {
        Self::require_positive(amount, "initiate_withdrawal")?;
        let reference =
            reference.unwrap_or_else(|| format!("WD-{:06}", self.transactions.next_id()));

        self.execute(
            vec![Posting {
                user,
                currency: Currency::Fiat,
                change: -amount,
                reason: "Withdrawal to bank account".to_string(),
                reference: Some(reference.clone()),
            }],
            now,
        )?;
        self.transactions.record(
            TransactionDraft {
                sender: Some(user),
                receiver: None,
                order_id: None,
                amount,
                currency: Currency::Fiat,
                kind: TransactionKind::Withdrawal,
                status: TransactionStatus::Pending,
                reference: Some(reference.clone()),
                description: "Withdrawal to bank account".to_string(),
            },
            now,
        );
        info!(user, %amount, reference = %reference, "withdrawal initiated");
        Ok(reference)
    }

    /// Settle a pending withdrawal from a processor notification
    ///
    /// Success marks the transaction successful. Failure marks it failed
    /// and refunds the debited fiat to the originating wallet. A
    /// withdrawal that is no longer pending resolves as `AlreadySettled`
    /// (duplicate delivery is not an error).
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` when no withdrawal carries the
    /// reference.
    pub fn settle_withdrawal(
        &mut self,
        reference: &str,
        success: bool,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalSettlement, MarketError> {
        let (user, amount, status) = match self.transactions.find_by_reference(reference) {
            Some(t) if t.kind == TransactionKind::Withdrawal => {
                (t.sender, t.amount, t.status)
            }
            _ => {
                return Err(MarketError::TransactionNotFound {
                    reference: reference.to_string(),
                })
            }
        };
        if status != TransactionStatus::Pending {
            debug!(reference, "withdrawal already settled");
            return Ok(WithdrawalSettlement::AlreadySettled);
        }

        if success {
            self.transactions
                .set_status_by_reference(reference, TransactionStatus::Successful);
            info!(reference, "withdrawal confirmed");
            return Ok(WithdrawalSettlement::Confirmed);
        }

        // Failure path: refund before flipping the status so a validation
        // error cannot leave the withdrawal marked failed but unrefunded.
        if let Some(user) = user {
            self.execute(
                vec![Posting {
                    user,
                    currency: Currency::Fiat,
                    change: amount,
                    reason: "Withdrawal failed - refund".to_string(),
                    reference: Some(reference.to_string()),
                }],
                now,
            )?;
        }
        self.transactions
            .set_status_by_reference(reference, TransactionStatus::Failed);
        warn!(reference, %amount, "withdrawal failed, refunded");
        Ok(WithdrawalSettlement::Refunded(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthorizedActor, OrderStatus};

    fn engine_with_wallets(balances: &[(UserId, i64)]) -> TransferEngine {
        let mut engine = TransferEngine::new(EngineConfig::default());
        for &(user, blocks) in balances {
            engine
                .open_wallet(user, Decimal::new(blocks * 100, 2), Utc::now())
                .unwrap();
        }
        engine
    }

    fn order(buyer: UserId, seller: UserId, price: i64) -> Order {
        Order {
            id: 1,
            product_id: 1,
            buyer,
            seller,
            price: Decimal::new(price * 100, 2),
            quantity: 1,
            status: OrderStatus::Escrowed,
            payment_reference: Some("PSK1".into()),
            created_at: Utc::now(),
            delivered_at: None,
            completed_at: None,
            cancelled_at: None,
        }
    }

    fn listing(seller: UserId, blocks: i64, rate: Decimal) -> ExchangeListing {
        let now = Utc::now();
        ExchangeListing {
            id: 1,
            seller,
            block_amount: Decimal::new(blocks * 100, 2),
            rate_per_block: rate,
            min_purchase: Decimal::ZERO,
            max_purchase: Decimal::ZERO,
            status: ListingStatus::Active,
            buyer: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_open_wallet_writes_minting_entry() {
        let engine = engine_with_wallets(&[(1, 1000)]);

        assert_eq!(engine.ledger().len(), 1);
        let entry = &engine.ledger().entries()[0];
        assert_eq!(entry.change, Decimal::new(100000, 2));
        assert_eq!(entry.balance_after, Decimal::new(100000, 2));
        assert_eq!(entry.reason, "Initial block allocation");
    }

    #[test]
    fn test_debit_blocks_insufficient() {
        let mut engine = engine_with_wallets(&[(1, 100)]);

        let result = engine.debit_blocks(
            1,
            Decimal::new(20000, 2),
            "test".into(),
            None,
            Utc::now(),
        );
        assert!(matches!(
            result,
            Err(MarketError::InsufficientBlockBalance { user: 1, .. })
        ));
        // balance unchanged
        assert_eq!(
            engine.wallets().balance(1, Currency::Block).unwrap(),
            Decimal::new(10000, 2)
        );
    }

    #[test]
    fn test_credit_rejects_non_positive() {
        let mut engine = engine_with_wallets(&[(1, 100)]);
        let result = engine.credit_blocks(1, Decimal::ZERO, "test".into(), None, Utc::now());
        assert!(matches!(result, Err(MarketError::InvalidAmount { .. })));
    }

    #[test]
    fn test_confirm_delivery_spec_example() {
        // Order of price 1000: seller debited 100 (10%), buyer credited 200
        // (100 transferred + 100 mined); buyer pre-balance 0 -> 200.
        let mut engine = TransferEngine::new(EngineConfig::default());
        engine
            .open_wallet(1, Decimal::ZERO, Utc::now())
            .unwrap(); // buyer
        engine
            .open_wallet(2, Decimal::new(100000, 2), Utc::now())
            .unwrap(); // seller with 1000 blocks

        let settlement = engine.confirm_delivery(&order(1, 2, 1000), Utc::now()).unwrap();

        assert_eq!(settlement.seller_deduction, Decimal::new(10000, 2));
        assert_eq!(settlement.minted, Decimal::new(10000, 2));
        assert_eq!(settlement.buyer_credit, Decimal::new(20000, 2));
        assert_eq!(
            engine.wallets().balance(1, Currency::Block).unwrap(),
            Decimal::new(20000, 2)
        );
        assert_eq!(
            engine.wallets().balance(2, Currency::Block).unwrap(),
            Decimal::new(90000, 2)
        );
        // two ledger entries beyond the seller's allocation entry
        assert_eq!(engine.ledger().len(), 3);
        // conservation: seller debit equals transferred portion of buyer credit
        assert_eq!(
            settlement.buyer_credit - settlement.minted,
            settlement.seller_deduction
        );
        // transaction records
        let kinds: Vec<TransactionKind> =
            engine.transactions().all().iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TransactionKind::DeliveryReward, TransactionKind::MinedBlock]
        );
    }

    #[test]
    fn test_confirm_delivery_insufficient_seller_aborts_whole_operation() {
        let mut engine = TransferEngine::new(EngineConfig::default());
        engine.open_wallet(1, Decimal::ZERO, Utc::now()).unwrap();
        engine
            .open_wallet(2, Decimal::new(5000, 2), Utc::now())
            .unwrap(); // seller holds 50, needs 100

        let result = engine.confirm_delivery(&order(1, 2, 1000), Utc::now());
        assert!(matches!(
            result,
            Err(MarketError::InsufficientSellerBalance { seller: 2, .. })
        ));
        // nothing moved, nothing logged
        assert_eq!(
            engine.wallets().balance(1, Currency::Block).unwrap(),
            Decimal::ZERO
        );
        assert_eq!(
            engine.wallets().balance(2, Currency::Block).unwrap(),
            Decimal::new(5000, 2)
        );
        assert_eq!(engine.ledger().len(), 1);
        assert!(engine.transactions().all().is_empty());
    }

    #[test]
    fn test_confirm_delivery_pays_referrer_once() {
        let mut engine = TransferEngine::new(EngineConfig::default());
        engine.open_wallet(1, Decimal::ZERO, Utc::now()).unwrap(); // buyer
        engine
            .open_wallet(2, Decimal::new(100000, 2), Utc::now())
            .unwrap(); // seller
        engine.open_wallet(3, Decimal::ZERO, Utc::now()).unwrap(); // referrer
        engine.apply_referral(3, 1, Utc::now()).unwrap();

        let settlement = engine.confirm_delivery(&order(1, 2, 1000), Utc::now()).unwrap();
        assert_eq!(settlement.referral_reward, Some(Decimal::new(5000, 2)));
        assert_eq!(
            engine.wallets().balance(3, Currency::Block).unwrap(),
            Decimal::new(5000, 2)
        );

        // a second completed order does not reward again
        let settlement = engine.confirm_delivery(&order(1, 2, 1000), Utc::now()).unwrap();
        assert_eq!(settlement.referral_reward, None);
        assert_eq!(
            engine.wallets().balance(3, Currency::Block).unwrap(),
            Decimal::new(5000, 2)
        );
    }

    #[test]
    fn test_exchange_trade_fee_split() {
        let mut engine = TransferEngine::new(EngineConfig::default());
        engine.open_wallet(1, Decimal::ZERO, Utc::now()).unwrap(); // seller
        engine.open_wallet(2, Decimal::ZERO, Utc::now()).unwrap(); // buyer
        engine
            .credit_fiat(2, Decimal::new(100000, 2), "test deposit".into(), None, Utc::now())
            .unwrap();

        // 200 blocks at 5.0000/block = 1000.00 fiat, fee 200.00
        let listing = listing(1, 200, Decimal::new(50000, 4));
        let settlement = engine.execute_exchange_trade(&listing, 2, Utc::now()).unwrap();

        assert_eq!(settlement.fiat_total, Decimal::new(100000, 2));
        assert_eq!(settlement.admin_fee, Decimal::new(20000, 2));
        assert_eq!(settlement.seller_proceeds, Decimal::new(80000, 2));
        assert_eq!(
            engine.wallets().balance(2, Currency::Fiat).unwrap(),
            Decimal::ZERO
        );
        assert_eq!(
            engine.wallets().balance(2, Currency::Block).unwrap(),
            Decimal::new(20000, 2)
        );
        assert_eq!(
            engine.wallets().balance(1, Currency::Fiat).unwrap(),
            Decimal::new(80000, 2)
        );
        assert_eq!(engine.platform_fees(), Decimal::new(20000, 2));
    }

    #[test]
    fn test_exchange_trade_insufficient_fiat() {
        let mut engine = TransferEngine::new(EngineConfig::default());
        engine.open_wallet(1, Decimal::ZERO, Utc::now()).unwrap();
        engine.open_wallet(2, Decimal::ZERO, Utc::now()).unwrap();

        let listing = listing(1, 200, Decimal::new(50000, 4));
        let result = engine.execute_exchange_trade(&listing, 2, Utc::now());
        assert!(matches!(
            result,
            Err(MarketError::InsufficientFiatBalance { user: 2, .. })
        ));
        assert_eq!(engine.platform_fees(), Decimal::ZERO);
        assert!(engine.transactions().all().is_empty());
    }

    #[test]
    fn test_exchange_trade_rejects_inactive_listing() {
        let mut engine = TransferEngine::new(EngineConfig::default());
        engine.open_wallet(1, Decimal::ZERO, Utc::now()).unwrap();
        engine.open_wallet(2, Decimal::ZERO, Utc::now()).unwrap();

        let mut sold = listing(1, 200, Decimal::new(50000, 4));
        sold.status = ListingStatus::Sold;
        let result = engine.execute_exchange_trade(&sold, 2, Utc::now());
        assert!(matches!(
            result,
            Err(MarketError::ListingUnavailable { listing: 1, .. })
        ));
    }

    #[test]
    fn test_reward_referrer_without_referral_is_noop() {
        let mut engine = engine_with_wallets(&[(1, 100)]);
        let result = engine
            .reward_referrer(1, Decimal::new(100000, 2), Utc::now())
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_adjust_balance_requires_admin() {
        let mut engine = engine_with_wallets(&[(1, 100)]);
        let actor = AuthorizedActor {
            user_id: 2,
            is_admin: false,
        };
        let result = engine.adjust_balance(
            actor,
            1,
            Decimal::new(5000, 2),
            AdjustAction::Add,
            Utc::now(),
        );
        assert!(matches!(result, Err(MarketError::AdminRequired { user: 2 })));
    }

    #[test]
    fn test_adjust_balance_deduct_guards_negative() {
        let mut engine = engine_with_wallets(&[(1, 100)]);
        let admin = AuthorizedActor {
            user_id: 9,
            is_admin: true,
        };

        let result = engine.adjust_balance(
            admin,
            1,
            Decimal::new(50000, 2),
            AdjustAction::Deduct,
            Utc::now(),
        );
        assert!(matches!(
            result,
            Err(MarketError::InsufficientBlockBalance { .. })
        ));

        let balance = engine
            .adjust_balance(admin, 1, Decimal::new(5000, 2), AdjustAction::Add, Utc::now())
            .unwrap();
        assert_eq!(balance, Decimal::new(15000, 2));
    }

    #[test]
    fn test_deposit_is_idempotent_on_reference() {
        // Same deposit webhook delivered twice credits the wallet once.
        let mut engine = engine_with_wallets(&[(1, 0)]);

        let first = engine
            .credit_deposit(
                1,
                Decimal::new(50000, 2),
                Some("PSK123".into()),
                "Deposit".into(),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(first, DepositOutcome::Credited);

        let second = engine
            .credit_deposit(
                1,
                Decimal::new(50000, 2),
                Some("PSK123".into()),
                "Deposit".into(),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(second, DepositOutcome::Duplicate);

        assert_eq!(
            engine.wallets().balance(1, Currency::Fiat).unwrap(),
            Decimal::new(50000, 2)
        );
        assert_eq!(engine.transactions().all().len(), 1);
    }

    #[test]
    fn test_withdrawal_failure_refunds() {
        let mut engine = engine_with_wallets(&[(1, 0)]);
        engine
            .credit_fiat(1, Decimal::new(30000, 2), "seed".into(), None, Utc::now())
            .unwrap();

        let reference = engine
            .initiate_withdrawal(1, Decimal::new(20000, 2), None, Utc::now())
            .unwrap();
        assert_eq!(
            engine.wallets().balance(1, Currency::Fiat).unwrap(),
            Decimal::new(10000, 2)
        );

        let outcome = engine.settle_withdrawal(&reference, false, Utc::now()).unwrap();
        assert_eq!(
            outcome,
            WithdrawalSettlement::Refunded(Decimal::new(20000, 2))
        );
        assert_eq!(
            engine.wallets().balance(1, Currency::Fiat).unwrap(),
            Decimal::new(30000, 2)
        );

        // replaying the failure does not refund twice
        let outcome = engine.settle_withdrawal(&reference, false, Utc::now()).unwrap();
        assert_eq!(outcome, WithdrawalSettlement::AlreadySettled);
        assert_eq!(
            engine.wallets().balance(1, Currency::Fiat).unwrap(),
            Decimal::new(30000, 2)
        );
    }

    #[test]
    fn test_withdrawal_success_marks_transaction() {
        let mut engine = engine_with_wallets(&[(1, 0)]);
        engine
            .credit_fiat(1, Decimal::new(30000, 2), "seed".into(), None, Utc::now())
            .unwrap();
        let reference = engine
            .initiate_withdrawal(1, Decimal::new(20000, 2), None, Utc::now())
            .unwrap();

        let outcome = engine.settle_withdrawal(&reference, true, Utc::now()).unwrap();
        assert_eq!(outcome, WithdrawalSettlement::Confirmed);
        assert_eq!(
            engine
                .transactions()
                .find_by_reference(&reference)
                .unwrap()
                .status,
            TransactionStatus::Successful
        );
    }

    #[test]
    fn test_settle_unknown_reference() {
        let mut engine = engine_with_wallets(&[(1, 0)]);
        let result = engine.settle_withdrawal("WD-404", true, Utc::now());
        assert!(matches!(
            result,
            Err(MarketError::TransactionNotFound { .. })
        ));
    }

    #[test]
    fn test_reconciliation_after_mixed_operations() {
        let mut engine = TransferEngine::new(EngineConfig::default());
        engine
            .open_wallet(1, Decimal::new(100000, 2), Utc::now())
            .unwrap();
        engine.open_wallet(2, Decimal::ZERO, Utc::now()).unwrap();

        engine
            .credit_fiat(2, Decimal::new(500000, 2), "seed".into(), None, Utc::now())
            .unwrap();
        engine.confirm_delivery(&order(2, 1, 500), Utc::now()).unwrap();
        let trade_listing = listing(1, 50, Decimal::new(20000, 4));
        // hold the listed blocks the way the listing engine would
        engine
            .debit_blocks(
                1,
                trade_listing.block_amount,
                "Listed 50.00 blocks for sale".into(),
                Some("listing-1".into()),
                Utc::now(),
            )
            .unwrap();
        engine
            .execute_exchange_trade(&trade_listing, 2, Utc::now())
            .unwrap();

        for user in [1, 2] {
            for currency in [Currency::Block, Currency::Fiat] {
                assert_eq!(
                    engine.ledger().reconcile(user, currency),
                    engine.wallets().balance(user, currency).unwrap(),
                    "reconciliation mismatch for user {} {:?}",
                    user,
                    currency
                );
                assert!(engine.ledger().chain_consistent(user, currency));
            }
        }
    }
}
