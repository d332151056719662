//! CSV format handling for replay events and wallet output
//!
//! This module centralizes all CSV format concerns, providing:
//! - EventRow structure for deserialization
//! - Conversion from CSV rows to domain events, with per-operation
//!   operand validation
//! - Wallet state output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Input schema
//!
//! `op,actor,target,amount,rate,detail`. `target` carries counterparty,
//! order or listing IDs; `amount`/`rate` carry decimals; `detail` carries
//! strings (a registration category, optionally suffixed `+admin`, or an
//! external payment reference).

use crate::types::{EventOp, MarketEvent, UserId, Wallet};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV row structure for deserialization
///
/// `amount` and `rate` stay strings until conversion so malformed decimals
/// produce row-level errors instead of reader aborts.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EventRow {
    pub op: String,
    pub actor: UserId,
    pub target: Option<u64>,
    pub amount: Option<String>,
    pub rate: Option<String>,
    pub detail: Option<String>,
}

/// Parse an optional decimal field
fn parse_decimal(field: Option<&String>, name: &str, op: &str) -> Result<Option<Decimal>, String> {
    match field {
        Some(raw) if !raw.trim().is_empty() => Decimal::from_str(raw.trim())
            .map(Some)
            .map_err(|_| format!("Invalid {} '{}' for {}", name, raw, op)),
        _ => Ok(None),
    }
}

/// Convert an EventRow to a MarketEvent
///
/// This function:
/// - Parses the operation name into an EventOp
/// - Parses amount and rate strings into Decimals
/// - Validates that the operands the operation requires are present
///
/// # Returns
///
/// Result containing either:
/// - Ok(MarketEvent) - Successfully converted event
/// - Err(String) - Error message describing the conversion failure
pub fn convert_event_row(row: EventRow) -> Result<MarketEvent, String> {
    let op = EventOp::parse(&row.op)
        .ok_or_else(|| format!("Invalid operation '{}' for actor {}", row.op, row.actor))?;

    let amount = parse_decimal(row.amount.as_ref(), "amount", &row.op)?;
    let rate = parse_decimal(row.rate.as_ref(), "rate", &row.op)?;
    let detail = row
        .detail
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    // Per-operation arity checks; the engine re-validates semantics
    let require_target = |operand: &str| {
        row.target
            .ok_or_else(|| format!("{} event requires {}", row.op, operand))
    };
    match op {
        EventOp::Register => {
            if detail.is_none() {
                return Err(format!("{} event requires a category", row.op));
            }
        }
        EventOp::Refer => {
            require_target("a referrer")?;
        }
        EventOp::Deposit | EventOp::Withdraw => {
            if amount.is_none() {
                return Err(format!("{} event requires an amount", row.op));
            }
        }
        EventOp::Order => {
            require_target("a seller")?;
            if amount.is_none() {
                return Err(format!("{} event requires a price", row.op));
            }
        }
        EventOp::Pay => {
            require_target("an order")?;
            if detail.is_none() {
                return Err(format!("{} event requires a payment reference", row.op));
            }
        }
        EventOp::Deliver | EventOp::CancelOrder => {
            require_target("an order")?;
        }
        EventOp::List => {
            if amount.is_none() || rate.is_none() {
                return Err(format!("{} event requires a quantity and a rate", row.op));
            }
        }
        EventOp::Buy | EventOp::CancelListing => {
            require_target("a listing")?;
        }
        EventOp::AdjustAdd | EventOp::AdjustDeduct => {
            require_target("a target user")?;
            if amount.is_none() {
                return Err(format!("{} event requires an amount", row.op));
            }
        }
        EventOp::Freeze | EventOp::Unfreeze => {
            require_target("a target user")?;
        }
    }

    Ok(MarketEvent {
        op,
        actor: row.actor,
        target: row.target,
        amount,
        rate,
        detail,
    })
}

/// Write wallet states to CSV format
///
/// Columns: user, blocks, fiat, initial_allocation. Wallets are sorted by
/// user ID for deterministic output; balances print with two decimals.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_wallets_csv(wallets: &[Wallet], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["user", "blocks", "fiat", "initial_allocation"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = wallets.to_vec();
    sorted.sort_by_key(|w| w.user_id);

    for wallet in sorted {
        writer
            .write_record(&[
                wallet.user_id.to_string(),
                format!("{:.2}", wallet.block_balance),
                format!("{:.2}", wallet.fiat_balance),
                format!("{:.2}", wallet.initial_block_allocation),
            ])
            .map_err(|e| format!("Failed to write wallet record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn row(
        op: &str,
        actor: UserId,
        target: Option<u64>,
        amount: Option<&str>,
        rate: Option<&str>,
        detail: Option<&str>,
    ) -> EventRow {
        EventRow {
            op: op.to_string(),
            actor,
            target,
            amount: amount.map(str::to_string),
            rate: rate.map(str::to_string),
            detail: detail.map(str::to_string),
        }
    }

    #[rstest]
    #[case::register(row("register", 1, None, None, None, Some("individual")), EventOp::Register)]
    #[case::deposit(row("deposit", 1, None, Some("500.00"), None, Some("PSK123")), EventOp::Deposit)]
    #[case::order(row("order", 1, Some(2), Some("1000.00"), None, None), EventOp::Order)]
    #[case::list(row("list", 1, None, Some("200"), Some("5.0000"), None), EventOp::List)]
    #[case::buy(row("BUY", 2, Some(1), None, None, None), EventOp::Buy)]
    #[case::cancel_listing(row("cancel_listing", 1, Some(1), None, None, None), EventOp::CancelListing)]
    fn test_convert_valid_rows(#[case] row: EventRow, #[case] expected: EventOp) {
        let event = convert_event_row(row).unwrap();
        assert_eq!(event.op, expected);
    }

    #[test]
    fn test_convert_parses_decimals() {
        let event =
            convert_event_row(row("list", 1, None, Some(" 200.50 "), Some("5.1234"), None))
                .unwrap();
        assert_eq!(event.amount, Some(Decimal::new(20050, 2)));
        assert_eq!(event.rate, Some(Decimal::new(51234, 4)));
    }

    #[rstest]
    #[case::unknown_op(row("chargeback", 1, Some(1), None, None, None), "Invalid operation")]
    #[case::register_without_category(row("register", 1, None, None, None, None), "requires a category")]
    #[case::deposit_without_amount(row("deposit", 1, None, None, None, None), "requires an amount")]
    #[case::deposit_bad_amount(row("deposit", 1, None, Some("abc"), None, None), "Invalid amount")]
    #[case::order_without_seller(row("order", 1, None, Some("10.00"), None, None), "requires a seller")]
    #[case::order_without_price(row("order", 1, Some(2), None, None, None), "requires a price")]
    #[case::pay_without_reference(row("pay", 1, Some(1), None, None, None), "requires a payment reference")]
    #[case::list_without_rate(row("list", 1, None, Some("200"), None, None), "requires a quantity and a rate")]
    #[case::buy_without_listing(row("buy", 1, None, None, None, None), "requires a listing")]
    #[case::adjust_without_amount(row("adjust_add", 1, Some(2), None, None, None), "requires an amount")]
    #[case::whitespace_amount(row("deposit", 1, None, Some("  "), None, None), "requires an amount")]
    fn test_convert_errors(#[case] row: EventRow, #[case] expected_error: &str) {
        let result = convert_event_row(row);
        assert!(result.is_err());
        assert!(
            result.as_ref().unwrap_err().contains(expected_error),
            "unexpected error: {:?}",
            result
        );
    }

    fn wallet(user: UserId, blocks: i64, fiat: i64, allocation: i64) -> Wallet {
        let mut w = Wallet::open(user, Decimal::new(allocation, 2), Utc::now());
        w.block_balance = Decimal::new(blocks, 2);
        w.fiat_balance = Decimal::new(fiat, 2);
        w
    }

    #[test]
    fn test_write_wallets_csv_sorted_two_decimals() {
        let wallets = vec![
            wallet(2, 80000, 50025, 100000),
            wallet(1, 0, 0, 0),
        ];
        let mut output = Vec::new();
        write_wallets_csv(&wallets, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(
            text,
            "user,blocks,fiat,initial_allocation\n\
             1,0.00,0.00,0.00\n\
             2,800.00,500.25,1000.00\n"
        );
    }

    #[test]
    fn test_write_wallets_csv_empty() {
        let mut output = Vec::new();
        write_wallets_csv(&[], &mut output).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "user,blocks,fiat,initial_allocation\n"
        );
    }
}
