//! Payment-processor webhook handling
//!
//! Webhook delivery is at-least-once, so everything here is built to be
//! replay-safe: payloads are authenticated with a keyed hash over the raw
//! body before anything is parsed, and the engine deduplicates deposits by
//! their external reference. An unauthenticated payload is rejected with no
//! side effects.
//!
//! The processor's exact wire format is out of scope; payloads use a
//! minimal envelope: `{"event": "...", "data": {"reference": "...",
//! "account": "...", "amount": 12345}}` with amounts in minor units.

use crate::types::MarketError;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Event kinds delivered by the payment processor
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// A deposit into a dedicated account was confirmed
    DepositConfirmed {
        /// Dedicated account reference identifying the wallet
        account: String,
        /// Deposited amount
        amount: Decimal,
        /// External reference (idempotency key)
        reference: String,
    },
    /// An outbound transfer settled successfully
    TransferSucceeded {
        /// Reference of the withdrawal being settled
        reference: String,
    },
    /// An outbound transfer failed
    TransferFailed {
        /// Reference of the withdrawal being settled
        reference: String,
    },
    /// An event kind this engine does not consume
    Unrecognized {
        /// The raw event name
        event: String,
    },
}

/// Raw webhook envelope
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    data: EventData,
}

/// Payload fields used by the engine
#[derive(Debug, Deserialize)]
struct EventData {
    reference: String,
    #[serde(default)]
    account: Option<String>,
    /// Amount in minor units (two implied decimals)
    #[serde(default)]
    amount: Option<i64>,
}

/// Compute the hex signature the processor attaches to a body
///
/// Exposed so tests and local tooling can construct valid deliveries.
pub fn signature_for(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Authenticate a webhook body against its signature header
///
/// HMAC-SHA512 over the raw body with the shared secret, compared in
/// constant time.
///
/// # Errors
///
/// Returns `InvalidSignature` when the signature is not valid hex or does
/// not match.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> Result<(), MarketError> {
    let expected = hex::decode(signature).map_err(|_| MarketError::InvalidSignature)?;
    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).map_err(|_| MarketError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| MarketError::InvalidSignature)
}

/// Parse an authenticated webhook body into an event
///
/// # Errors
///
/// Returns `MalformedPayload` when the body is not valid JSON or a consumed
/// event kind is missing required fields. Unknown event kinds parse into
/// `WebhookEvent::Unrecognized` rather than failing, so new processor
/// events never break delivery.
pub fn parse_event(body: &[u8]) -> Result<WebhookEvent, MarketError> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| MarketError::MalformedPayload {
            message: e.to_string(),
        })?;

    match envelope.event.as_str() {
        "charge.success" => {
            let account = envelope
                .data
                .account
                .ok_or_else(|| MarketError::MalformedPayload {
                    message: "charge.success without account".to_string(),
                })?;
            let minor = envelope
                .data
                .amount
                .ok_or_else(|| MarketError::MalformedPayload {
                    message: "charge.success without amount".to_string(),
                })?;
            Ok(WebhookEvent::DepositConfirmed {
                account,
                amount: Decimal::new(minor, 2),
                reference: envelope.data.reference,
            })
        }
        "transfer.success" => Ok(WebhookEvent::TransferSucceeded {
            reference: envelope.data.reference,
        }),
        "transfer.failed" => Ok(WebhookEvent::TransferFailed {
            reference: envelope.data.reference,
        }),
        other => Ok(WebhookEvent::Unrecognized {
            event: other.to_string(),
        }),
    }
}
