//! MarketQuoteUpdate (§3) — a single best-bid-offer snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuoteUpdate {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub symbol: String,
    pub bid_price: Decimal,
    pub bid_size: Decimal,
    pub ask_price: Decimal,
    pub ask_size: Decimal,
    pub sequence_number: Option<i64>,
    pub stream_id: Option<String>,
    pub venue: Option<String>,
}

/// Payload held by the Quote State Store (§4.B) — the authoritative
/// latest-BBO entry consulted by trade aggressor inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BboQuotePayload {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub symbol: String,
    pub bid_price: Decimal,
    pub bid_size: Decimal,
    pub ask_price: Decimal,
    pub ask_size: Decimal,
}

impl From<&MarketQuoteUpdate> for BboQuotePayload {
    fn from(update: &MarketQuoteUpdate) -> Self {
        Self {
            timestamp: update.timestamp,
            symbol: update.symbol.clone(),
            bid_price: update.bid_price,
            bid_size: update.bid_size,
            ask_price: update.ask_price,
            ask_size: update.ask_size,
        }
    }
}
