//! MarketDepthUpdate (§3) — a single Level-2 delta.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthOperation {
    Insert,
    Update,
    Delete,
    /// Anything the provider sends that isn't one of the above; always
    /// rejected by the collector (§4.D step 5, `Unknown`).
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum BookSide {
    Bid,
    Ask,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDepthUpdate {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub symbol: String,
    /// Zero-based level index on the named side.
    pub position: u32,
    pub operation: DepthOperation,
    pub side: BookSide,
    pub price: Decimal,
    pub size: Decimal,
    pub market_maker: Option<String>,
    pub sequence_number: i64,
    pub stream_id: Option<String>,
    pub venue: Option<String>,
}
