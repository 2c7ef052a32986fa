//! MarketTradeUpdate (§3) and the aggressor it carries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggressor {
    Buy,
    Sell,
    Unknown,
}

/// Immutable once constructed — collectors clone the fields they need
/// rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTradeUpdate {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub symbol: String,
    pub price: Decimal,
    pub size: Decimal,
    pub aggressor: Aggressor,
    pub sequence_number: i64,
    pub stream_id: Option<String>,
    pub venue: Option<String>,
}

impl MarketTradeUpdate {
    /// `(symbol, stream_id, venue)` — the scope sequence checks are made
    /// against (§4.C continuity key).
    pub fn continuity_key(&self) -> (String, Option<String>, Option<String>) {
        (
            self.symbol.to_ascii_uppercase(),
            self.stream_id.clone(),
            self.venue.clone(),
        )
    }
}
