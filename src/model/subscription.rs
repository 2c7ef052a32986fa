//! Subscription record (§3) and the kind of stream it names.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionKind {
    Trades,
    Depth,
    Quotes,
    Candles,
    OrderLog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: u64,
    pub symbol: String,
    pub kind: SubscriptionKind,
    #[serde(with = "time::serde::rfc3339")]
    pub subscribed_at: OffsetDateTime,
    pub provider_id: String,
}
