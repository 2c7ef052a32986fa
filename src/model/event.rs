//! `MarketEvent` — the unified, immutable event published on the bus and
//! persisted through the WAL/storage sinks (§3, §4.A).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::book::LobSnapshot;
use super::option::{OpenInterest, OptionChain, OptionGreeks, OptionQuote, OptionTrade};
use super::quote::BboQuotePayload;
use super::trade::MarketTradeUpdate;

/// Reason an integrity event was raised (§7 error taxonomy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityKind {
    InvalidSymbol,
    InvalidSequenceNumber,
    OutOfOrder,
    Gap,
    InvalidPosition,
    Stale,
    Unknown,
    ChecksumMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityPayload {
    pub kind: IntegrityKind,
    pub description: String,
    pub offending_sequence: Option<i64>,
    pub expected_sequence: Option<i64>,
    pub stream_id: Option<String>,
    pub venue: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFlowStatistics {
    pub symbol: String,
    pub buy_volume: rust_decimal::Decimal,
    pub sell_volume: rust_decimal::Decimal,
    pub unknown_volume: rust_decimal::Decimal,
    pub vwap: rust_decimal::Decimal,
    pub imbalance: rust_decimal::Decimal,
    pub trade_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub provider_id_hash: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderError {
    pub provider_id: String,
    pub message: String,
}

/// The payload carried by a `MarketEvent`. One variant per row of §2's
/// Event types; the discriminant (`MarketEventKind`) is what replay
/// filters and bus subscribers match on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MarketEventPayload {
    Trade(MarketTradeUpdate),
    OrderFlow(OrderFlowStatistics),
    Bbo(BboQuotePayload),
    L2Snapshot(LobSnapshot),
    DepthIntegrity(IntegrityPayload),
    ResyncRequested { symbol: String, reason: String },
    Integrity(IntegrityPayload),
    OptionQuote(OptionQuote),
    OptionTrade(OptionTrade),
    OptionGreeks(OptionGreeks),
    OptionChain(OptionChain),
    OpenInterest { contract: String, data: OpenInterest },
    Heartbeat(Heartbeat),
    Error(ProviderError),
}

/// Matches the variant names of [`MarketEventPayload`] without carrying
/// data — used by replay filters and bus subscription topics (§4.A, §4.K).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketEventKind {
    Trade,
    OrderFlow,
    Bbo,
    L2Snapshot,
    DepthIntegrity,
    ResyncRequested,
    Integrity,
    OptionQuote,
    OptionTrade,
    OptionGreeks,
    OptionChain,
    OpenInterest,
    Heartbeat,
    Error,
}

impl MarketEventPayload {
    pub fn kind(&self) -> MarketEventKind {
        match self {
            MarketEventPayload::Trade(_) => MarketEventKind::Trade,
            MarketEventPayload::OrderFlow(_) => MarketEventKind::OrderFlow,
            MarketEventPayload::Bbo(_) => MarketEventKind::Bbo,
            MarketEventPayload::L2Snapshot(_) => MarketEventKind::L2Snapshot,
            MarketEventPayload::DepthIntegrity(_) => MarketEventKind::DepthIntegrity,
            MarketEventPayload::ResyncRequested { .. } => MarketEventKind::ResyncRequested,
            MarketEventPayload::Integrity(_) => MarketEventKind::Integrity,
            MarketEventPayload::OptionQuote(_) => MarketEventKind::OptionQuote,
            MarketEventPayload::OptionTrade(_) => MarketEventKind::OptionTrade,
            MarketEventPayload::OptionGreeks(_) => MarketEventKind::OptionGreeks,
            MarketEventPayload::OptionChain(_) => MarketEventKind::OptionChain,
            MarketEventPayload::OpenInterest { .. } => MarketEventKind::OpenInterest,
            MarketEventPayload::Heartbeat(_) => MarketEventKind::Heartbeat,
            MarketEventPayload::Error(_) => MarketEventKind::Error,
        }
    }
}

/// The unified envelope published on the bus and persisted to disk.
/// Immutable once constructed (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub symbol: String,
    pub payload: MarketEventPayload,
    pub source: Option<String>,
}

impl MarketEvent {
    pub fn new(
        timestamp: OffsetDateTime,
        symbol: impl Into<String>,
        payload: MarketEventPayload,
        source: Option<String>,
    ) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            payload,
            source,
        }
    }

    pub fn kind(&self) -> MarketEventKind {
        self.payload.kind()
    }
}
