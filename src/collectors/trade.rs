//! Trade Collector (§4.C) — sequence integrity, aggressor inference,
//! rolling windows and the recent-trade ring, one state machine per
//! continuity key `(symbol, streamId, venue)`.

use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::bus::EventBus;
use crate::config::TradeConfig;
use crate::model::{
    Aggressor, IntegrityKind, IntegrityPayload, MarketEvent, MarketEventPayload,
    MarketTradeUpdate, OrderFlowStatistics,
};
use crate::model::symbol::is_valid;
use crate::quotes::QuoteStateStore;

use super::ring::RingBuffer;
use super::rolling::MultiWindowAccumulator;

type ContinuityKey = (String, Option<String>, Option<String>);

struct ContinuityState {
    key: ContinuityKey,
    last_sequence: i64,
    stale: bool,
}

struct SymbolState {
    recent: RingBuffer<MarketTradeUpdate>,
    windows: MultiWindowAccumulator,
}

struct Inner {
    /// Insertion-ordered so `last_sequence_for_symbol` is deterministic by
    /// first-seen order across continuity keys (§9 Open Questions).
    continuity: Vec<ContinuityState>,
    symbols: std::collections::HashMap<String, SymbolState>,
}

pub struct TradeCollector {
    config: TradeConfig,
    quotes: std::sync::Arc<QuoteStateStore>,
    bus: EventBus,
    inner: Mutex<Inner>,
}

impl TradeCollector {
    pub fn new(config: TradeConfig, quotes: std::sync::Arc<QuoteStateStore>, bus: EventBus) -> Self {
        Self {
            config,
            quotes,
            bus,
            inner: Mutex::new(Inner {
                continuity: Vec::new(),
                symbols: std::collections::HashMap::new(),
            }),
        }
    }

    /// Last accepted sequence number for the first continuity key (in
    /// insertion order) matching `symbol`. `None` if no key for this symbol
    /// has been seen.
    pub fn last_sequence_for_symbol(&self, symbol: &str) -> Option<i64> {
        let key = symbol.trim().to_ascii_uppercase();
        let inner = self.inner.lock();
        inner
            .continuity
            .iter()
            .find(|state| state.key.0 == key)
            .map(|state| state.last_sequence)
    }

    pub fn on_trade(&self, mut update: MarketTradeUpdate) {
        let symbol_config = crate::config::SymbolConfig::default();
        if !is_valid(&update.symbol, &symbol_config) {
            self.publish_integrity(
                &update.symbol,
                update.timestamp,
                IntegrityKind::InvalidSymbol,
                "symbol failed validation",
                Some(update.sequence_number),
                None,
                update.stream_id.clone(),
                update.venue.clone(),
            );
            return;
        }
        if update.sequence_number < 0 {
            self.publish_integrity(
                &update.symbol,
                update.timestamp,
                IntegrityKind::InvalidSequenceNumber,
                "sequence number is negative",
                Some(update.sequence_number),
                None,
                update.stream_id.clone(),
                update.venue.clone(),
            );
            return;
        }

        let key = update.continuity_key();
        let mut inner = self.inner.lock();
        let idx = match inner.continuity.iter().position(|s| s.key == key) {
            Some(idx) => idx,
            None => {
                inner.continuity.push(ContinuityState {
                    key: key.clone(),
                    last_sequence: -1,
                    stale: false,
                });
                inner.continuity.len() - 1
            }
        };

        let last = inner.continuity[idx].last_sequence;
        let received = update.sequence_number;
        if received <= last {
            drop(inner);
            log::warn!(
                "trade out-of-order: symbol={} stream={:?} venue={:?} received={} last={}",
                update.symbol, key.1, key.2, received, last
            );
            self.publish_integrity(
                &update.symbol,
                update.timestamp,
                IntegrityKind::OutOfOrder,
                "duplicate or regressed sequence",
                Some(received),
                Some(last + 1),
                key.1,
                key.2,
            );
            return;
        }

        let gapped = received > last + 1;
        inner.continuity[idx].last_sequence = received;
        if gapped {
            inner.continuity[idx].stale = true;
        } else {
            inner.continuity[idx].stale = false;
        }
        drop(inner);

        if gapped {
            log::warn!(
                "trade sequence gap: symbol={} stream={:?} venue={:?} received={} expected={}",
                update.symbol, key.1, key.2, received, last + 1
            );
            self.publish_integrity(
                &update.symbol,
                update.timestamp,
                IntegrityKind::Gap,
                "sequence gap detected",
                Some(received),
                Some(last + 1),
                key.1.clone(),
                key.2.clone(),
            );
        }

        self.infer_aggressor(&mut update);

        let mut inner = self.inner.lock();
        let symbol_key = update.symbol.to_ascii_uppercase();
        let state = inner
            .symbols
            .entry(symbol_key)
            .or_insert_with(|| SymbolState {
                recent: RingBuffer::new(self.config.recent_trade_capacity),
                windows: MultiWindowAccumulator::new(self.config.windows),
            });
        state.recent.push(update.clone());
        state
            .windows
            .add(update.timestamp, update.price, update.size, update.aggressor);
        let order_flow = build_order_flow(&update.symbol, &state.windows.ten_second);
        drop(inner);

        self.bus.try_publish(
            update.venue.as_deref().unwrap_or("unknown"),
            MarketEvent::new(
                update.timestamp,
                update.symbol.clone(),
                MarketEventPayload::Trade(update.clone()),
                update.venue.clone(),
            ),
        );
        self.bus.try_publish(
            update.venue.as_deref().unwrap_or("unknown"),
            MarketEvent::new(
                update.timestamp,
                update.symbol.clone(),
                MarketEventPayload::OrderFlow(order_flow),
                update.venue.clone(),
            ),
        );
    }

    fn infer_aggressor(&self, update: &mut MarketTradeUpdate) {
        if update.aggressor != Aggressor::Unknown {
            return;
        }
        let Some(quote) = self.quotes.try_get(&update.symbol) else {
            return;
        };
        let age_ns = update.timestamp.unix_timestamp_nanos() - quote.timestamp.unix_timestamp_nanos();
        if age_ns < 0 || age_ns as u128 > self.config.aggressor_quote_max_age.as_nanos() {
            return;
        }
        update.aggressor = if update.price >= quote.ask_price {
            Aggressor::Buy
        } else if update.price <= quote.bid_price {
            Aggressor::Sell
        } else {
            Aggressor::Unknown
        };
    }

    #[allow(clippy::too_many_arguments)]
    fn publish_integrity(
        &self,
        symbol: &str,
        timestamp: OffsetDateTime,
        kind: IntegrityKind,
        description: &str,
        offending_sequence: Option<i64>,
        expected_sequence: Option<i64>,
        stream_id: Option<String>,
        venue: Option<String>,
    ) {
        let payload = IntegrityPayload {
            kind,
            description: description.to_string(),
            offending_sequence,
            expected_sequence,
            stream_id,
            venue: venue.clone(),
        };
        self.bus.try_publish(
            venue.as_deref().unwrap_or("unknown"),
            MarketEvent::new(
                timestamp,
                symbol.to_string(),
                MarketEventPayload::Integrity(payload),
                venue,
            ),
        );
    }
}

fn build_order_flow(symbol: &str, window: &super::rolling::WindowAccumulator) -> OrderFlowStatistics {
    OrderFlowStatistics {
        symbol: symbol.to_string(),
        buy_volume: window.buy_volume(),
        sell_volume: window.sell_volume(),
        unknown_volume: window.unknown_volume(),
        vwap: window.vwap(),
        imbalance: window.imbalance(),
        trade_count: window.trade_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use time::macros::datetime;

    fn trade(seq: i64, ts: OffsetDateTime, price: Decimal) -> MarketTradeUpdate {
        MarketTradeUpdate {
            timestamp: ts,
            symbol: "AAPL".into(),
            price,
            size: dec!(1),
            aggressor: Aggressor::Unknown,
            sequence_number: seq,
            stream_id: Some("s1".into()),
            venue: Some("v1".into()),
        }
    }

    fn harness() -> (TradeCollector, crate::bus::BusSubscriber) {
        let bus = EventBus::new(64);
        let sub = bus.subscribe();
        let quotes = Arc::new(QuoteStateStore::new());
        let collector = TradeCollector::new(TradeConfig::default(), quotes, bus);
        (collector, sub)
    }

    #[tokio::test]
    async fn strictly_increasing_sequence_has_no_integrity_events() {
        let (collector, mut sub) = harness();
        let t0 = datetime!(2026-01-01 00:00:00 UTC);
        for seq in 1..=5 {
            collector.on_trade(trade(seq, t0, dec!(100)));
        }
        assert_eq!(collector.last_sequence_for_symbol("AAPL"), Some(5));
        // Trade + OrderFlow per accepted update, never Integrity.
        for _ in 0..10 {
            let event = sub.recv().await.unwrap();
            assert!(!matches!(event.payload, MarketEventPayload::Integrity(_)));
        }
    }

    #[tokio::test]
    async fn duplicate_then_regressed_then_gap_matches_s5() {
        let (collector, mut sub) = harness();
        let t0 = datetime!(2026-01-01 00:00:00 UTC);
        collector.on_trade(trade(5, t0, dec!(100)));
        let _ = sub.recv().await; // Trade
        let _ = sub.recv().await; // OrderFlow

        collector.on_trade(trade(5, t0, dec!(100))); // duplicate
        let dup = sub.recv().await.unwrap();
        assert!(matches!(
            dup.payload,
            MarketEventPayload::Integrity(IntegrityPayload { kind: IntegrityKind::OutOfOrder, .. })
        ));

        collector.on_trade(trade(4, t0, dec!(100))); // regressed
        let regressed = sub.recv().await.unwrap();
        assert!(matches!(
            regressed.payload,
            MarketEventPayload::Integrity(IntegrityPayload { kind: IntegrityKind::OutOfOrder, .. })
        ));

        collector.on_trade(trade(7, t0, dec!(100))); // gap: published + integrity
        let gap = sub.recv().await.unwrap();
        assert!(matches!(
            gap.payload,
            MarketEventPayload::Integrity(IntegrityPayload { kind: IntegrityKind::Gap, .. })
        ));
        let trade_event = sub.recv().await.unwrap();
        assert!(matches!(trade_event.payload, MarketEventPayload::Trade(_)));

        assert_eq!(collector.last_sequence_for_symbol("AAPL"), Some(7));
    }

    #[tokio::test]
    async fn aggressor_inferred_from_fresh_bbo_matches_s4() {
        let (collector, mut sub) = harness();
        let t0 = datetime!(2026-01-01 00:00:00 UTC);
        collector.quotes.upsert(crate::model::BboQuotePayload {
            timestamp: t0,
            symbol: "AAPL".into(),
            bid_price: dec!(100),
            bid_size: dec!(5),
            ask_price: dec!(101),
            ask_size: dec!(5),
        });
        let trade_ts = t0 + Duration::from_millis(50);
        collector.on_trade(trade(1, trade_ts, dec!(101)));
        let trade_event = sub.recv().await.unwrap();
        match trade_event.payload {
            MarketEventPayload::Trade(t) => assert_eq!(t.aggressor, Aggressor::Buy),
            _ => panic!("expected trade event"),
        }
        let flow = sub.recv().await.unwrap();
        match flow.payload {
            MarketEventPayload::OrderFlow(stats) => {
                assert_eq!(stats.buy_volume, dec!(1));
                assert_eq!(stats.sell_volume, dec!(0));
                assert_eq!(stats.vwap, dec!(101));
                assert_eq!(stats.imbalance, dec!(1));
                assert_eq!(stats.trade_count, 1);
            }
            _ => panic!("expected order flow event"),
        }
    }

    #[tokio::test]
    async fn stale_quote_beyond_250ms_leaves_aggressor_unchanged() {
        let (collector, mut sub) = harness();
        let t0 = datetime!(2026-01-01 00:00:00 UTC);
        collector.quotes.upsert(crate::model::BboQuotePayload {
            timestamp: t0,
            symbol: "AAPL".into(),
            bid_price: dec!(100),
            bid_size: dec!(5),
            ask_price: dec!(101),
            ask_size: dec!(5),
        });
        let trade_ts = t0 + Duration::from_millis(300);
        collector.on_trade(trade(1, trade_ts, dec!(101)));
        let trade_event = sub.recv().await.unwrap();
        match trade_event.payload {
            MarketEventPayload::Trade(t) => assert_eq!(t.aggressor, Aggressor::Unknown),
            _ => panic!("expected trade event"),
        }
    }

    #[tokio::test]
    async fn invalid_symbol_is_dropped_with_integrity_event() {
        let (collector, mut sub) = harness();
        let t0 = datetime!(2026-01-01 00:00:00 UTC);
        let mut bad = trade(1, t0, dec!(100));
        bad.symbol = "".into();
        collector.on_trade(bad);
        let event = sub.recv().await.unwrap();
        assert!(matches!(
            event.payload,
            MarketEventPayload::Integrity(IntegrityPayload { kind: IntegrityKind::InvalidSymbol, .. })
        ));
        assert_eq!(collector.last_sequence_for_symbol(""), None);
    }
}
