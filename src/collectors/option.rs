//! Option Collector (§4.E) — per-contract/chain caches with no sequence
//! checking: every accepted update is published unconditionally.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::bus::EventBus;
use crate::config::OptionConfig;
use crate::model::{
    MarketEvent, MarketEventPayload, OpenInterest, OptionChain, OptionGreeks, OptionQuote,
    OptionTrade,
};

use super::ring::RingBuffer;

#[derive(Default)]
struct Caches {
    quotes: HashMap<String, OptionQuote>,
    greeks: HashMap<String, OptionGreeks>,
    chains: HashMap<String, OptionChain>,
    open_interest: HashMap<String, OpenInterest>,
    recent_trades: HashMap<String, RingBuffer<OptionTrade>>,
}

/// No continuity keys, no stale flags: options data is cached and
/// republished as it arrives, trusting the upstream provider for ordering.
pub struct OptionCollector {
    config: OptionConfig,
    bus: EventBus,
    caches: RwLock<Caches>,
}

impl OptionCollector {
    pub fn new(config: OptionConfig, bus: EventBus) -> Self {
        Self {
            config,
            bus,
            caches: RwLock::new(Caches::default()),
        }
    }

    pub fn on_quote(&self, quote: OptionQuote) {
        let timestamp = quote.timestamp;
        let mut guard = self.caches.write();
        guard.quotes.insert(quote.contract.clone(), quote.clone());
        drop(guard);
        self.publish(timestamp, quote.contract.clone(), MarketEventPayload::OptionQuote(quote));
    }

    pub fn on_trade(&self, trade: OptionTrade) {
        let timestamp = trade.timestamp;
        let mut guard = self.caches.write();
        guard
            .recent_trades
            .entry(trade.contract.clone())
            .or_insert_with(|| RingBuffer::new(self.config.recent_trade_capacity))
            .push(trade.clone());
        drop(guard);
        self.publish(timestamp, trade.contract.clone(), MarketEventPayload::OptionTrade(trade));
    }

    pub fn on_greeks(&self, greeks: OptionGreeks) {
        let timestamp = greeks.timestamp;
        let mut guard = self.caches.write();
        guard.greeks.insert(greeks.contract.clone(), greeks.clone());
        drop(guard);
        self.publish(timestamp, greeks.contract.clone(), MarketEventPayload::OptionGreeks(greeks));
    }

    pub fn on_chain(&self, chain: OptionChain) {
        let timestamp = chain.timestamp;
        let mut guard = self.caches.write();
        guard.chains.insert(chain.chain.clone(), chain.clone());
        drop(guard);
        self.publish(timestamp, chain.chain.clone(), MarketEventPayload::OptionChain(chain));
    }

    /// `OpenInterest` carries no timestamp of its own (§3), so the caller
    /// supplies the time the reading was taken.
    pub fn on_open_interest(&self, timestamp: time::OffsetDateTime, contract: String, data: OpenInterest) {
        let mut guard = self.caches.write();
        guard.open_interest.insert(contract.clone(), data);
        drop(guard);
        self.publish(
            timestamp,
            contract.clone(),
            MarketEventPayload::OpenInterest { contract, data },
        );
    }

    pub fn latest_quote(&self, contract: &str) -> Option<OptionQuote> {
        self.caches.read().quotes.get(contract).cloned()
    }

    pub fn latest_greeks(&self, contract: &str) -> Option<OptionGreeks> {
        self.caches.read().greeks.get(contract).cloned()
    }

    pub fn chain(&self, chain_key: &str) -> Option<OptionChain> {
        self.caches.read().chains.get(chain_key).cloned()
    }

    pub fn open_interest(&self, contract: &str) -> Option<OpenInterest> {
        self.caches.read().open_interest.get(contract).copied()
    }

    pub fn recent_trades(&self, contract: &str) -> Vec<OptionTrade> {
        self.caches
            .read()
            .recent_trades
            .get(contract)
            .map(|ring| ring.newest_first())
            .unwrap_or_default()
    }

    fn publish(&self, timestamp: time::OffsetDateTime, symbol: impl Into<String>, payload: MarketEventPayload) {
        let symbol = symbol.into();
        self.bus.try_publish("options", MarketEvent::new(timestamp, symbol, payload, None));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    fn quote(contract: &str) -> OptionQuote {
        OptionQuote {
            timestamp: datetime!(2026-01-01 00:00:00 UTC),
            contract: contract.to_string(),
            bid_price: dec!(1.10),
            bid_size: dec!(10),
            ask_price: dec!(1.20),
            ask_size: dec!(10),
        }
    }

    fn harness() -> (OptionCollector, crate::bus::BusSubscriber) {
        let bus = EventBus::new(64);
        let sub = bus.subscribe();
        (OptionCollector::new(OptionConfig::default(), bus), sub)
    }

    #[tokio::test]
    async fn quote_update_is_cached_and_published_unconditionally() {
        let (collector, mut sub) = harness();
        collector.on_quote(quote("AAPL:20260116:C:150.00"));
        let event = sub.recv().await.unwrap();
        assert!(matches!(event.payload, MarketEventPayload::OptionQuote(_)));
        assert!(collector.latest_quote("AAPL:20260116:C:150.00").is_some());
    }

    #[tokio::test]
    async fn repeated_sequence_numbers_are_never_rejected() {
        // Options carry no sequence_number field at all: two identical
        // updates in a row are both accepted and both published.
        let (collector, mut sub) = harness();
        collector.on_quote(quote("AAPL:20260116:C:150.00"));
        collector.on_quote(quote("AAPL:20260116:C:150.00"));
        let _ = sub.recv().await.unwrap();
        let _ = sub.recv().await.unwrap();
    }

    #[tokio::test]
    async fn recent_trades_ring_is_bounded_and_newest_first() {
        let (collector, mut sub) = harness();
        for i in 0..5 {
            collector.on_trade(OptionTrade {
                timestamp: datetime!(2026-01-01 00:00:00 UTC),
                contract: "AAPL:20260116:C:150.00".into(),
                price: dec!(1) + rust_decimal::Decimal::from(i),
                size: dec!(1),
            });
            let _ = sub.recv().await;
        }
        let recent = collector.recent_trades("AAPL:20260116:C:150.00");
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].price, dec!(5));
    }
}
