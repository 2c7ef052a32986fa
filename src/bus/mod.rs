//! Event Bus (§4.A) — a single logical multi-producer broadcast channel
//! for `MarketEvent`s with bounded, drop-oldest backpressure.
//!
//! Grounded on the teacher's use of bounded, single-reader channels between
//! the socket thread and collectors (`core/segment_writer.rs` wait/notify
//! discipline; §9 Design Notes "message buffering between socket thread and
//! collectors"); here the channel is multi-*reader* too, which maps cleanly
//! onto `tokio::sync::broadcast` — a bounded ring buffer that silently
//! overwrites the oldest unread entry when full, exactly the drop-oldest
//! policy §4.A calls for. Lagging receivers observe this as
//! `RecvError::Lagged`, which [`BusSubscriber::recv`] turns back into a
//! "keep going" loop rather than propagating to the caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::model::{MarketEvent, MarketEventKind};

#[derive(Debug, Default)]
struct OverflowCounters {
    by_source: RwLock<HashMap<String, Arc<AtomicU64>>>,
}

impl OverflowCounters {
    fn counter_for(&self, source: &str) -> Arc<AtomicU64> {
        if let Some(existing) = self.by_source.read().get(source) {
            return Arc::clone(existing);
        }
        let mut guard = self.by_source.write();
        Arc::clone(
            guard
                .entry(source.to_string())
                .or_insert_with(|| Arc::new(AtomicU64::new(0))),
        )
    }

    fn snapshot(&self) -> HashMap<String, u64> {
        self.by_source
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect()
    }
}

/// The bus itself. Cheap to clone (wraps an `Arc` internally via the
/// broadcast sender); share one instance across producers and subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MarketEvent>,
    capacity: usize,
    overflow: Arc<OverflowCounters>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            capacity: capacity.max(1),
            overflow: Arc::new(OverflowCounters::default()),
        }
    }

    /// Publishes `event` attributed to `source` (a provider id, typically).
    /// Returns `true` if the event was accepted. The only rejection case is
    /// "no receivers are subscribed" (`broadcast::Sender::send` errors);
    /// overflow never rejects — it silently drops the oldest entry instead,
    /// which is recorded against `source`'s counter.
    pub fn try_publish(&self, source: &str, event: MarketEvent) -> bool {
        if self.sender.len() >= self.capacity {
            self.overflow.counter_for(source).fetch_add(1, Ordering::Relaxed);
        }
        self.sender.send(event).is_ok()
    }

    /// Current per-source overflow (dropped-oldest) counts.
    pub fn overflow_counts(&self) -> HashMap<String, u64> {
        self.overflow.snapshot()
    }

    pub fn subscribe(&self) -> BusSubscriber {
        BusSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A bus subscriber. `recv` transparently resumes past lag (the drop-oldest
/// policy means a lagged receiver has already lost those events — there is
/// nothing to retry) and exposes filtering helpers for type/symbol topics.
pub struct BusSubscriber {
    receiver: broadcast::Receiver<MarketEvent>,
}

impl BusSubscriber {
    pub async fn recv(&mut self) -> Option<MarketEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receives the next event matching `kinds` (if non-empty) and
    /// `symbols` (if non-empty, case-insensitive).
    pub async fn recv_filtered(
        &mut self,
        kinds: &[MarketEventKind],
        symbols: &[String],
    ) -> Option<MarketEvent> {
        loop {
            let event = self.recv().await?;
            let kind_ok = kinds.is_empty() || kinds.contains(&event.kind());
            let symbol_ok = symbols.is_empty()
                || symbols
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(&event.symbol));
            if kind_ok && symbol_ok {
                return Some(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Heartbeat, MarketEventPayload};
    use time::OffsetDateTime;

    fn heartbeat_event(symbol: &str) -> MarketEvent {
        MarketEvent::new(
            OffsetDateTime::now_utc(),
            symbol,
            MarketEventPayload::Heartbeat(Heartbeat {
                provider_id_hash: 1,
            }),
            Some("test".into()),
        )
    }

    #[tokio::test]
    async fn delivers_in_submission_order_to_a_single_subscriber() {
        let bus = EventBus::new(16);
        let mut sub = bus.subscribe();
        for i in 0..5 {
            assert!(bus.try_publish("p1", heartbeat_event(&format!("SYM{i}"))));
        }
        for i in 0..5 {
            let event = sub.recv().await.unwrap();
            assert_eq!(event.symbol, format!("SYM{i}"));
        }
    }

    #[tokio::test]
    async fn overflow_increments_per_source_counter_and_drops_oldest() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();
        // capacity 2: third publish overflows before the subscriber ever reads.
        bus.try_publish("provA", heartbeat_event("A"));
        bus.try_publish("provA", heartbeat_event("B"));
        bus.try_publish("provA", heartbeat_event("C"));
        assert_eq!(bus.overflow_counts().get("provA").copied(), Some(1));
        // the oldest ("A") was dropped; subscriber only sees B, C.
        let first = sub.recv().await.unwrap();
        assert_eq!(first.symbol, "B");
    }

    #[tokio::test]
    async fn try_publish_with_no_subscribers_reports_rejected() {
        let bus = EventBus::new(4);
        assert!(!bus.try_publish("p1", heartbeat_event("A")));
    }

    #[tokio::test]
    async fn recv_filtered_skips_non_matching_symbol() {
        let bus = EventBus::new(8);
        let mut sub = bus.subscribe();
        bus.try_publish("p1", heartbeat_event("AAPL"));
        bus.try_publish("p1", heartbeat_event("MSFT"));
        let symbols = vec!["MSFT".to_string()];
        let event = sub.recv_filtered(&[], &symbols).await.unwrap();
        assert_eq!(event.symbol, "MSFT");
    }
}
