//! Depth Collector (§4.D) — per-symbol Level-2 book reconstruction from
//! deltas. The hardest of the four collectors: every mutation goes through
//! a single-writer lock per symbol, tie-breaking position validity ahead
//! of sequence continuity (operation sanity is reported first).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::bus::EventBus;
use crate::config::DepthConfig;
use crate::model::symbol::is_valid;
use crate::model::{
    derive_mid_microprice_imbalance, BookSide, DepthOperation, IntegrityKind, IntegrityPayload,
    MarketDepthUpdate, MarketEvent, MarketEventPayload, MarketState, OrderBookLevel,
};

use super::ring::RingBuffer;

/// §3 SymbolOrderBookBuffer. Owned exclusively by the Depth Collector;
/// multi-reader/single-writer via the `RwLock` it is stored behind.
pub struct SymbolOrderBookBuffer {
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
    pub stale: bool,
    pub last_stream_id: Option<String>,
    pub last_venue: Option<String>,
    pub last_update_ts: Option<OffsetDateTime>,
    pub ingest_seq_counter: i64,
    pub last_applied_seq: i64,
    pub last_error_description: Option<String>,
}

impl SymbolOrderBookBuffer {
    fn new() -> Self {
        Self {
            bids: Vec::new(),
            asks: Vec::new(),
            stale: false,
            last_stream_id: None,
            last_venue: None,
            last_update_ts: None,
            ingest_seq_counter: 0,
            last_applied_seq: 0,
        last_error_description: None,
        }
    }

    fn side_mut(&mut self, side: BookSide) -> &mut Vec<OrderBookLevel> {
        match side {
            BookSide::Bid => &mut self.bids,
            BookSide::Ask => &mut self.asks,
        }
    }

    fn side(&self, side: BookSide) -> &Vec<OrderBookLevel> {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }
}

fn reindex(levels: &mut [OrderBookLevel]) {
    for (i, level) in levels.iter_mut().enumerate() {
        level.level = i as u32;
    }
}

/// Result of applying a position-addressed operation to one side.
enum ApplyOutcome {
    Applied,
    /// Position was out of range for the operation; carries the integrity
    /// kind the spec assigns to that specific failure (§4.D step 5).
    Invalid(IntegrityKind, &'static str),
}

fn apply_operation(
    levels: &mut Vec<OrderBookLevel>,
    side: BookSide,
    op: DepthOperation,
    position: u32,
    price: Decimal,
    size: Decimal,
    max_depth: usize,
) -> ApplyOutcome {
    let position = position as usize;
    match op {
        DepthOperation::Insert => {
            if position > levels.len() {
                return ApplyOutcome::Invalid(IntegrityKind::Gap, "insert position out of range");
            }
            levels.insert(
                position,
                OrderBookLevel {
                    side,
                    level: position as u32,
                    price,
                    size,
                },
            );
            reindex(levels);
            levels.truncate(max_depth);
            ApplyOutcome::Applied
        }
        DepthOperation::Update => {
            if position >= levels.len() {
                return ApplyOutcome::Invalid(IntegrityKind::OutOfOrder, "update position out of range");
            }
            levels[position].price = price;
            levels[position].size = size;
            ApplyOutcome::Applied
        }
        DepthOperation::Delete => {
            if position >= levels.len() {
                return ApplyOutcome::Invalid(IntegrityKind::InvalidPosition, "delete position out of range");
            }
            levels.remove(position);
            reindex(&mut levels[position.min(levels.len())..]);
            ApplyOutcome::Applied
        }
        DepthOperation::Unknown => ApplyOutcome::Invalid(IntegrityKind::Unknown, "unrecognized operation"),
    }
}

pub struct DepthCollector {
    config: DepthConfig,
    bus: EventBus,
    buffers: RwLock<HashMap<String, Arc<RwLock<SymbolOrderBookBuffer>>>>,
    recent_integrity: parking_lot::Mutex<RingBuffer<IntegrityPayload>>,
    known_subscriptions: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl DepthCollector {
    pub fn new(config: DepthConfig, bus: EventBus) -> Self {
        let capacity = config.recent_integrity_capacity;
        Self {
            config,
            bus,
            buffers: RwLock::new(HashMap::new()),
            recent_integrity: parking_lot::Mutex::new(RingBuffer::new(capacity)),
            known_subscriptions: None,
        }
    }

    /// Installs the subscription gate consulted when `require_explicit_subscription`
    /// is set (§4.D step 1): unknown symbols are dropped silently unless this
    /// predicate says the symbol is subscribed.
    pub fn with_subscription_gate(mut self, gate: Arc<dyn Fn(&str) -> bool + Send + Sync>) -> Self {
        self.known_subscriptions = Some(gate);
        self
    }

    pub fn recent_integrity(&self) -> Vec<IntegrityPayload> {
        self.recent_integrity.lock().newest_first()
    }

    /// Clears the stale flag for `symbol`, allowing updates to flow again.
    pub fn reset(&self, symbol: &str) {
        let key = symbol.trim().to_ascii_uppercase();
        if let Some(buffer) = self.buffers.read().get(&key) {
            let mut guard = buffer.write();
            guard.stale = false;
            guard.last_applied_seq = 0;
            guard.bids.clear();
            guard.asks.clear();
        }
    }

    pub fn is_stale(&self, symbol: &str) -> bool {
        let key = symbol.trim().to_ascii_uppercase();
        self.buffers
            .read()
            .get(&key)
            .map(|b| b.read().stale)
            .unwrap_or(false)
    }

    fn get_or_create(&self, key: &str) -> Arc<RwLock<SymbolOrderBookBuffer>> {
        if let Some(existing) = self.buffers.read().get(key) {
            return Arc::clone(existing);
        }
        let mut guard = self.buffers.write();
        Arc::clone(
            guard
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(SymbolOrderBookBuffer::new()))),
        )
    }

    pub fn on_depth(&self, update: MarketDepthUpdate) {
        if update.symbol.trim().is_empty() {
            self.fail(&update, IntegrityKind::InvalidSymbol, "symbol failed validation");
            return;
        }
        let symbol_config = crate::config::SymbolConfig::default();
        if !is_valid(&update.symbol, &symbol_config) {
            self.fail(&update, IntegrityKind::InvalidSymbol, "symbol failed validation");
            return;
        }
        let key = update.symbol.trim().to_ascii_uppercase();

        if self.config.require_explicit_subscription {
            let subscribed = self
                .known_subscriptions
                .as_ref()
                .map(|gate| gate(&key))
                .unwrap_or(false);
            if !subscribed {
                return;
            }
        }

        let buffer = self.get_or_create(&key);
        {
            let mut guard = buffer.write();
            if guard.stale {
                drop(guard);
                self.fail(&update, IntegrityKind::Stale, "Reset required");
                return;
            }

            let levels = guard.side_mut(update.side);
            match apply_operation(
                levels,
                update.side,
                update.operation,
                update.position,
                update.price,
                update.size,
                self.config.max_depth,
            ) {
                ApplyOutcome::Invalid(kind, description) => {
                    guard.stale = true;
                    guard.last_error_description = Some(description.to_string());
                    drop(guard);
                    self.fail(&update, kind, description);
                    return;
                }
                ApplyOutcome::Applied => {}
            }

            if update.sequence_number > 0 {
                let last = guard.last_applied_seq;
                if update.sequence_number == last {
                    guard.stale = true;
                    drop(guard);
                    self.fail(&update, IntegrityKind::OutOfOrder, "duplicate sequence");
                    return;
                }
                if update.sequence_number < last {
                    guard.stale = true;
                    drop(guard);
                    self.fail(&update, IntegrityKind::OutOfOrder, "regressed sequence");
                    return;
                }
                if update.sequence_number > last + 1 {
                    guard.stale = true;
                    drop(guard);
                    self.fail(&update, IntegrityKind::Gap, "sequence gap detected");
                    return;
                }
                guard.last_applied_seq = update.sequence_number;
            } else {
                guard.ingest_seq_counter += 1;
                guard.last_applied_seq = guard.ingest_seq_counter;
            }

            guard.last_stream_id = update.stream_id.clone();
            guard.last_venue = update.venue.clone();
            guard.last_update_ts = Some(update.timestamp);
        }

        self.publish_snapshot(&update, &buffer);
    }

    fn publish_snapshot(&self, update: &MarketDepthUpdate, buffer: &Arc<RwLock<SymbolOrderBookBuffer>>) {
        let guard = buffer.read();
        let (mid, micro_price, imbalance) = derive_mid_microprice_imbalance(&guard.bids, &guard.asks);
        let snapshot = crate::model::LobSnapshot {
            timestamp: update.timestamp,
            symbol: update.symbol.clone(),
            bids: guard.bids.clone(),
            asks: guard.asks.clone(),
            mid,
            micro_price,
            imbalance,
            market_state: if guard.stale {
                MarketState::Unknown
            } else {
                MarketState::Normal
            },
            sequence_number: guard.last_applied_seq,
            stream_id: guard.last_stream_id.clone(),
            venue: guard.last_venue.clone(),
        };
        drop(guard);
        self.bus.try_publish(
            update.venue.as_deref().unwrap_or("unknown"),
            MarketEvent::new(
                update.timestamp,
                update.symbol.clone(),
                MarketEventPayload::L2Snapshot(snapshot),
                update.venue.clone(),
            ),
        );
    }

    fn fail(&self, update: &MarketDepthUpdate, kind: IntegrityKind, description: &str) {
        log::warn!(
            "depth integrity: symbol={} kind={:?} description={} seq={} stream={:?} venue={:?}",
            update.symbol, kind, description, update.sequence_number, update.stream_id, update.venue
        );
        let payload = IntegrityPayload {
            kind,
            description: description.to_string(),
            offending_sequence: Some(update.sequence_number),
            expected_sequence: None,
            stream_id: update.stream_id.clone(),
            venue: update.venue.clone(),
        };
        self.recent_integrity.lock().push(payload.clone());
        self.bus.try_publish(
            update.venue.as_deref().unwrap_or("unknown"),
            MarketEvent::new(
                update.timestamp,
                update.symbol.clone(),
                MarketEventPayload::DepthIntegrity(payload),
                update.venue.clone(),
            ),
        );
        self.bus.try_publish(
            update.venue.as_deref().unwrap_or("unknown"),
            MarketEvent::new(
                update.timestamp,
                update.symbol.clone(),
                MarketEventPayload::ResyncRequested {
                    symbol: update.symbol.clone(),
                    reason: description.to_string(),
                },
                update.venue.clone(),
            ),
        );
    }
}
