//! Subscription Manager (§4.F) — a thread-safe `subscription-id ↔
//! (symbol, kind)` mapping, one lock guarding all three symbol sets so
//! `subscribe`/`unsubscribe`/`unsubscribe_symbol` are each atomic.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::model::SubscriptionKind;
use crate::model::provider::id_range_start;

struct Inner {
    /// `(symbol, kind) -> set of subscription ids`. A symbol/kind pair can
    /// be referenced by more than one id (two callers subscribing to the
    /// same stream); the pair only leaves its set once the last id on it
    /// is removed.
    by_symbol_kind: HashMap<(String, SubscriptionKind), HashSet<u64>>,
    id_to_symbol_kind: HashMap<u64, (String, SubscriptionKind)>,
    next_id: u64,
}

/// Owns one provider's id block (§6: ids are `provider-range-start +
/// counter`, never reused within the process).
pub struct SubscriptionManager {
    inner: Mutex<Inner>,
}

impl SubscriptionManager {
    /// `provider_block` is the provider's zero-based id-range block
    /// (§3 Provider Descriptor `id_range_start`).
    pub fn new(provider_block: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                by_symbol_kind: HashMap::new(),
                id_to_symbol_kind: HashMap::new(),
                next_id: id_range_start(provider_block),
            }),
        }
    }

    /// Allocates a fresh id and adds it to `(symbol, kind)`'s set. The
    /// symbol sets are keyed on the canonical (trimmed, upper-cased) form.
    pub fn subscribe(&self, symbol: &str, kind: SubscriptionKind) -> u64 {
        let key = (symbol.trim().to_ascii_uppercase(), kind);
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.by_symbol_kind.entry(key.clone()).or_default().insert(id);
        inner.id_to_symbol_kind.insert(id, key);
        id
    }

    /// Removes `id`. The `(symbol, kind)` pair is dropped from its set
    /// only once `id` was its last remaining reference.
    pub fn unsubscribe(&self, id: u64) {
        let mut inner = self.inner.lock();
        let Some(key) = inner.id_to_symbol_kind.remove(&id) else {
            return;
        };
        if let Some(ids) = inner.by_symbol_kind.get_mut(&key) {
            ids.remove(&id);
            if ids.is_empty() {
                inner.by_symbol_kind.remove(&key);
            }
        }
    }

    /// Removes every kind and every id for `symbol`.
    pub fn unsubscribe_symbol(&self, symbol: &str) {
        let symbol = symbol.trim().to_ascii_uppercase();
        let mut inner = self.inner.lock();
        let keys: Vec<(String, SubscriptionKind)> = inner
            .by_symbol_kind
            .keys()
            .filter(|(s, _)| *s == symbol)
            .cloned()
            .collect();
        for key in keys {
            if let Some(ids) = inner.by_symbol_kind.remove(&key) {
                for id in ids {
                    inner.id_to_symbol_kind.remove(&id);
                }
            }
        }
    }

    pub fn is_subscribed(&self, symbol: &str, kind: SubscriptionKind) -> bool {
        let key = (symbol.trim().to_ascii_uppercase(), kind);
        self.inner
            .lock()
            .by_symbol_kind
            .get(&key)
            .map(|ids| !ids.is_empty())
            .unwrap_or(false)
    }

    pub fn symbol_for(&self, id: u64) -> Option<(String, SubscriptionKind)> {
        self.inner.lock().id_to_symbol_kind.get(&id).cloned()
    }

    pub fn symbols_for_kind(&self, kind: SubscriptionKind) -> Vec<String> {
        self.inner
            .lock()
            .by_symbol_kind
            .keys()
            .filter(|(_, k)| *k == kind)
            .map(|(s, _)| s.clone())
            .collect()
    }
}
