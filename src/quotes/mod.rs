//! Quote State Store (§4.B) — authoritative latest-BBO per symbol.
//!
//! Concurrent reads, serialized upserts per symbol: a `parking_lot::RwLock`
//! over a `HashMap` gives readers free concurrency and writers exclusive
//! access without the reentrancy hazards of a mutex-per-entry scheme. No
//! history is kept — each upsert replaces the prior value outright.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::model::BboQuotePayload;

#[derive(Default)]
pub struct QuoteStateStore {
    quotes: RwLock<HashMap<String, BboQuotePayload>>,
}

impl QuoteStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(symbol: &str) -> String {
        symbol.trim().to_ascii_uppercase()
    }

    pub fn try_get(&self, symbol: &str) -> Option<BboQuotePayload> {
        self.quotes.read().get(&Self::key(symbol)).cloned()
    }

    /// Replaces the entry for `payload.symbol`, returning the stored copy.
    pub fn upsert(&self, payload: BboQuotePayload) -> BboQuotePayload {
        let key = Self::key(&payload.symbol);
        let mut guard = self.quotes.write();
        guard.insert(key, payload.clone());
        payload
    }

    pub fn try_remove(&self, symbol: &str) -> Option<BboQuotePayload> {
        self.quotes.write().remove(&Self::key(symbol))
    }

    pub fn snapshot(&self) -> HashMap<String, BboQuotePayload> {
        self.quotes.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::OffsetDateTime;

    fn quote(symbol: &str) -> BboQuotePayload {
        BboQuotePayload {
            timestamp: OffsetDateTime::now_utc(),
            symbol: symbol.to_string(),
            bid_price: dec!(100),
            bid_size: dec!(10),
            ask_price: dec!(101),
            ask_size: dec!(10),
        }
    }

    #[test]
    fn upsert_then_get_is_case_insensitive() {
        let store = QuoteStateStore::new();
        store.upsert(quote("aapl"));
        assert!(store.try_get("AAPL").is_some());
    }

    #[test]
    fn upsert_replaces_prior_value_with_no_history() {
        let store = QuoteStateStore::new();
        store.upsert(quote("AAPL"));
        let mut second = quote("AAPL");
        second.bid_price = dec!(105);
        store.upsert(second);
        assert_eq!(store.try_get("AAPL").unwrap().bid_price, dec!(105));
    }

    #[test]
    fn remove_then_get_returns_none() {
        let store = QuoteStateStore::new();
        store.upsert(quote("AAPL"));
        assert!(store.try_remove("AAPL").is_some());
        assert!(store.try_get("AAPL").is_none());
    }

    #[test]
    fn snapshot_is_independent_copy() {
        let store = QuoteStateStore::new();
        store.upsert(quote("AAPL"));
        let snap = store.snapshot();
        store.upsert(quote("MSFT"));
        assert_eq!(snap.len(), 1);
    }
}
