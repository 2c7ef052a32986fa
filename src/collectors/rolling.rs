//! Rolling window state (§3 Rolling Window State, §4.C step 6-7).

use std::collections::VecDeque;
use std::time::Duration;

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::model::Aggressor;

#[derive(Debug, Clone)]
struct WindowEntry {
    timestamp: OffsetDateTime,
    price: Decimal,
    size: Decimal,
    aggressor: Aggressor,
}

/// A single (symbol, window) accumulator. Maintains running sums so that
/// `vwap`/`imbalance` are O(1) to read; `add` evicts entries older than
/// `window` relative to the newest timestamp seen.
#[derive(Debug, Clone)]
pub struct WindowAccumulator {
    window: Duration,
    entries: VecDeque<WindowEntry>,
    buy_volume: Decimal,
    sell_volume: Decimal,
    unknown_volume: Decimal,
    vwap_num: Decimal,
    vwap_den: Decimal,
}

impl WindowAccumulator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: VecDeque::new(),
            buy_volume: Decimal::ZERO,
            sell_volume: Decimal::ZERO,
            unknown_volume: Decimal::ZERO,
            vwap_num: Decimal::ZERO,
            vwap_den: Decimal::ZERO,
        }
    }

    pub fn add(&mut self, timestamp: OffsetDateTime, price: Decimal, size: Decimal, aggressor: Aggressor) {
        match aggressor {
            Aggressor::Buy => self.buy_volume += size,
            Aggressor::Sell => self.sell_volume += size,
            Aggressor::Unknown => self.unknown_volume += size,
        }
        self.vwap_num += price * size;
        self.vwap_den += size;
        self.entries.push_back(WindowEntry {
            timestamp,
            price,
            size,
            aggressor,
        });
        self.evict_stale(timestamp);
    }

    fn evict_stale(&mut self, now: OffsetDateTime) {
        let window_ns = self.window.as_nanos() as i128;
        while let Some(front) = self.entries.front() {
            let age_ns = now.unix_timestamp_nanos() - front.timestamp.unix_timestamp_nanos();
            if age_ns > window_ns {
                let front = self.entries.pop_front().unwrap();
                match front.aggressor {
                    Aggressor::Buy => self.buy_volume -= front.size,
                    Aggressor::Sell => self.sell_volume -= front.size,
                    Aggressor::Unknown => self.unknown_volume -= front.size,
                }
                self.vwap_num -= front.price * front.size;
                self.vwap_den -= front.size;
            } else {
                break;
            }
        }
    }

    pub fn trade_count(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn buy_volume(&self) -> Decimal {
        self.buy_volume
    }

    pub fn sell_volume(&self) -> Decimal {
        self.sell_volume
    }

    pub fn unknown_volume(&self) -> Decimal {
        self.unknown_volume
    }

    /// Σ(price·size)/Σ(size); 0 when the window is empty (division-by-zero
    /// policy per §4.C step 7).
    pub fn vwap(&self) -> Decimal {
        if self.vwap_den.is_zero() {
            Decimal::ZERO
        } else {
            self.vwap_num / self.vwap_den
        }
    }

    /// (buy-sell)/(buy+sell+unknown); 0 when the denominator is 0.
    pub fn imbalance(&self) -> Decimal {
        let denom = self.buy_volume + self.sell_volume + self.unknown_volume;
        if denom.is_zero() {
            Decimal::ZERO
        } else {
            (self.buy_volume - self.sell_volume) / denom
        }
    }
}

/// All three windows (§6: {1s, 10s, 60s}) for one symbol.
#[derive(Debug, Clone)]
pub struct MultiWindowAccumulator {
    pub one_second: WindowAccumulator,
    pub ten_second: WindowAccumulator,
    pub sixty_second: WindowAccumulator,
}

impl MultiWindowAccumulator {
    pub fn new(windows: [Duration; 3]) -> Self {
        Self {
            one_second: WindowAccumulator::new(windows[0]),
            ten_second: WindowAccumulator::new(windows[1]),
            sixty_second: WindowAccumulator::new(windows[2]),
        }
    }

    pub fn add(&mut self, timestamp: OffsetDateTime, price: Decimal, size: Decimal, aggressor: Aggressor) {
        self.one_second.add(timestamp, price, size, aggressor);
        self.ten_second.add(timestamp, price, size, aggressor);
        self.sixty_second.add(timestamp, price, size, aggressor);
    }
}
