//! Provider descriptor and capability set (§3 Provider Descriptor, §4.H).

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarInterval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    OneDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Streaming,
    Historical,
    Trades,
    Quotes,
    Depth,
    Bars,
    Dividends,
    Splits,
}

#[derive(Debug, Clone, Default)]
pub struct RateLimitPolicy {
    pub requests_per_second: Option<u32>,
    pub max_symbols_per_request: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    pub set: HashSet<Capability>,
    pub supported_markets: Vec<String>,
    pub supported_bar_intervals: Vec<BarInterval>,
    pub max_symbols_per_request: Option<u32>,
    pub rate_limit: RateLimitPolicy,
}

impl Capabilities {
    pub fn has(&self, capability: Capability) -> bool {
        self.set.contains(&capability)
    }
}

/// §3 Provider Descriptor. `priority` is lower-is-more-preferred, matching
/// §4.H's `getBestAvailable` iteration order.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub id: String,
    pub display_name: String,
    pub priority: i32,
    pub capabilities: Capabilities,
    pub is_enabled: bool,
}

/// Each provider owns a contiguous 100,000-wide subscription-id block
/// starting at a multiple of 100,000 (§6 Provider subscription-id ranges).
/// `block` is the provider's zero-based block index: block 0 is ids
/// [0, 100_000), block 1 is [100_000, 200_000), and so on.
pub fn id_range_start(block: u64) -> u64 {
    block * 100_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_range_start_is_multiple_of_100k() {
        assert_eq!(id_range_start(0), 0);
        assert_eq!(id_range_start(2), 200_000);
        assert_eq!(id_range_start(3), 300_000);
    }
}
