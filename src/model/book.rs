//! Order book level and LOB snapshot types (§3).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::depth::BookSide;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub side: BookSide,
    pub level: u32,
    pub price: Decimal,
    pub size: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketState {
    Normal,
    Unknown,
}

/// Immutable copy of both sides of a book, emitted after every accepted
/// depth update (§4.D step 7). `bids`/`asks` are indexed from 0 and sorted
/// by `level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobSnapshot {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub symbol: String,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
    pub mid: Option<Decimal>,
    pub micro_price: Option<Decimal>,
    pub imbalance: Option<Decimal>,
    pub market_state: MarketState,
    pub sequence_number: i64,
    pub stream_id: Option<String>,
    pub venue: Option<String>,
}

/// Computes mid/microprice/imbalance per §3's LOB Snapshot invariants.
/// `mid` and `imbalance` are `None` unless both sides are non-empty;
/// `imbalance` additionally requires a non-zero size denominator.
/// `micro_price` is the size-weighted midpoint of the top level, a
/// standard refinement of `mid` that leans toward the heavier side.
pub fn derive_mid_microprice_imbalance(
    bids: &[OrderBookLevel],
    asks: &[OrderBookLevel],
) -> (Option<Decimal>, Option<Decimal>, Option<Decimal>) {
    let (Some(best_bid), Some(best_ask)) = (bids.first(), asks.first()) else {
        return (None, None, None);
    };
    let mid = (best_bid.price + best_ask.price) / Decimal::from(2);

    let denom = best_bid.size + best_ask.size;
    let (micro, imbalance) = if denom.is_zero() {
        (Some(mid), None)
    } else {
        let micro = (best_bid.price * best_ask.size + best_ask.price * best_bid.size) / denom;
        let imbalance = (best_bid.size - best_ask.size) / denom;
        (Some(micro), Some(imbalance))
    };
    (Some(mid), micro, imbalance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(side: BookSide, level: u32, price: Decimal, size: Decimal) -> OrderBookLevel {
        OrderBookLevel {
            side,
            level,
            price,
            size,
        }
    }

    #[test]
    fn mid_is_exact_average_of_top_of_book() {
        let bids = vec![level(BookSide::Bid, 0, dec!(100), dec!(10))];
        let asks = vec![level(BookSide::Ask, 0, dec!(101), dec!(10))];
        let (mid, _, imbalance) = derive_mid_microprice_imbalance(&bids, &asks);
        assert_eq!(mid, Some(dec!(100.5)));
        assert_eq!(imbalance, Some(dec!(0)));
    }

    #[test]
    fn empty_side_yields_none_mid_and_imbalance() {
        let bids = vec![level(BookSide::Bid, 0, dec!(100), dec!(10))];
        let (mid, micro, imbalance) = derive_mid_microprice_imbalance(&bids, &[]);
        assert_eq!(mid, None);
        assert_eq!(micro, None);
        assert_eq!(imbalance, None);
    }

    #[test]
    fn imbalance_favors_thinner_side() {
        let bids = vec![level(BookSide::Bid, 0, dec!(100), dec!(30))];
        let asks = vec![level(BookSide::Ask, 0, dec!(101), dec!(10))];
        let (_, _, imbalance) = derive_mid_microprice_imbalance(&bids, &asks);
        assert_eq!(imbalance, Some(dec!(0.5)));
    }
}
