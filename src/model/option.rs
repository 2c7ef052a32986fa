//! Option contract/chain keys and payloads (§4.E).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionRight {
    Call,
    Put,
}

/// Canonical contract key: `underlying:yyyymmdd:right:strike(F2)`.
pub fn contract_key(underlying: &str, expiry: Date, right: OptionRight, strike: Decimal) -> String {
    let right = match right {
        OptionRight::Call => "C",
        OptionRight::Put => "P",
    };
    format!(
        "{}:{:04}{:02}{:02}:{}:{:.2}",
        underlying.to_ascii_uppercase(),
        expiry.year(),
        u8::from(expiry.month()),
        expiry.day(),
        right,
        strike,
    )
}

/// Canonical chain key: `underlying:yyyymmdd`.
pub fn chain_key(underlying: &str, expiry: Date) -> String {
    format!(
        "{}:{:04}{:02}{:02}",
        underlying.to_ascii_uppercase(),
        expiry.year(),
        u8::from(expiry.month()),
        expiry.day(),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub contract: String,
    pub bid_price: Decimal,
    pub bid_size: Decimal,
    pub ask_price: Decimal,
    pub ask_size: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionTrade {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub contract: String,
    pub price: Decimal,
    pub size: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionGreeks {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub contract: String,
    pub delta: Decimal,
    pub gamma: Decimal,
    pub theta: Decimal,
    pub vega: Decimal,
    pub implied_vol: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub chain: String,
    pub contracts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenInterest {
    pub contract_epoch_day: i32,
    pub open_interest: u64,
}
