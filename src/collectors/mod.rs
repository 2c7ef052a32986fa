//! The four collector modules (§4.C, §4.D, §4.E) plus their shared
//! building blocks (§9: ring buffers, rolling window accumulators).

pub mod depth;
pub mod option;
pub mod ring;
pub mod rolling;
pub mod trade;

pub use depth::DepthCollector;
pub use option::OptionCollector;
pub use ring::RingBuffer;
pub use rolling::{MultiWindowAccumulator, WindowAccumulator};
pub use trade::TradeCollector;
