//! Real-time market data core (§1 OVERVIEW): event bus, quote state store,
//! trade/depth/option collectors, subscription manager, the WebSocket
//! provider fabric, write-ahead log, storage policy contract, and replay
//! pipeline.
//!
//! Module layout mirrors spec section numbers; see each module's doc
//! comment for the section it implements.

pub mod bus;
pub mod clock;
pub mod collectors;
pub mod config;
pub mod error;
pub mod model;
pub mod providers;
pub mod quotes;
pub mod replay;
pub mod storage;
pub mod subscriptions;
pub mod wal;

pub use bus::{BusSubscriber, EventBus};
pub use error::{Error, Result};
pub use quotes::QuoteStateStore;
pub use subscriptions::SubscriptionManager;
pub use wal::WriteAheadLog;
