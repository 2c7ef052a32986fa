//! Crate-wide error type.
//!
//! Per spec, most failure conditions observed while processing market data
//! (bad sequence numbers, stale streams, unknown symbols) are *not* errors —
//! they are reported as `MarketEvent::Integrity` / `MarketEvent::DepthIntegrity`
//! events on the bus (see [`crate::model::event`]). `Error` is reserved for
//! failures that should abort the calling operation: I/O, malformed WAL
//! files/records the caller asked to read directly, and provider transport
//! failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("wal record malformed: {0}")]
    MalformedRecord(String),

    #[error("wal checksum mismatch at sequence {0}")]
    ChecksumMismatch(u64),

    #[error("wal header malformed: {0}")]
    MalformedHeader(String),

    #[error("replay already running")]
    ReplayAlreadyRunning,

    #[error("provider transport error: {0}")]
    Transport(String),

    #[error("provider {0} not found")]
    ProviderNotFound(String),

    #[error("no streaming factory registered for {0:?} and no default available")]
    NoStreamingFactory(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
