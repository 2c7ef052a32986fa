//! Tunables enumerated in spec §6, grouped by the subsystem that consumes
//! them. No file/env loading lives here — that is an external
//! collaborator's job (§1) — these are plain structs the embedding
//! application constructs and passes to the relevant constructors, the way
//! the teacher threads `WriterConfig`/`ReaderConfig` through
//! `Queue::open_*_with_config`.

use std::time::Duration;

/// Symbol validation rules (§3 Symbol).
#[derive(Debug, Clone, Copy)]
pub struct SymbolConfig {
    pub max_len: usize,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self { max_len: 50 }
    }
}

/// Depth collector tunables (§4.D).
#[derive(Debug, Clone, Copy)]
pub struct DepthConfig {
    pub max_depth: usize,
    pub recent_integrity_capacity: usize,
    pub require_explicit_subscription: bool,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            max_depth: 50,
            recent_integrity_capacity: 100,
            require_explicit_subscription: false,
        }
    }
}

/// Trade collector tunables (§4.C).
#[derive(Debug, Clone, Copy)]
pub struct TradeConfig {
    pub recent_trade_capacity: usize,
    pub aggressor_quote_max_age: Duration,
    pub windows: [Duration; 3],
    pub order_flow_window: Duration,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            recent_trade_capacity: 200,
            aggressor_quote_max_age: Duration::from_millis(250),
            windows: [
                Duration::from_secs(1),
                Duration::from_secs(10),
                Duration::from_secs(60),
            ],
            order_flow_window: Duration::from_secs(10),
        }
    }
}

/// Option collector tunables (§4.E).
#[derive(Debug, Clone, Copy)]
pub struct OptionConfig {
    pub recent_trade_capacity: usize,
}

impl Default for OptionConfig {
    fn default() -> Self {
        Self {
            recent_trade_capacity: 100,
        }
    }
}

/// WAL sync durability mode (§4.I).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    NoSync,
    BatchedSync,
    EveryWrite,
}

impl Default for SyncMode {
    fn default() -> Self {
        SyncMode::BatchedSync
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WalConfig {
    pub max_wal_file_size_bytes: u64,
    pub max_wal_file_age: Duration,
    pub sync_mode: SyncMode,
    pub sync_batch_size: u64,
    pub max_flush_delay: Duration,
    pub archive_after_truncate: bool,
    pub uncommitted_size_warning_threshold: u64,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            max_wal_file_size_bytes: 100 * 1024 * 1024,
            max_wal_file_age: Duration::from_secs(3600),
            sync_mode: SyncMode::BatchedSync,
            sync_batch_size: 1000,
            max_flush_delay: Duration::from_secs(1),
            archive_after_truncate: true,
            uncommitted_size_warning_threshold: 50 * 1024 * 1024,
        }
    }
}

/// WebSocket provider base tunables (§4.G).
#[derive(Debug, Clone, Copy)]
pub struct ProviderConfig {
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub retry_base_delay: Duration,
    pub max_retry_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub message_channel_capacity: usize,
    pub connect_timeout: Duration,
    pub disconnect_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(15),
            heartbeat_timeout: Duration::from_secs(10),
            retry_base_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(30),
            max_reconnect_attempts: 10,
            message_channel_capacity: 4096,
            connect_timeout: Duration::from_secs(30),
            disconnect_timeout: Duration::from_secs(10),
        }
    }
}

/// Replay pipeline tunables (§4.K).
#[derive(Debug, Clone, Default)]
pub struct ReplayConfig {
    pub symbols: Option<Vec<String>>,
    pub event_types: Option<Vec<crate::model::event::MarketEventKind>>,
    pub from: Option<time::OffsetDateTime>,
    pub to: Option<time::OffsetDateTime>,
    pub speed_multiplier: f64,
    pub max_events: Option<u64>,
}
