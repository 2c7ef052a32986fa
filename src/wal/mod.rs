//! Write-Ahead Log (§4.I): durable, sequence-numbered append log backing
//! the event bus, with streaming recovery and gzip-archiving retention.

mod file;
mod header;
mod record;
mod recovery;
mod retention;
mod writer;

pub use record::{WalRecord, COMMIT_RECORD_TYPE};
pub use recovery::RecoveryStats;
pub use writer::WalWriter;

use std::path::{Path, PathBuf};

use crate::config::WalConfig;
use crate::error::Result;

/// Facade combining the writer with recovery-derived stats, the way the
/// teacher's `Queue` combines a segment writer with the reader/rebuild
/// state computed at `open()` time.
pub struct WriteAheadLog {
    writer: WalWriter,
    stats: RecoveryStats,
}

impl WriteAheadLog {
    /// `initialize()` (§4.I): recovers `maxSequence` and event counts from
    /// any existing `*.wal` files, then opens a fresh file continuing the
    /// sequence from there.
    pub fn initialize(dir: impl Into<PathBuf>, config: WalConfig) -> Result<Self> {
        let dir = dir.into();
        let stats = recovery::recover(&dir)?;
        let writer = WalWriter::open(&dir, config, stats.max_sequence)?;
        Ok(Self { writer, stats })
    }

    pub fn append(&self, payload: &str, record_type: &str) -> Result<WalRecord> {
        self.writer.append(payload, record_type)
    }

    pub fn commit(&self, through_sequence: i64) -> Result<WalRecord> {
        self.writer.commit(through_sequence)
    }

    pub fn flush(&self) -> Result<()> {
        self.writer.flush()
    }

    /// `uncommittedRecords()` (§4.I): the non-`COMMIT` tail past the last
    /// commit marker, batched for bounded-memory replay on restart.
    pub fn uncommitted_records(&self, batch_size: usize, warning_threshold_bytes: u64) -> Result<Vec<Vec<WalRecord>>> {
        recovery::uncommitted_records(self.writer.dir(), batch_size, warning_threshold_bytes)
    }

    /// `truncate(throughSequence)` (§4.I): reclaims closed files fully
    /// covered by a commit at or before `through_sequence`.
    pub fn truncate(&self, through_sequence: i64, config: &WalConfig) -> Result<Vec<PathBuf>> {
        retention::truncate(self.writer.dir(), &self.writer.current_file_path(), through_sequence, config)
    }

    pub fn last_recovery_event_count(&self) -> u64 {
        self.stats.last_recovery_event_count
    }

    pub fn last_recovery_duration_ms(&self) -> u64 {
        self.stats.last_recovery_duration_ms
    }

    pub fn max_recovered_sequence(&self) -> i64 {
        self.stats.max_sequence
    }

    pub fn current_sequence(&self) -> i64 {
        self.writer.current_sequence()
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }
}
