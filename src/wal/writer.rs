//! WAL writer (§4.I `append`/`commit`) — rotation, sync-mode-driven
//! flush/fsync, all under a single non-reentrant write lock (§5: "WAL
//! exposes append/commit/flush/truncate under a single write lock").

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use time::OffsetDateTime;

use crate::config::{SyncMode, WalConfig};
use crate::error::Result;

use super::file::{format_name, next_file_index};
use super::header::WalHeader;
use super::record::WalRecord;

struct OpenFile {
    writer: BufWriter<File>,
    path: PathBuf,
    opened_at: OffsetDateTime,
    bytes_written: u64,
}

struct WriterState {
    file: OpenFile,
    file_index: u64,
    current_sequence: i64,
    /// Records written since the last flush; distinct from the WAL-wide
    /// "uncommitted" concept in [`super::recovery`], which counts records
    /// since the last `COMMIT` marker rather than since the last flush.
    pending_flush_records: u64,
    last_flush_time: OffsetDateTime,
}

/// Owns the currently-open WAL file and the monotonic sequence counter.
/// One instance per WAL directory.
pub struct WalWriter {
    dir: PathBuf,
    config: WalConfig,
    state: Mutex<WriterState>,
}

impl WalWriter {
    /// Opens a new WAL file with `starting_sequence` as `currentSequence`
    /// (§4.I `initialize()` step 4, called once recovery has computed
    /// `maxSequence` across existing files).
    pub fn open(dir: impl Into<PathBuf>, config: WalConfig, starting_sequence: i64) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let file_index = next_file_index(&dir)?;
        let file = Self::open_new_file(&dir, file_index)?;
        Ok(Self {
            dir,
            config,
            state: Mutex::new(WriterState {
                file,
                file_index,
                current_sequence: starting_sequence,
                pending_flush_records: 0,
                last_flush_time: OffsetDateTime::now_utc(),
            }),
        })
    }

    fn open_new_file(dir: &Path, file_index: u64) -> Result<OpenFile> {
        let now = OffsetDateTime::now_utc();
        let name = format_name(now, file_index);
        let path = dir.join(name);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(WalHeader::new(now).to_line().as_bytes())?;
        file.sync_all()?;
        log::info!("wal rotated to {}", path.display());
        Ok(OpenFile {
            writer: BufWriter::new(file),
            path,
            opened_at: now,
            bytes_written: 0,
        })
    }

    /// Assumes the caller holds `state` — encodes the §9 "internal helper
    /// must assume the caller holds the lock" precondition in the name.
    fn rotate_if_due_locked(&self, state: &mut WriterState) -> Result<()> {
        let now = OffsetDateTime::now_utc();
        let size_due = state.file.bytes_written >= self.config.max_wal_file_size_bytes;
        let age_secs = (now.unix_timestamp() - state.file.opened_at.unix_timestamp()).max(0) as u64;
        let age_due = age_secs >= self.config.max_wal_file_age.as_secs();
        if size_due || age_due {
            state.file.writer.flush()?;
            state.file.writer.get_ref().sync_all()?;
            state.file_index += 1;
            state.file = Self::open_new_file(&self.dir, state.file_index)?;
        }
        Ok(())
    }

    fn flush_if_due_locked(&self, state: &mut WriterState, now: OffsetDateTime) -> Result<()> {
        let elapsed_secs = (now.unix_timestamp() - state.last_flush_time.unix_timestamp()).max(0) as u64;
        let flush_due = matches!(self.config.sync_mode, SyncMode::EveryWrite)
            || (matches!(self.config.sync_mode, SyncMode::BatchedSync)
                && state.pending_flush_records >= self.config.sync_batch_size)
            || elapsed_secs >= self.config.max_flush_delay.as_secs();
        if flush_due {
            state.file.writer.flush()?;
            if self.config.sync_mode != SyncMode::NoSync {
                state.file.writer.get_ref().sync_all()?;
            }
            state.pending_flush_records = 0;
            state.last_flush_time = now;
        }
        Ok(())
    }

    fn append_record(&self, state: &mut WriterState, record: &WalRecord) -> Result<()> {
        let line = record.to_line();
        state.file.writer.write_all(line.as_bytes())?;
        state.file.bytes_written += line.len() as u64;
        state.pending_flush_records += 1;
        Ok(())
    }

    /// `append(payload, recordType)` (§4.I). Rotates first if size/age is
    /// due, then assigns the next sequence number and writes the line.
    pub fn append(&self, payload: &str, record_type: &str) -> Result<WalRecord> {
        let mut state = self.state.lock();
        self.rotate_if_due_locked(&mut state)?;
        state.current_sequence += 1;
        let record = WalRecord::new(state.current_sequence, OffsetDateTime::now_utc(), record_type, payload);
        self.append_record(&mut state, &record)?;
        let now = record.timestamp;
        self.flush_if_due_locked(&mut state, now)?;
        Ok(record)
    }

    /// `commit(throughSequence)`: always flushes and fsyncs regardless of
    /// sync mode (§4.I).
    pub fn commit(&self, through_sequence: i64) -> Result<WalRecord> {
        let mut state = self.state.lock();
        self.rotate_if_due_locked(&mut state)?;
        state.current_sequence += 1;
        let record = WalRecord::commit(state.current_sequence, OffsetDateTime::now_utc(), through_sequence);
        self.append_record(&mut state, &record)?;
        state.file.writer.flush()?;
        state.file.writer.get_ref().sync_all()?;
        state.pending_flush_records = 0;
        state.last_flush_time = record.timestamp;
        Ok(record)
    }

    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        let now = OffsetDateTime::now_utc();
        state.file.writer.flush()?;
        if self.config.sync_mode != SyncMode::NoSync {
            state.file.writer.get_ref().sync_all()?;
        }
        state.pending_flush_records = 0;
        state.last_flush_time = now;
        Ok(())
    }

    pub fn current_sequence(&self) -> i64 {
        self.state.lock().current_sequence
    }

    pub fn current_file_path(&self) -> PathBuf {
        self.state.lock().file.path.clone()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_assigns_strictly_increasing_sequence_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let writer = WalWriter::open(dir.path(), WalConfig::default(), 0).unwrap();
        let r1 = writer.append("{}", "Trade").unwrap();
        let r2 = writer.append("{}", "Trade").unwrap();
        assert_eq!(r1.sequence, 1);
        assert_eq!(r2.sequence, 2);
    }

    #[test]
    fn commit_record_carries_through_sequence_as_payload() {
        let dir = tempfile::tempdir().unwrap();
        let writer = WalWriter::open(dir.path(), WalConfig::default(), 0).unwrap();
        writer.append("{}", "Trade").unwrap();
        let commit = writer.commit(1).unwrap();
        assert!(commit.is_commit());
        assert_eq!(commit.commit_through(), Some(1));
    }

    #[test]
    fn every_write_mode_syncs_after_each_append() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WalConfig::default();
        config.sync_mode = SyncMode::EveryWrite;
        let writer = WalWriter::open(dir.path(), config, 0).unwrap();
        writer.append("{}", "Trade").unwrap();
        let contents = std::fs::read_to_string(writer.current_file_path()).unwrap();
        assert_eq!(contents.lines().count(), 2); // header + one record
    }
}
