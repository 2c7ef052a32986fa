//! WAL recovery (§4.I `initialize()`, `uncommittedRecords()`): stream-parses
//! every `*.wal` file, verifying checksums and skipping what can't be
//! trusted (invalid header → skip file; bad checksum or partial trailing
//! line → skip record), then reconstructs `maxSequence` and the
//! not-yet-committed tail.

use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Result;

use super::file::list_wal_files;
use super::header::WalHeader;
use super::record::WalRecord;

#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryStats {
    /// Domain-event records recovered (excludes `COMMIT` markers, which are
    /// log control records rather than events).
    pub last_recovery_event_count: u64,
    pub last_recovery_duration_ms: u64,
    pub invalid_record_count: u64,
    pub max_sequence: i64,
}

/// Streams the valid records of one WAL file, in file order. An invalid
/// header skips the whole file (returns an empty vec, logged by the
/// caller); a bad checksum or unparsable trailing line skips just that
/// record.
fn read_valid_records(path: &Path) -> Result<(Vec<WalRecord>, u64)> {
    let file = std::fs::File::open(path)?;
    let mut lines = BufReader::new(file).lines();
    let Some(Ok(header_line)) = lines.next() else {
        log::warn!("wal file {} is empty, skipping", path.display());
        return Ok((Vec::new(), 0));
    };
    if WalHeader::parse(&header_line).is_err() {
        log::warn!("wal file {} has an invalid header, skipping", path.display());
        return Ok((Vec::new(), 0));
    }

    let mut records = Vec::new();
    let mut invalid = 0u64;
    for line in lines {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("wal file {} unreadable line: {e}", path.display());
                invalid += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match WalRecord::parse(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                log::warn!("wal file {} dropped malformed/unverifiable record: {e}", path.display());
                invalid += 1;
            }
        }
    }
    Ok((records, invalid))
}

/// `initialize()` steps 1-3 (§4.I): list files in name order, verify every
/// record, compute `maxSequence`. Step 4 (opening the new writer file) is
/// the caller's job — see [`super::WriteAheadLog::initialize`].
pub fn recover(dir: &Path) -> Result<RecoveryStats> {
    let start = std::time::Instant::now();
    let mut stats = RecoveryStats::default();
    for path in list_wal_files(dir)? {
        let (records, invalid) = read_valid_records(&path)?;
        stats.invalid_record_count += invalid;
        for record in &records {
            stats.max_sequence = stats.max_sequence.max(record.sequence);
            if !record.is_commit() {
                stats.last_recovery_event_count += 1;
            }
        }
    }
    stats.last_recovery_duration_ms = start.elapsed().as_millis() as u64;
    log::info!(
        "wal recovery: {} events, {} invalid records, max_sequence={}, {}ms",
        stats.last_recovery_event_count,
        stats.invalid_record_count,
        stats.max_sequence,
        stats.last_recovery_duration_ms,
    );
    Ok(stats)
}

/// Highest record sequence found in a single WAL file, used by
/// [`super::retention::truncate`] to decide whether a file is fully
/// reclaimable.
pub fn read_max_sequence(path: &Path) -> Result<i64> {
    let (records, _) = read_valid_records(path)?;
    Ok(records.iter().map(|r| r.sequence).max().unwrap_or(0))
}

fn last_committed_sequence(dir: &Path) -> Result<i64> {
    let mut max_committed = 0i64;
    for path in list_wal_files(dir)? {
        let (records, _) = read_valid_records(&path)?;
        for record in records {
            if let Some(through) = record.commit_through() {
                max_committed = max_committed.max(through);
            }
        }
    }
    Ok(max_committed)
}

/// `uncommittedRecords()` (§4.I): two passes — compute `lastCommittedSequence`
/// from the max `COMMIT` payload, then yield every non-`COMMIT` record whose
/// sequence exceeds it, in file-name then in-file order, batched by
/// `batch_size` to bound memory. Also warns once if total WAL size exceeds
/// `warning_threshold_bytes`.
pub fn uncommitted_records(dir: &Path, batch_size: usize, warning_threshold_bytes: u64) -> Result<Vec<Vec<WalRecord>>> {
    let files = list_wal_files(dir)?;
    let total_bytes: u64 = files
        .iter()
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();
    if total_bytes > warning_threshold_bytes {
        log::warn!("wal directory size {total_bytes} bytes exceeds the configured warning threshold {warning_threshold_bytes} bytes");
    }

    let last_committed = last_committed_sequence(dir)?;
    let mut pending = Vec::new();
    for path in &files {
        let (records, _) = read_valid_records(path)?;
        for record in records {
            if !record.is_commit() && record.sequence > last_committed {
                pending.push(record);
            }
        }
    }

    Ok(pending.chunks(batch_size.max(1)).map(|chunk| chunk.to_vec()).collect())
}
