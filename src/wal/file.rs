//! WAL file naming (§4.I, §6): `wal_<yyyyMMdd_HHmmss>_<seq:D12>.wal`, where
//! `seq` is a rotation-ordered file index (not a record sequence number).
//! Lexicographic order on the name equals creation order, which is what
//! `initialize()`'s "list `*.wal` in name order" step relies on.

use std::path::{Path, PathBuf};

use time::OffsetDateTime;

pub fn format_name(created_at: OffsetDateTime, file_index: u64) -> String {
    let created_at = created_at.to_offset(time::UtcOffset::UTC);
    format!(
        "wal_{:04}{:02}{:02}_{:02}{:02}{:02}_{:012}.wal",
        created_at.year(),
        u8::from(created_at.month()),
        created_at.day(),
        created_at.hour(),
        created_at.minute(),
        created_at.second(),
        file_index,
    )
}

/// Parses the trailing `<seq:D12>` out of a WAL file name, for computing
/// the next rotation index. Returns `None` for names that don't match.
pub fn parse_file_index(name: &str) -> Option<u64> {
    let stem = name.strip_prefix("wal_")?.strip_suffix(".wal")?;
    let (_, seq) = stem.rsplit_once('_')?;
    seq.parse().ok()
}

/// Lists `*.wal` files directly under `dir`, sorted by file name.
pub fn list_wal_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    if !dir.exists() {
        return Ok(paths);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("wal") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

pub fn next_file_index(dir: &Path) -> std::io::Result<u64> {
    let files = list_wal_files(dir)?;
    Ok(files
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()).and_then(parse_file_index))
        .max()
        .map(|max| max + 1)
        .unwrap_or(0))
}
