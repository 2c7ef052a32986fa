//! WAL retention (§4.I `truncate(throughSequence)`): reclaims WAL files
//! that are fully committed, either deleting them or archiving a gzip copy
//! under `archive/` depending on `WalConfig::archive_after_truncate`. Never
//! touches the currently-open file.

use std::io::{Read, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::config::WalConfig;
use crate::error::Result;

use super::file::list_wal_files;
use super::recovery::read_max_sequence;

/// Deletes or archives every closed WAL file whose highest record sequence
/// is `<= through_sequence`. `active_file` is excluded unconditionally even
/// if it would otherwise qualify.
pub fn truncate(dir: &Path, active_file: &Path, through_sequence: i64, config: &WalConfig) -> Result<Vec<std::path::PathBuf>> {
    let mut reclaimed = Vec::new();
    for path in list_wal_files(dir)? {
        if path == active_file {
            continue;
        }
        let max_sequence = read_max_sequence(&path)?;
        if max_sequence > through_sequence {
            continue;
        }
        if config.archive_after_truncate {
            archive(dir, &path)?;
        }
        std::fs::remove_file(&path)?;
        log::info!("wal retention reclaimed {} (max_sequence={max_sequence})", path.display());
        reclaimed.push(path);
    }
    Ok(reclaimed)
}

fn archive(dir: &Path, path: &Path) -> Result<()> {
    let archive_dir = dir.join("archive");
    std::fs::create_dir_all(&archive_dir)?;
    let file_name = path
        .file_name()
        .expect("wal file paths always carry a file name")
        .to_string_lossy();
    let dest = archive_dir.join(format!("{file_name}.gz"));

    let mut contents = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut contents)?;
    let mut encoder = GzEncoder::new(std::fs::File::create(&dest)?, Compression::default());
    encoder.write_all(&contents)?;
    encoder.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::writer::WalWriter;

    #[test]
    fn truncate_archives_and_removes_fully_committed_files_but_keeps_active_one() {
        let dir = tempfile::tempdir().unwrap();
        let config = WalConfig::default();
        let writer = WalWriter::open(dir.path(), config, 0).unwrap();
        writer.append("{}", "Trade").unwrap();
        writer.commit(1).unwrap();
        writer.flush().unwrap();
        let active = writer.current_file_path();

        let reclaimed = truncate(dir.path(), &active, 1, &config).unwrap();
        // The only file on disk is the active one, so nothing is reclaimed.
        assert!(reclaimed.is_empty());
        assert!(active.exists());
    }

    #[test]
    fn truncate_skips_files_with_sequences_past_the_cutoff() {
        let dir = tempfile::tempdir().unwrap();
        let config = WalConfig {
            max_wal_file_size_bytes: 1,
            ..WalConfig::default()
        };
        let writer = WalWriter::open(dir.path(), config, 0).unwrap();
        writer.append("{}", "Trade").unwrap(); // rotates due to tiny size cap
        writer.append("{}", "Trade").unwrap();
        let active = writer.current_file_path();

        let reclaimed = truncate(dir.path(), &active, 0, &config).unwrap();
        assert!(reclaimed.is_empty());
    }
}
