use mdc::config::WalConfig;
use mdc::wal::WriteAheadLog;

#[test]
fn s6_restart_recovers_committed_and_uncommitted_records_separately() {
    let dir = tempfile::tempdir().unwrap();
    let config = WalConfig::default();

    {
        let wal = WriteAheadLog::initialize(dir.path(), config).unwrap();
        for _ in 0..100 {
            wal.append("{}", "Trade").unwrap();
        }
        wal.commit(50).unwrap();
        wal.flush().unwrap();
    }

    let wal = WriteAheadLog::initialize(dir.path(), config).unwrap();
    assert_eq!(wal.last_recovery_event_count(), 100);
    assert_eq!(wal.max_recovered_sequence(), 101); // the commit record itself took sequence 101

    let batches = wal.uncommitted_records(10_000, u64::MAX).unwrap();
    let uncommitted: Vec<_> = batches.into_iter().flatten().collect();
    assert_eq!(uncommitted.len(), 50);
    assert_eq!(uncommitted[0].sequence, 51);
    assert_eq!(uncommitted.last().unwrap().sequence, 100);
}

#[test]
fn truncate_reclaims_fully_committed_closed_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = WalConfig::default();
    config.max_wal_file_size_bytes = 64; // force rotation after a handful of records
    config.archive_after_truncate = true;

    let wal = WriteAheadLog::initialize(dir.path(), config).unwrap();
    for _ in 0..20 {
        wal.append("{}", "Trade").unwrap();
    }
    wal.commit(wal.current_sequence()).unwrap();
    wal.flush().unwrap();

    let reclaimed = wal.truncate(i64::MAX, &config).unwrap();
    assert!(!reclaimed.is_empty());
    // the active file must survive truncation regardless of its sequences
    assert!(wal.dir().join("archive").exists() || reclaimed.is_empty());
}
