//! Replay pipeline (§4.K): reads persisted events back in timestamp order,
//! applies filters, paces playback by inter-event delta, and republishes
//! through an optional sink. Cooperative pause/resume and cancellation
//! mirror the stop/backoff flags `WebSocketProvider` uses for its own
//! lifecycle (`AtomicBool` checked at every suspension point).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use time::OffsetDateTime;
use tokio::sync::Notify;

use crate::config::ReplayConfig;
use crate::error::{Error, Result};
use crate::model::event::MarketEvent;
use crate::storage::EventSink;

use super::reader::read_events;

#[derive(Debug, Clone, Default)]
pub struct ReplayStats {
    pub replayed: u64,
    pub skipped: u64,
    pub errored: u64,
    pub bytes_read: u64,
    pub first_timestamp: Option<OffsetDateTime>,
    pub last_timestamp: Option<OffsetDateTime>,
    pub started_at: Option<OffsetDateTime>,
    pub finished_at: Option<OffsetDateTime>,
}

impl ReplayStats {
    /// Events replayed per wall-clock second of the run so far.
    pub fn events_per_sec(&self) -> f64 {
        let Some(started) = self.started_at else { return 0.0 };
        let end = self.finished_at.unwrap_or_else(OffsetDateTime::now_utc);
        let elapsed = (end - started).as_seconds_f64();
        if elapsed <= 0.0 {
            self.replayed as f64
        } else {
            self.replayed as f64 / elapsed
        }
    }
}

fn passes_filters(event: &MarketEvent, config: &ReplayConfig) -> bool {
    if let Some(symbols) = &config.symbols {
        if !symbols.iter().any(|s| s == &event.symbol) {
            return false;
        }
    }
    if let Some(kinds) = &config.event_types {
        if !kinds.contains(&event.kind()) {
            return false;
        }
    }
    if let Some(from) = config.from {
        if event.timestamp < from {
            return false;
        }
    }
    if let Some(to) = config.to {
        if event.timestamp > to {
            return false;
        }
    }
    true
}

/// `max(0, (ts_i - ts_{i-1}) / speedMultiplier)`, floored at no sleep below
/// 1 ms. `speedMultiplier == 0` means max speed (§4.K).
fn pacing_delay(prev: OffsetDateTime, next: OffsetDateTime, speed_multiplier: f64) -> Option<std::time::Duration> {
    if speed_multiplier <= 0.0 {
        return None;
    }
    let delta_ns = (next - prev).whole_nanoseconds().max(0) as u128;
    let scaled_ns = (delta_ns as f64 / speed_multiplier) as u128;
    if scaled_ns < 1_000_000 {
        None
    } else {
        Some(std::time::Duration::from_nanos(scaled_ns.min(u64::MAX as u128) as u64))
    }
}

/// Non-reentrant, pausable, cancellable player over one or more persisted
/// files (§4.K, §5). One instance is reused across `replay_async` calls;
/// the `running` flag refuses concurrent invocations.
pub struct ReplayPipeline {
    running: AtomicBool,
    paused: AtomicBool,
    resume_notify: Notify,
    cancelled: AtomicBool,
    stats: RwLock<ReplayStats>,
    events_emitted: AtomicU64,
}

impl Default for ReplayPipeline {
    fn default() -> Self {
        Self {
            running: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            cancelled: AtomicBool::new(false),
            stats: RwLock::new(ReplayStats::default()),
            events_emitted: AtomicU64::new(0),
        }
    }
}

impl ReplayPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.resume_notify.notify_waiters();
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.resume_notify.notify_waiters();
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats.read().clone()
    }

    async fn wait_while_paused(&self) {
        while self.paused.load(Ordering::SeqCst) && !self.cancelled.load(Ordering::SeqCst) {
            self.resume_notify.notified().await;
        }
    }

    /// Sleeps `delay`, but in increments so `cancel()` takes effect well
    /// before the full pacing delay elapses rather than only at the next
    /// event boundary's nominal check.
    async fn sleep_cancellable(&self, delay: std::time::Duration) {
        const STEP: std::time::Duration = std::time::Duration::from_millis(50);
        let mut remaining = delay;
        while remaining > std::time::Duration::ZERO {
            if self.cancelled.load(Ordering::SeqCst) {
                return;
            }
            let step = remaining.min(STEP);
            tokio::time::sleep(step).await;
            remaining -= step;
        }
    }

    /// `replayAsync(files, config, sink)` (§4.K). Refuses to run
    /// concurrently with itself (`Error::ReplayAlreadyRunning`); on return
    /// (including on cancellation) the sink is flushed if anything was
    /// published.
    pub async fn replay_async(
        &self,
        files: &[PathBuf],
        config: &ReplayConfig,
        mut sink: Option<&mut dyn EventSink>,
    ) -> Result<ReplayStats> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::ReplayAlreadyRunning);
        }
        self.cancelled.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        *self.stats.write() = ReplayStats {
            started_at: Some(OffsetDateTime::now_utc()),
            ..ReplayStats::default()
        };
        self.events_emitted.store(0, Ordering::SeqCst);

        let result = self.run(files, config, sink.as_deref_mut()).await;

        {
            let mut stats = self.stats.write();
            stats.finished_at = Some(OffsetDateTime::now_utc());
        }
        if let Some(sink) = sink {
            if self.events_emitted.load(Ordering::SeqCst) > 0 {
                sink.flush()?;
            }
        }
        self.running.store(false, Ordering::SeqCst);
        result?;
        Ok(self.stats())
    }

    async fn run(&self, files: &[PathBuf], config: &ReplayConfig, mut sink: Option<&mut dyn EventSink>) -> Result<()> {
        let mut prev_timestamp: Option<OffsetDateTime> = None;

        'files: for path in files {
            let records = match read_events(path) {
                Ok(records) => records,
                Err(e) => {
                    log::warn!("replay: failed to read {}: {e}", path.display());
                    self.stats.write().errored += 1;
                    continue;
                }
            };

            for record in records {
                if self.cancelled.load(Ordering::SeqCst) {
                    break 'files;
                }
                self.wait_while_paused().await;
                if self.cancelled.load(Ordering::SeqCst) {
                    break 'files;
                }

                {
                    let mut stats = self.stats.write();
                    stats.bytes_read += record.line_bytes;
                }

                if !passes_filters(&record.event, config) {
                    self.stats.write().skipped += 1;
                    continue;
                }

                if let Some(prev) = prev_timestamp {
                    if let Some(delay) = pacing_delay(prev, record.event.timestamp, config.speed_multiplier) {
                        self.sleep_cancellable(delay).await;
                        if self.cancelled.load(Ordering::SeqCst) {
                            break 'files;
                        }
                    }
                }
                prev_timestamp = Some(record.event.timestamp);

                if let Some(sink) = sink.as_deref_mut() {
                    if let Err(e) = sink.append(&record.event) {
                        log::warn!("replay: sink append failed: {e}");
                        self.stats.write().errored += 1;
                        continue;
                    }
                }

                let mut stats = self.stats.write();
                stats.replayed += 1;
                if stats.first_timestamp.is_none() {
                    stats.first_timestamp = Some(record.event.timestamp);
                }
                stats.last_timestamp = Some(record.event.timestamp);
                drop(stats);
                self.events_emitted.fetch_add(1, Ordering::SeqCst);

                if let Some(max_events) = config.max_events {
                    if self.events_emitted.load(Ordering::SeqCst) >= max_events {
                        break 'files;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::event::{MarketEventPayload, ProviderError};
    use std::sync::atomic::Ordering as O;
    use time::macros::datetime;

    fn write_jsonl(dir: &Path, name: &str, events: &[MarketEvent]) -> PathBuf {
        let path = dir.join(name);
        let lines: Vec<String> = events.iter().map(|e| serde_json::to_string(e).unwrap()).collect();
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    fn event_at(ts: OffsetDateTime, symbol: &str) -> MarketEvent {
        MarketEvent::new(
            ts,
            symbol,
            MarketEventPayload::Error(ProviderError {
                provider_id: "x".to_string(),
                message: "y".to_string(),
            }),
            None,
        )
    }

    use std::path::Path;

    #[tokio::test]
    async fn replays_events_at_max_speed_and_collects_stats() {
        let dir = tempfile::tempdir().unwrap();
        let events = vec![
            event_at(datetime!(2026-01-01 00:00:00 UTC), "AAPL"),
            event_at(datetime!(2026-01-01 00:00:01 UTC), "MSFT"),
        ];
        let path = write_jsonl(dir.path(), "a.jsonl", &events);

        let pipeline = ReplayPipeline::new();
        let config = ReplayConfig {
            speed_multiplier: 0.0,
            ..ReplayConfig::default()
        };
        let stats = pipeline.replay_async(&[path], &config, None).await.unwrap();
        assert_eq!(stats.replayed, 2);
        assert_eq!(stats.skipped, 0);
    }

    #[tokio::test]
    async fn symbol_filter_counts_non_matching_events_as_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let events = vec![
            event_at(datetime!(2026-01-01 00:00:00 UTC), "AAPL"),
            event_at(datetime!(2026-01-01 00:00:01 UTC), "MSFT"),
        ];
        let path = write_jsonl(dir.path(), "a.jsonl", &events);

        let pipeline = ReplayPipeline::new();
        let config = ReplayConfig {
            symbols: Some(vec!["AAPL".to_string()]),
            speed_multiplier: 0.0,
            ..ReplayConfig::default()
        };
        let stats = pipeline.replay_async(&[path], &config, None).await.unwrap();
        assert_eq!(stats.replayed, 1);
        assert_eq!(stats.skipped, 1);
    }

    #[tokio::test]
    async fn concurrent_replay_async_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let events = vec![event_at(datetime!(2026-01-01 00:00:00 UTC), "AAPL")];
        let path = write_jsonl(dir.path(), "a.jsonl", &events);

        let pipeline = Arc::new(ReplayPipeline::new());
        pipeline.running.store(true, O::SeqCst);
        let config = ReplayConfig::default();
        let err = pipeline.replay_async(&[path], &config, None).await.unwrap_err();
        assert!(matches!(err, Error::ReplayAlreadyRunning));
    }

    #[tokio::test]
    async fn cancel_stops_before_remaining_events_are_replayed() {
        let dir = tempfile::tempdir().unwrap();
        let events = vec![
            event_at(datetime!(2026-01-01 00:00:00 UTC), "AAPL"),
            event_at(datetime!(2026-01-01 00:05:00 UTC), "MSFT"),
            event_at(datetime!(2026-01-01 00:10:00 UTC), "GOOG"),
        ];
        let path = write_jsonl(dir.path(), "a.jsonl", &events);

        let pipeline = Arc::new(ReplayPipeline::new());
        let config = ReplayConfig {
            speed_multiplier: 1.0,
            ..ReplayConfig::default()
        };
        let runner = Arc::clone(&pipeline);
        let files = vec![path];
        let handle = tokio::spawn(async move { runner.replay_async(&files, &config, None).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        pipeline.cancel();
        let stats = handle.await.unwrap().unwrap();
        assert!(stats.replayed < 3);
    }
}
