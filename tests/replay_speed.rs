use mdc::config::ReplayConfig;
use mdc::model::event::{MarketEvent, MarketEventPayload, ProviderError};
use mdc::replay::ReplayPipeline;
use time::macros::datetime;

fn write_jsonl(dir: &std::path::Path, name: &str, events: &[MarketEvent]) -> std::path::PathBuf {
    let path = dir.join(name);
    let lines: Vec<String> = events.iter().map(|e| serde_json::to_string(e).unwrap()).collect();
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

fn event(ts: time::OffsetDateTime, symbol: &str) -> MarketEvent {
    MarketEvent::new(
        ts,
        symbol,
        MarketEventPayload::Error(ProviderError {
            provider_id: "alpaca".to_string(),
            message: "x".to_string(),
        }),
        Some("alpaca".to_string()),
    )
}

#[tokio::test]
async fn s7_replay_applies_filters_and_reports_accurate_counts() {
    let dir = tempfile::tempdir().unwrap();
    let events = vec![
        event(datetime!(2026-01-01 00:00:00 UTC), "AAPL"),
        event(datetime!(2026-01-01 00:00:01 UTC), "MSFT"),
        event(datetime!(2026-01-01 00:00:02 UTC), "AAPL"),
    ];
    let path = write_jsonl(dir.path(), "day1.jsonl", &events);

    let pipeline = ReplayPipeline::new();
    let config = ReplayConfig {
        symbols: Some(vec!["AAPL".to_string()]),
        speed_multiplier: 0.0, // max speed
        ..ReplayConfig::default()
    };
    let stats = pipeline.replay_async(&[path], &config, None).await.unwrap();
    assert_eq!(stats.replayed, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.errored, 0);
    assert!(stats.bytes_read > 0);
}

#[tokio::test]
async fn max_events_cuts_the_run_short() {
    let dir = tempfile::tempdir().unwrap();
    let events = vec![
        event(datetime!(2026-01-01 00:00:00 UTC), "AAPL"),
        event(datetime!(2026-01-01 00:00:01 UTC), "AAPL"),
        event(datetime!(2026-01-01 00:00:02 UTC), "AAPL"),
    ];
    let path = write_jsonl(dir.path(), "day1.jsonl", &events);

    let pipeline = ReplayPipeline::new();
    let config = ReplayConfig {
        speed_multiplier: 0.0,
        max_events: Some(2),
        ..ReplayConfig::default()
    };
    let stats = pipeline.replay_async(&[path], &config, None).await.unwrap();
    assert_eq!(stats.replayed, 2);
}
