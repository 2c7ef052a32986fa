//! Storage Policy & Sinks (§4.J): a contract-only module. The core consumes
//! a path-derivation policy and opaque sinks; it never owns file I/O for
//! persisted events itself (the WAL is a separate, core-owned concern —
//! see [`crate::wal`]). `PathPolicy` is the one concrete implementation we
//! ship, built from the conventions enumerated in §6; external
//! collaborators may supply their own.

use std::path::PathBuf;

use time::OffsetDateTime;

use crate::model::event::{MarketEvent, MarketEventKind};

/// How a path groups events together before date partitioning is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathConvention {
    Flat,
    BySymbol,
    ByDate,
    ByType,
    BySource,
    ByAssetClass,
    Hierarchical,
    Canonical,
}

/// Sub-day grouping applied within whatever directory `PathConvention`
/// produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePartition {
    None,
    Daily,
    Hourly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
    Lz4,
    Brotli,
}

impl Compression {
    fn extension(self) -> &'static str {
        match self {
            Compression::None => ".jsonl",
            Compression::Gzip => ".jsonl.gz",
            Compression::Zstd => ".jsonl.zst",
            Compression::Lz4 => ".jsonl.lz4",
            Compression::Brotli => ".jsonl.br",
        }
    }

    fn from_extension(name: &str) -> Option<(&str, Self)> {
        for (suffix, compression) in [
            (".jsonl.gz", Compression::Gzip),
            (".jsonl.zst", Compression::Zstd),
            (".jsonl.lz4", Compression::Lz4),
            (".jsonl.br", Compression::Brotli),
            (".jsonl", Compression::None),
        ] {
            if let Some(stem) = name.strip_suffix(suffix) {
                return Some((stem, compression));
            }
        }
        None
    }
}

/// The fields `tryParsePath` can recover from a path produced by `getPath`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub symbol: Option<String>,
    pub event_type: Option<MarketEventKind>,
    pub source: Option<String>,
    pub date: Option<time::Date>,
}

fn kind_token(kind: MarketEventKind) -> &'static str {
    match kind {
        MarketEventKind::Trade => "Trade",
        MarketEventKind::OrderFlow => "OrderFlow",
        MarketEventKind::Bbo => "Bbo",
        MarketEventKind::L2Snapshot => "L2Snapshot",
        MarketEventKind::DepthIntegrity => "DepthIntegrity",
        MarketEventKind::ResyncRequested => "ResyncRequested",
        MarketEventKind::Integrity => "Integrity",
        MarketEventKind::OptionQuote => "OptionQuote",
        MarketEventKind::OptionTrade => "OptionTrade",
        MarketEventKind::OptionGreeks => "OptionGreeks",
        MarketEventKind::OptionChain => "OptionChain",
        MarketEventKind::OpenInterest => "OpenInterest",
        MarketEventKind::Heartbeat => "Heartbeat",
        MarketEventKind::Error => "Error",
    }
}

fn kind_from_token(token: &str) -> Option<MarketEventKind> {
    [
        MarketEventKind::Trade,
        MarketEventKind::OrderFlow,
        MarketEventKind::Bbo,
        MarketEventKind::L2Snapshot,
        MarketEventKind::DepthIntegrity,
        MarketEventKind::ResyncRequested,
        MarketEventKind::Integrity,
        MarketEventKind::OptionQuote,
        MarketEventKind::OptionTrade,
        MarketEventKind::OptionGreeks,
        MarketEventKind::OptionChain,
        MarketEventKind::OpenInterest,
        MarketEventKind::Heartbeat,
        MarketEventKind::Error,
    ]
    .into_iter()
    .find(|k| kind_token(*k) == token)
}

fn date_dir(ts: OffsetDateTime, partition: DatePartition) -> Option<String> {
    let ts = ts.to_offset(time::UtcOffset::UTC);
    match partition {
        DatePartition::None => None,
        DatePartition::Daily => Some(format!("{:04}-{:02}-{:02}", ts.year(), u8::from(ts.month()), ts.day())),
        DatePartition::Hourly => Some(format!(
            "{:04}-{:02}-{:02}/{:02}",
            ts.year(),
            u8::from(ts.month()),
            ts.day(),
            ts.hour()
        )),
        DatePartition::Monthly => Some(format!("{:04}-{:02}", ts.year(), u8::from(ts.month()))),
    }
}

/// A path-derivation policy implementing the §6 convention × partition
/// matrix. `getPath`/`tryParsePath` are inverses of one another for every
/// convention this type supports.
#[derive(Debug, Clone, Copy)]
pub struct PathPolicy {
    pub convention: PathConvention,
    pub partition: DatePartition,
    pub compression: Compression,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self {
            convention: PathConvention::Canonical,
            partition: DatePartition::Daily,
            compression: Compression::Gzip,
        }
    }
}

impl PathPolicy {
    /// `getPath(event) → relativePath` (§4.J, §6).
    pub fn get_path(&self, event: &MarketEvent) -> PathBuf {
        let kind = kind_token(event.kind());
        let source = event.source.as_deref().unwrap_or("unknown");
        let asset_class = if kind.starts_with("Option") { "options" } else { "equity" };

        let mut dir = match self.convention {
            PathConvention::Flat => PathBuf::new(),
            PathConvention::BySymbol => PathBuf::from(&event.symbol),
            PathConvention::ByDate => PathBuf::new(),
            PathConvention::ByType => PathBuf::from(kind),
            PathConvention::BySource => PathBuf::from(source),
            PathConvention::ByAssetClass => PathBuf::from(asset_class),
            PathConvention::Hierarchical => PathBuf::from(source).join(&event.symbol).join(kind),
            PathConvention::Canonical => PathBuf::from(asset_class).join(source).join(&event.symbol).join(kind),
        };
        if let Some(date) = date_dir(event.timestamp, self.partition) {
            dir = dir.join(date);
        }

        let file_name = format!("{}{}", event.symbol, self.compression.extension());
        dir.join(file_name)
    }

    /// `tryParsePath(path) → {symbol, eventType, source, date}?` (§6), the
    /// inverse of [`Self::get_path`] to the extent the convention
    /// preserves those fields in the path itself.
    pub fn try_parse_path(&self, path: &std::path::Path) -> Option<ParsedPath> {
        let file_name = path.file_name()?.to_str()?;
        let (stem, compression) = Compression::from_extension(file_name)?;
        if compression != self.compression {
            return None;
        }
        let components: Vec<&str> = path
            .parent()?
            .iter()
            .map(|c| c.to_str())
            .collect::<Option<_>>()?;

        let (symbol, event_type, source) = match self.convention {
            PathConvention::Flat | PathConvention::ByDate => (Some(stem.to_string()), None, None),
            PathConvention::BySymbol => (components.last().map(|s| s.to_string()), None, None),
            PathConvention::ByType => (
                Some(stem.to_string()),
                components.last().and_then(|t| kind_from_token(t)),
                None,
            ),
            PathConvention::BySource => (Some(stem.to_string()), None, components.last().map(|s| s.to_string())),
            PathConvention::ByAssetClass => (Some(stem.to_string()), None, None),
            PathConvention::Hierarchical | PathConvention::Canonical => {
                let event_type = components.last().and_then(|t| kind_from_token(t));
                let symbol = components.len().checked_sub(2).and_then(|i| components.get(i)).map(|s| s.to_string());
                let source = if matches!(self.convention, PathConvention::Canonical) {
                    components.len().checked_sub(3).and_then(|i| components.get(i)).map(|s| s.to_string())
                } else {
                    components.first().map(|s| s.to_string())
                };
                (symbol, event_type, source)
            }
        };

        let date = find_date_component(&components);
        Some(ParsedPath {
            symbol,
            event_type,
            source,
            date,
        })
    }
}

fn find_date_component(components: &[&str]) -> Option<time::Date> {
    for component in components {
        let mut parts = component.splitn(3, '-');
        let year: i32 = parts.next()?.parse().ok()?;
        let month: u8 = parts.next()?.parse().ok()?;
        if let Ok(date) = time::Date::from_calendar_date(year, time::Month::try_from(month).ok()?, 1) {
            return Some(date);
        }
    }
    None
}

/// Sink contract (§4.J): the core treats sinks as opaque durable writers.
pub trait EventSink: Send + Sync {
    fn append(&mut self, event: &MarketEvent) -> crate::error::Result<()>;
    fn flush(&mut self) -> crate::error::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::event::{MarketEventPayload, ProviderError};
    use time::macros::datetime;

    fn sample_event() -> MarketEvent {
        MarketEvent::new(
            datetime!(2026-03-15 12:00:00 UTC),
            "AAPL",
            MarketEventPayload::Error(ProviderError {
                provider_id: "alpaca".to_string(),
                message: "boom".to_string(),
            }),
            Some("alpaca".to_string()),
        )
    }

    #[test]
    fn canonical_path_groups_by_asset_class_source_symbol_type_and_date() {
        let policy = PathPolicy::default();
        let path = policy.get_path(&sample_event());
        assert_eq!(path, PathBuf::from("equity/alpaca/AAPL/Error/2026-03-15/AAPL.jsonl.gz"));
    }

    #[test]
    fn by_symbol_round_trips_through_try_parse_path() {
        let policy = PathPolicy {
            convention: PathConvention::BySymbol,
            partition: DatePartition::None,
            compression: Compression::None,
        };
        let event = sample_event();
        let path = policy.get_path(&event);
        let parsed = policy.try_parse_path(&path).unwrap();
        assert_eq!(parsed.symbol.as_deref(), Some("AAPL"));
    }

    #[test]
    fn by_type_round_trips_event_kind() {
        let policy = PathPolicy {
            convention: PathConvention::ByType,
            partition: DatePartition::None,
            compression: Compression::None,
        };
        let event = sample_event();
        let path = policy.get_path(&event);
        let parsed = policy.try_parse_path(&path).unwrap();
        assert_eq!(parsed.event_type, Some(MarketEventKind::Error));
    }

    #[test]
    fn extension_matches_configured_compression() {
        for (compression, ext) in [
            (Compression::None, ".jsonl"),
            (Compression::Gzip, ".jsonl.gz"),
            (Compression::Zstd, ".jsonl.zst"),
            (Compression::Lz4, ".jsonl.lz4"),
            (Compression::Brotli, ".jsonl.br"),
        ] {
            let policy = PathPolicy {
                convention: PathConvention::Flat,
                partition: DatePartition::None,
                compression,
            };
            let path = policy.get_path(&sample_event());
            assert!(path.to_string_lossy().ends_with(ext));
        }
    }
}
