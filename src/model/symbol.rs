//! Canonical symbol validation (§3 Symbol).
//!
//! A symbol is trimmed and upper-cased for use as a set/map key, but the
//! *display* form passed through events is the caller's original string —
//! validation never silently rewrites it beyond that trim + case fold.

use crate::config::SymbolConfig;

/// Returns the canonical (trimmed, upper-cased) form of `raw` if it is a
/// valid symbol under `config`, or `None` if it violates §3's rules.
pub fn canonicalize(raw: &str, config: &SymbolConfig) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > config.max_len {
        return None;
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '/'))
    {
        return None;
    }
    Some(trimmed.to_ascii_uppercase())
}

pub fn is_valid(raw: &str, config: &SymbolConfig) -> bool {
    canonicalize(raw, config).is_some()
}
