//! Provider Registry (§4.H) — capability-indexed store of provider
//! descriptors plus streaming-client factories, keyed by provider id.
//!
//! Entries are swapped wholesale on enable/disable (copy-on-write) so a
//! concurrent reader never observes a half-updated descriptor (§5: "Provider
//! Registry is a concurrent map; enable/disable is atomic via copy-on-write
//! entries").

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::model::{Capability, ProviderDescriptor};

/// Per-capability availability probe and disposal, the minimal interface
/// §9's redesign guidance asks for in place of a class hierarchy
/// ("a small capability trait/interface abstraction for providers that
/// exposes only `(id, priority, capabilities, isAvailable, dispose)`").
#[async_trait]
pub trait RegisteredProvider: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;
    async fn is_available(&self) -> bool;
    async fn dispose(&self);
}

/// A factory that builds a streaming client for one `Capability`.
pub type StreamingFactory = Arc<dyn Fn() -> Arc<dyn RegisteredProvider> + Send + Sync>;

/// Registry-owned enablement, seeded from `descriptor().is_enabled` at
/// registration but authoritative thereafter — `enable`/`disable` replace
/// this struct wholesale rather than mutate the provider's own descriptor.
#[derive(Clone)]
struct Entry {
    provider: Arc<dyn RegisteredProvider>,
    enabled: bool,
}

pub struct ProviderRegistry {
    entries: RwLock<HashMap<String, Entry>>,
    streaming_factories: RwLock<HashMap<Capability, StreamingFactory>>,
    default_streaming_kind: Option<Capability>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            streaming_factories: RwLock::new(HashMap::new()),
            default_streaming_kind: None,
        }
    }

    pub fn with_default_streaming_kind(mut self, kind: Capability) -> Self {
        self.default_streaming_kind = Some(kind);
        self
    }

    /// Idempotent per id; re-registering the same id warns and replaces.
    pub fn register(&self, provider: Arc<dyn RegisteredProvider>) {
        let id = provider.descriptor().id.clone();
        let enabled = provider.descriptor().is_enabled;
        let mut guard = self.entries.write();
        if guard.contains_key(&id) {
            log::warn!("provider {id} registered twice; replacing prior entry");
        }
        guard.insert(id, Entry { provider, enabled });
    }

    /// Replaces any existing factory for `kind`.
    pub fn register_streaming_factory(&self, kind: Capability, factory: StreamingFactory) {
        self.streaming_factories.write().insert(kind, factory);
    }

    pub fn create_streaming_client(&self, kind: Capability) -> Result<Arc<dyn RegisteredProvider>> {
        let guard = self.streaming_factories.read();
        if let Some(factory) = guard.get(&kind) {
            return Ok(factory());
        }
        if let Some(default_kind) = self.default_streaming_kind {
            if default_kind != kind {
                if let Some(factory) = guard.get(&default_kind) {
                    log::warn!("no streaming factory for {kind:?}; falling back to default {default_kind:?}");
                    return Ok(factory());
                }
            }
        }
        Err(Error::NoStreamingFactory(format!("{kind:?}")))
    }

    /// Enabled providers with `capability`, ordered by ascending priority.
    pub fn providers_with(&self, capability: Capability) -> Vec<Arc<dyn RegisteredProvider>> {
        let guard = self.entries.read();
        let mut matches: Vec<_> = guard
            .values()
            .filter(|entry| entry.enabled && entry.provider.descriptor().capabilities.has(capability))
            .map(|entry| Arc::clone(&entry.provider))
            .collect();
        matches.sort_by_key(|p| p.descriptor().priority);
        matches
    }

    /// Iterates `providers_with(capability)` in priority order, returning
    /// the first one whose `is_available` probe succeeds.
    pub async fn best_available(&self, capability: Capability) -> Option<Arc<dyn RegisteredProvider>> {
        for provider in self.providers_with(capability) {
            if provider.is_available().await {
                return Some(provider);
            }
        }
        None
    }

    /// Atomically swaps `id`'s entry to carry the new enabled flag.
    /// Disabling a streaming provider emits a monitoring-facing warning.
    pub fn set_enabled(&self, id: &str, enabled: bool) {
        let mut guard = self.entries.write();
        let Some(entry) = guard.get(id) else {
            return;
        };
        let is_streaming = entry.provider.descriptor().capabilities.has(Capability::Streaming);
        let replacement = Entry {
            provider: Arc::clone(&entry.provider),
            enabled,
        };
        guard.insert(id.to_string(), replacement);
        drop(guard);
        if !enabled && is_streaming {
            log::warn!("disabling streaming provider {id}: monitoring alert");
        }
    }

    pub fn is_enabled(&self, id: &str) -> Option<bool> {
        self.entries.read().get(id).map(|e| e.enabled)
    }

    pub async fn dispose(&self) {
        let providers: Vec<_> = self.entries.read().values().map(|e| Arc::clone(&e.provider)).collect();
        for provider in providers {
            provider.dispose().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Capabilities, RateLimitPolicy};

    struct Fake {
        descriptor: ProviderDescriptor,
        available: bool,
    }

    #[async_trait]
    impl RegisteredProvider for Fake {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.descriptor
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn dispose(&self) {}
    }

    fn provider(id: &str, priority: i32, available: bool) -> Arc<dyn RegisteredProvider> {
        let mut capabilities = Capabilities::default();
        capabilities.set.insert(Capability::Streaming);
        capabilities.set.insert(Capability::Trades);
        Arc::new(Fake {
            descriptor: ProviderDescriptor {
                id: id.to_string(),
                display_name: id.to_string(),
                priority,
                capabilities,
                is_enabled: true,
            },
            available,
        })
    }

    #[test]
    fn providers_with_orders_by_ascending_priority() {
        let registry = ProviderRegistry::new();
        registry.register(provider("b", 5, true));
        registry.register(provider("a", 1, true));
        let ids: Vec<_> = registry
            .providers_with(Capability::Trades)
            .iter()
            .map(|p| p.descriptor().id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn best_available_skips_unavailable_providers() {
        let registry = ProviderRegistry::new();
        registry.register(provider("primary", 0, false));
        registry.register(provider("secondary", 1, true));
        let best = registry.best_available(Capability::Trades).await.unwrap();
        assert_eq!(best.descriptor().id, "secondary");
    }

    #[test]
    fn disable_removes_provider_from_selection() {
        let registry = ProviderRegistry::new();
        registry.register(provider("a", 0, true));
        registry.set_enabled("a", false);
        assert!(registry.providers_with(Capability::Trades).is_empty());
        assert_eq!(registry.is_enabled("a"), Some(false));
    }

    #[test]
    fn create_streaming_client_falls_back_to_default_kind() {
        let registry = ProviderRegistry::new().with_default_streaming_kind(Capability::Trades);
        registry.register_streaming_factory(Capability::Trades, Arc::new(|| provider("default", 0, true)));
        let client = registry.create_streaming_client(Capability::Depth).unwrap();
        assert_eq!(client.descriptor().id, "default");
    }

    #[test]
    fn create_streaming_client_errors_with_no_factory_and_no_default() {
        let registry = ProviderRegistry::new();
        assert!(registry.create_streaming_client(Capability::Depth).is_err());
    }
}
