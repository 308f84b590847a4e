//! The ordered set of registered providers.

use std::sync::{Arc, Weak};

use horizon_weave_core::logging::targets;
use slotmap::SlotMap;

use super::provider::{DynProvider, ProviderId};
use super::relay::{Relay, RelaySink};

/// One registered provider with its section title and notification relay.
///
/// The relay is attached when the entry is created and must be detached when
/// the entry leaves the registry.
pub(crate) struct RegistryEntry {
    provider: Arc<dyn DynProvider>,
    title: Option<String>,
    relay: Relay,
}

impl RegistryEntry {
    pub(crate) fn new(
        provider: Arc<dyn DynProvider>,
        title: Option<String>,
        sink: Weak<dyn RelaySink>,
    ) -> Self {
        let relay = Relay::attach(provider.as_ref(), sink);
        Self {
            provider,
            title,
            relay,
        }
    }

    pub(crate) fn provider(&self) -> &Arc<dyn DynProvider> {
        &self.provider
    }

    /// The section title, if one is set and not blank.
    pub(crate) fn title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
    }

    pub(crate) fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Tears down the relay subscription.
    pub(crate) fn detach(&self) {
        self.relay.detach(self.provider.as_ref());
    }
}

/// Registered providers in compose order.
///
/// Providers are keyed by [`ProviderId`]; identity of the underlying provider
/// instance is its allocation address, so one instance can only be
/// registered once at a time.
#[derive(Default)]
pub(crate) struct SourceRegistry {
    entries: SlotMap<ProviderId, RegistryEntry>,
    order: Vec<ProviderId>,
}

impl SourceRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a new entry at the next compose position.
    pub(crate) fn insert_with<F>(&mut self, make: F) -> ProviderId
    where
        F: FnOnce(ProviderId) -> RegistryEntry,
    {
        let id = self.entries.insert_with_key(make);
        self.order.push(id);

        if let Some(entry) = self.entries.get(id) {
            tracing::debug!(
                target: targets::REGISTRY,
                provider = ?id,
                type_name = entry.provider.type_name(),
                position = self.order.len() - 1,
                "provider registered"
            );
        }
        id
    }

    /// Removes an entry. The caller detaches its relay.
    pub(crate) fn remove(&mut self, id: ProviderId) -> Option<RegistryEntry> {
        let entry = self.entries.remove(id)?;
        self.order.retain(|&other| other != id);
        tracing::debug!(target: targets::REGISTRY, provider = ?id, "provider unregistered");
        Some(entry)
    }

    /// Removes every entry, returning them in compose order.
    pub(crate) fn drain(&mut self) -> Vec<RegistryEntry> {
        let drained: Vec<RegistryEntry> = self
            .order
            .drain(..)
            .filter_map(|id| self.entries.remove(id))
            .collect();
        self.entries.clear();
        tracing::debug!(target: targets::REGISTRY, count = drained.len(), "registry cleared");
        drained
    }

    pub(crate) fn get(&self, id: ProviderId) -> Option<&RegistryEntry> {
        self.entries.get(id)
    }

    pub(crate) fn contains(&self, id: ProviderId) -> bool {
        self.entries.contains_key(id)
    }

    pub(crate) fn provider(&self, id: ProviderId) -> Option<Arc<dyn DynProvider>> {
        self.entries.get(id).map(|entry| entry.provider.clone())
    }

    /// Finds the registration of a provider instance by allocation address.
    pub(crate) fn find_by_address(&self, address: usize) -> Option<ProviderId> {
        self.iter()
            .find(|(_, entry)| entry.provider.address() == address)
            .map(|(id, _)| id)
    }

    /// Ids in compose order.
    pub(crate) fn list(&self) -> Vec<ProviderId> {
        self.order.clone()
    }

    /// All providers in compose order.
    pub(crate) fn providers(&self) -> Vec<Arc<dyn DynProvider>> {
        self.iter().map(|(_, entry)| entry.provider.clone()).collect()
    }

    /// Iterates entries in compose order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (ProviderId, &RegistryEntry)> + '_ {
        self.order
            .iter()
            .filter_map(|&id| self.entries.get(id).map(|entry| (id, entry)))
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}
