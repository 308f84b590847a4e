//! Routing view types to the provider that owns them.
//!
//! The host creates and recycles views by view type only, so the composite
//! must know which provider a view type belongs to. Ownership is learned as
//! view types are observed during flattening and lookups, and a view type
//! never silently changes hands between two live providers.

use std::collections::HashMap;

use horizon_weave_core::logging::targets;

use super::item::FlatEntry;
use super::provider::ProviderId;
use super::registry::SourceRegistry;
use super::view::ViewType;
use crate::error::{ComposeError, Result};

/// Maps view types to their owning provider registration.
#[derive(Debug, Default)]
pub(crate) struct DispatchTable {
    owners: HashMap<ViewType, ProviderId>,
}

impl DispatchTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records that `provider` renders items with `view_type`.
    ///
    /// Fails if the view type is reserved, or owned by a different provider
    /// that is still registered. An owner that has been unregistered is
    /// replaced. Records for a provider that is not registered are ignored.
    pub(crate) fn record(
        &mut self,
        view_type: ViewType,
        provider: ProviderId,
        registry: &SourceRegistry,
    ) -> Result<()> {
        let Some(entry) = registry.get(provider) else {
            return Ok(());
        };

        if view_type.is_reserved() {
            let type_name = entry.provider().type_name();
            tracing::error!(
                target: targets::DISPATCH,
                %view_type,
                provider = type_name,
                "provider returned a reserved view type"
            );
            return Err(ComposeError::contract(
                type_name,
                format!("view type {view_type} is reserved for composite rows"),
            ));
        }

        match self.owners.get(&view_type) {
            Some(&existing) if existing == provider => Ok(()),
            Some(&existing) if registry.contains(existing) => {
                tracing::error!(
                    target: targets::DISPATCH,
                    %view_type,
                    ?existing,
                    requested = ?provider,
                    "view type conflict between providers"
                );
                Err(ComposeError::ViewTypeConflict {
                    view_type,
                    existing,
                    requested: provider,
                })
            }
            _ => {
                tracing::trace!(target: targets::DISPATCH, %view_type, ?provider, "view type recorded");
                self.owners.insert(view_type, provider);
                Ok(())
            }
        }
    }

    /// Records the view type of every provider item in `entries`.
    pub(crate) fn record_entries<'a, I>(&mut self, entries: I, registry: &SourceRegistry) -> Result<()>
    where
        I: IntoIterator<Item = &'a FlatEntry>,
    {
        for item in entries.into_iter().filter_map(FlatEntry::as_item) {
            self.record(item.view_type(), item.provider_id(), registry)?;
        }
        Ok(())
    }

    /// Returns the live provider owning `view_type`.
    pub(crate) fn resolve(&self, view_type: ViewType, registry: &SourceRegistry) -> Result<ProviderId> {
        self.owners
            .get(&view_type)
            .copied()
            .filter(|&owner| registry.contains(owner))
            .ok_or(ComposeError::UnknownViewType(view_type))
    }

    /// Forgets every view type owned by `provider`.
    pub(crate) fn purge(&mut self, provider: ProviderId) {
        self.owners.retain(|_, owner| *owner != provider);
    }

    pub(crate) fn clear(&mut self) {
        self.owners.clear();
    }

    /// View types currently attributed to `provider`, in ascending order.
    pub(crate) fn view_types_of(&self, provider: ProviderId) -> Vec<ViewType> {
        let mut view_types: Vec<ViewType> = self
            .owners
            .iter()
            .filter(|(_, owner)| **owner == provider)
            .map(|(view_type, _)| *view_type)
            .collect();
        view_types.sort_unstable();
        view_types
    }
}
