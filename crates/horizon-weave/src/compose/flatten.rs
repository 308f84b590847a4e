//! Building the flattened sequence from the registry.

use horizon_weave_core::logging::{span_names, targets};
use horizon_weave_core::PerfSpan;

use super::item::{FlatEntry, FlatSequence, WrappedItem};
use super::registry::SourceRegistry;
use crate::config::CompositeConfig;

/// Concatenates provider items in compose order, with synthetic rows.
///
/// A provider's section title precedes its items. The pending row, when
/// enabled, comes last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Flattener {
    hide_titles_when_empty: bool,
    pending: bool,
}

impl Flattener {
    pub(crate) fn new(config: &CompositeConfig) -> Self {
        Self {
            hide_titles_when_empty: config.hide_titles_when_empty,
            pending: config.pending,
        }
    }

    /// Reads every provider's current items. Never mutates a provider.
    pub(crate) fn rebuild(&self, registry: &SourceRegistry) -> FlatSequence {
        let _span = PerfSpan::new(span_names::REBUILD);
        let mut sequence = FlatSequence::new();

        for (_, entry) in registry.iter() {
            let items = entry.provider().entries();

            if let Some(title) = entry.title() {
                if !(self.hide_titles_when_empty && items.is_empty()) {
                    sequence.push(FlatEntry::Title(title.to_owned()));
                }
            }

            for item in items {
                sequence.push(FlatEntry::Item(WrappedItem::new(item)));
            }
        }

        if self.pending {
            sequence.push(FlatEntry::Pending);
        }

        tracing::trace!(
            target: targets::COMPOSITE,
            providers = registry.len(),
            rows = sequence.len(),
            "flattened sequence rebuilt"
        );
        sequence
    }
}
