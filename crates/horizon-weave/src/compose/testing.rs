//! Shared fixtures for unit tests.

use std::sync::{Arc, Weak};

use super::provider::{ProviderEvent, ProviderId};
use super::relay::RelaySink;
use super::view::ViewType;
use super::VecProvider;

struct NullSink;

impl RelaySink for NullSink {
    fn relay(&self, _provider: ProviderId, _event: &ProviderEvent) {}
}

/// A sink that no relay can reach.
pub(crate) fn detached_sink() -> Weak<dyn RelaySink> {
    Weak::<NullSink>::new()
}

/// A provider of numbers rendered with one view type.
pub(crate) fn numbers(values: &[u32], view_type: u32) -> Arc<VecProvider<u32>> {
    Arc::new(VecProvider::new(values.to_vec(), ViewType::new(view_type)))
}
