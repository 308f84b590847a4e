//! The provider contract and its type-erased form.
//!
//! A provider is any independently owned source of list items. It exposes
//! its current items, picks a view type per item, binds items to host views,
//! and decides item identity, content equality and change payloads for the
//! diff engine. Providers announce their own mutations through
//! [`ProviderSignals`] in local index space; the composite remaps them.
//!
//! The composite stores providers behind [`DynProvider`], and every flattened
//! item behind [`ItemEntry`], so providers with different item types can share
//! one list without the composite knowing their concrete types.

use std::any::Any;
use std::sync::Arc;

use horizon_weave_core::Signal;
use slotmap::new_key_type;

use super::view::{Payload, ViewHolder, ViewType};

new_key_type! {
    /// Identifies one registration of a provider.
    ///
    /// Unregistering and registering the same provider again yields a new id.
    pub struct ProviderId;
}

/// A raw mutation event, in the provider's own index space.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// Anything may have changed; the composite re-flattens and diffs.
    FullChange,
    /// `count` items were inserted starting at `start`.
    RangeInserted { start: usize, count: usize },
    /// `count` items starting at `start` were removed.
    RangeRemoved { start: usize, count: usize },
    /// The block of `count` items at `from` now starts at `to`.
    RangeMoved { from: usize, to: usize, count: usize },
    /// `count` items starting at `start` changed in place.
    RangeChanged {
        start: usize,
        count: usize,
        payload: Option<Payload>,
    },
}

/// Signals emitted by a provider after it mutates its items.
///
/// Providers must emit after the mutation is visible through
/// [`ListProvider::items`], never before.
pub struct ProviderSignals {
    /// Emitted once per local mutation.
    pub changed: Signal<ProviderEvent>,
}

impl Default for ProviderSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderSignals {
    /// Creates a new set of provider signals.
    pub fn new() -> Self {
        Self {
            changed: Signal::new(),
        }
    }

    /// Emits [`ProviderEvent::FullChange`].
    pub fn emit_full_change(&self) {
        self.changed.emit(ProviderEvent::FullChange);
    }

    /// Emits [`ProviderEvent::RangeInserted`].
    pub fn emit_inserted(&self, start: usize, count: usize) {
        self.changed
            .emit(ProviderEvent::RangeInserted { start, count });
    }

    /// Emits [`ProviderEvent::RangeRemoved`].
    pub fn emit_removed(&self, start: usize, count: usize) {
        self.changed.emit(ProviderEvent::RangeRemoved { start, count });
    }

    /// Emits [`ProviderEvent::RangeMoved`].
    pub fn emit_moved(&self, from: usize, to: usize, count: usize) {
        self.changed
            .emit(ProviderEvent::RangeMoved { from, to, count });
    }

    /// Emits [`ProviderEvent::RangeChanged`].
    pub fn emit_changed(&self, start: usize, count: usize, payload: Option<Payload>) {
        self.changed.emit(ProviderEvent::RangeChanged {
            start,
            count,
            payload,
        });
    }
}

/// The contract a source must implement to be composed into a list.
///
/// Registration is only possible for types implementing this trait, so a
/// provider lacking part of the contract is rejected at compile time.
///
/// # Example
///
/// ```ignore
/// use horizon_weave::compose::{ListProvider, ProviderSignals, ViewHolder, ViewType, Payload};
///
/// struct WordProvider {
///     words: parking_lot::RwLock<Vec<String>>,
///     signals: ProviderSignals,
/// }
///
/// impl ListProvider for WordProvider {
///     type Item = String;
///
///     fn items(&self) -> Vec<String> {
///         self.words.read().clone()
///     }
///
///     fn view_type(&self, _item: &String) -> ViewType {
///         ViewType::new(1)
///     }
///
///     fn create_view(&self, view_type: ViewType) -> ViewHolder {
///         ViewHolder::new(view_type, String::new())
///     }
///
///     fn bind(&self, holder: &mut ViewHolder, item: &String, _payloads: &[Payload]) {
///         if let Some(text) = holder.view_mut::<String>() {
///             text.clone_from(item);
///         }
///     }
///
///     fn same_item(&self, old: &String, new: &String) -> bool {
///         old == new
///     }
///
///     fn same_content(&self, _old: &String, _new: &String) -> bool {
///         true
///     }
///
///     fn signals(&self) -> &ProviderSignals {
///         &self.signals
///     }
/// }
/// ```
pub trait ListProvider: Send + Sync + 'static {
    /// The item type this provider contributes.
    type Item: Clone + Send + Sync + 'static;

    /// Returns the current ordered items.
    fn items(&self) -> Vec<Self::Item>;

    /// Returns the row kind used to render `item`.
    ///
    /// Must not return [`ViewType::TITLE`] or [`ViewType::PENDING`].
    fn view_type(&self, item: &Self::Item) -> ViewType;

    /// Creates a host view for one of this provider's view types.
    fn create_view(&self, view_type: ViewType) -> ViewHolder;

    /// Binds `item` to `holder`. `payloads` is empty for a full bind.
    fn bind(&self, holder: &mut ViewHolder, item: &Self::Item, payloads: &[Payload]);

    /// Returns `true` if `old` and `new` represent the same logical item.
    fn same_item(&self, old: &Self::Item, new: &Self::Item) -> bool;

    /// Returns `true` if `old` and `new` render identically.
    ///
    /// Only called for pairs where [`same_item`](Self::same_item) holds.
    fn same_content(&self, old: &Self::Item, new: &Self::Item) -> bool;

    /// Describes what changed between two versions of the same item.
    ///
    /// Only called for pairs where [`same_item`](Self::same_item) holds.
    fn change_payload(&self, _old: &Self::Item, _new: &Self::Item) -> Option<Payload> {
        None
    }

    /// Returns the signals for this provider.
    fn signals(&self) -> &ProviderSignals;

    // -------------------------------------------------------------------------
    // Host lifecycle hooks with default implementations
    // -------------------------------------------------------------------------

    /// The composite was attached to a host widget.
    fn on_attached(&self) {}

    /// The composite was detached from its host widget.
    fn on_detached(&self) {}

    /// The host switched stable-id mode.
    fn set_has_stable_ids(&self, _has_stable_ids: bool) {}

    /// A holder of one of this provider's view types is being recycled.
    fn on_view_recycled(&self, _holder: &mut ViewHolder) {}

    /// A holder of one of this provider's view types became visible.
    fn on_view_attached_to_window(&self, _holder: &mut ViewHolder) {}

    /// A holder of one of this provider's view types left the window.
    fn on_view_detached_from_window(&self, _holder: &mut ViewHolder) {}

    /// The host could not recycle a holder. Return `true` to allow reuse.
    fn on_failed_to_recycle_view(&self, _holder: &mut ViewHolder) -> bool {
        false
    }

    /// The user dragged `from` onto the position of `to`.
    ///
    /// Both items belong to this provider. Return `true` if the provider
    /// reordered its items (it then emits its own move event).
    fn on_item_move(&self, _from: &Self::Item, _to: &Self::Item) -> bool {
        false
    }
}

/// One flattened item bound to the provider registration that produced it.
pub(crate) trait ItemEntry: Send + Sync {
    fn provider_id(&self) -> ProviderId;
    fn view_type(&self) -> ViewType;
    fn bind(&self, holder: &mut ViewHolder, payloads: &[Payload]);
    fn same_item(&self, new: &dyn ItemEntry) -> bool;
    fn same_content(&self, new: &dyn ItemEntry) -> bool;
    fn change_payload(&self, new: &dyn ItemEntry) -> Option<Payload>;
    fn on_item_move(&self, to: &dyn ItemEntry) -> bool;
    fn item(&self) -> &dyn Any;
    fn as_any(&self) -> &dyn Any;
}

struct Entry<P: ListProvider> {
    id: ProviderId,
    provider: Arc<P>,
    item: P::Item,
}

impl<P: ListProvider> Entry<P> {
    /// Resolves `other` to an entry of the same registration.
    ///
    /// Equal ids imply the same `P`, so the downcast only fails for entries of
    /// a different registration, which never match.
    fn sibling<'a>(&self, other: &'a dyn ItemEntry) -> Option<&'a Entry<P>> {
        if other.provider_id() != self.id {
            return None;
        }
        other.as_any().downcast_ref::<Entry<P>>()
    }
}

impl<P: ListProvider> ItemEntry for Entry<P> {
    fn provider_id(&self) -> ProviderId {
        self.id
    }

    fn view_type(&self) -> ViewType {
        self.provider.view_type(&self.item)
    }

    fn bind(&self, holder: &mut ViewHolder, payloads: &[Payload]) {
        self.provider.bind(holder, &self.item, payloads);
    }

    fn same_item(&self, new: &dyn ItemEntry) -> bool {
        self.sibling(new)
            .is_some_and(|new| self.provider.same_item(&self.item, &new.item))
    }

    fn same_content(&self, new: &dyn ItemEntry) -> bool {
        self.sibling(new)
            .is_some_and(|new| self.provider.same_content(&self.item, &new.item))
    }

    fn change_payload(&self, new: &dyn ItemEntry) -> Option<Payload> {
        let new = self.sibling(new)?;
        self.provider.change_payload(&self.item, &new.item)
    }

    fn on_item_move(&self, to: &dyn ItemEntry) -> bool {
        self.sibling(to)
            .is_some_and(|to| self.provider.on_item_move(&self.item, &to.item))
    }

    fn item(&self) -> &dyn Any {
        &self.item
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A registered provider with its concrete type erased.
pub(crate) trait DynProvider: Send + Sync {
    fn id(&self) -> ProviderId;
    /// Address of the provider allocation, used for identity checks.
    fn address(&self) -> usize;
    fn type_name(&self) -> &'static str;
    fn entries(&self) -> Vec<Arc<dyn ItemEntry>>;
    fn create_view(&self, view_type: ViewType) -> ViewHolder;
    fn signals(&self) -> &ProviderSignals;
    fn on_attached(&self);
    fn on_detached(&self);
    fn set_has_stable_ids(&self, has_stable_ids: bool);
    fn on_view_recycled(&self, holder: &mut ViewHolder);
    fn on_view_attached_to_window(&self, holder: &mut ViewHolder);
    fn on_view_detached_from_window(&self, holder: &mut ViewHolder);
    fn on_failed_to_recycle_view(&self, holder: &mut ViewHolder) -> bool;
}

pub(crate) struct ErasedProvider<P: ListProvider> {
    id: ProviderId,
    provider: Arc<P>,
}

impl<P: ListProvider> ErasedProvider<P> {
    pub(crate) fn new(id: ProviderId, provider: Arc<P>) -> Self {
        Self { id, provider }
    }
}

/// Identity of a provider allocation, independent of its registration.
pub(crate) fn provider_address<P: ListProvider>(provider: &Arc<P>) -> usize {
    Arc::as_ptr(provider) as *const () as usize
}

impl<P: ListProvider> DynProvider for ErasedProvider<P> {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn address(&self) -> usize {
        provider_address(&self.provider)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<P>()
    }

    fn entries(&self) -> Vec<Arc<dyn ItemEntry>> {
        self.provider
            .items()
            .into_iter()
            .map(|item| {
                Arc::new(Entry {
                    id: self.id,
                    provider: self.provider.clone(),
                    item,
                }) as Arc<dyn ItemEntry>
            })
            .collect()
    }

    fn create_view(&self, view_type: ViewType) -> ViewHolder {
        self.provider.create_view(view_type)
    }

    fn signals(&self) -> &ProviderSignals {
        self.provider.signals()
    }

    fn on_attached(&self) {
        self.provider.on_attached();
    }

    fn on_detached(&self) {
        self.provider.on_detached();
    }

    fn set_has_stable_ids(&self, has_stable_ids: bool) {
        self.provider.set_has_stable_ids(has_stable_ids);
    }

    fn on_view_recycled(&self, holder: &mut ViewHolder) {
        self.provider.on_view_recycled(holder);
    }

    fn on_view_attached_to_window(&self, holder: &mut ViewHolder) {
        self.provider.on_view_attached_to_window(holder);
    }

    fn on_view_detached_from_window(&self, holder: &mut ViewHolder) {
        self.provider.on_view_detached_from_window(holder);
    }

    fn on_failed_to_recycle_view(&self, holder: &mut ViewHolder) -> bool {
        self.provider.on_failed_to_recycle_view(holder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_provider_signals_emit_events() {
        let signals = ProviderSignals::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let recv = received.clone();
        signals.changed.connect(move |event| {
            recv.lock().push(event.clone());
        });

        signals.emit_inserted(1, 2);
        signals.emit_removed(0, 1);
        signals.emit_moved(0, 3, 1);
        signals.emit_changed(2, 1, None);
        signals.emit_full_change();

        let events = received.lock();
        assert_eq!(
            *events,
            vec![
                ProviderEvent::RangeInserted { start: 1, count: 2 },
                ProviderEvent::RangeRemoved { start: 0, count: 1 },
                ProviderEvent::RangeMoved {
                    from: 0,
                    to: 3,
                    count: 1
                },
                ProviderEvent::RangeChanged {
                    start: 2,
                    count: 1,
                    payload: None
                },
                ProviderEvent::FullChange,
            ]
        );
    }
}
