//! The composite list presented to the host widget.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use horizon_weave_core::logging::{span_names, targets};
use horizon_weave_core::{PerfSpan, Signal};
use parking_lot::{Mutex, RwLock};

use super::diff::{ChangeOp, DiffEngine};
use super::dispatch::DispatchTable;
use super::flatten::Flattener;
use super::item::{FlatEntry, FlatSequence};
use super::provider::{provider_address, DynProvider, ErasedProvider, ListProvider, ProviderEvent, ProviderId};
use super::registry::{RegistryEntry, SourceRegistry};
use super::relay::{remap, RelaySink, RelayState, Remap};
use super::view::{PendingView, Payload, TitleView, ViewHolder, ViewType};
use crate::config::{CompositeConfig, RelayMode};
use crate::error::{ComposeError, Result};

/// Signals emitted by a [`CompositeList`].
pub struct CompositeSignals {
    /// Emitted once per change operation, in order. Applying the operations
    /// to the previously rendered rows yields the current rows.
    pub changed: Signal<ChangeOp>,

    /// Emitted after [`CompositeList::clear`].
    pub reset: Signal<()>,

    /// Emitted when a provider breaks its contract while the composite is
    /// following one of its events. There is no caller to return the error
    /// to, and the offending change is not applied.
    pub failed: Signal<ComposeError>,
}

impl Default for CompositeSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeSignals {
    /// Creates a new set of composite signals.
    pub fn new() -> Self {
        Self {
            changed: Signal::new(),
            reset: Signal::new(),
            failed: Signal::new(),
        }
    }
}

enum Outgoing {
    Op(ChangeOp),
    Reset,
    Failed(ComposeError),
}

struct CompositeState {
    registry: SourceRegistry,
    dispatch: DispatchTable,
    config: CompositeConfig,
}

struct CompositeInner {
    state: Mutex<CompositeState>,
    /// The rendered rows. Replaced whole, never edited in place.
    sequence: RwLock<Arc<FlatSequence>>,
    outbox: Mutex<VecDeque<Outgoing>>,
    draining: AtomicBool,
    signals: CompositeSignals,
}

/// Several providers presented as one list.
///
/// The composite owns the registry of providers and their relays. Providers
/// are flattened in registration order; every change reaches the host as
/// [`ChangeOp`]s on [`CompositeSignals::changed`], either remapped from a
/// provider's own events or computed by diffing a fresh flattening against
/// the rendered rows.
///
/// Cloning a `CompositeList` yields another handle to the same list.
///
/// No composite lock is held while provider code or signal slots run, with
/// one exception: providers are read (items, view types, comparisons) under
/// the composite lock, so those reads must not call back into the composite.
///
/// # Example
///
/// ```
/// use horizon_weave::compose::{ChangeOp, CompositeList, VecProvider, ViewType};
/// use std::sync::{Arc, Mutex};
///
/// let words = Arc::new(VecProvider::new(vec!["a", "b"], ViewType::new(1)));
/// let numbers = Arc::new(VecProvider::new(vec![10, 20, 30], ViewType::new(2)));
///
/// let list = CompositeList::new();
/// let words_id = list.register(words.clone()).unwrap();
/// let numbers_id = list.register(numbers.clone()).unwrap();
/// assert_eq!(list.len(), 5);
/// assert_eq!(list.resolve(ViewType::new(2)).unwrap(), numbers_id);
///
/// let ops = Arc::new(Mutex::new(Vec::new()));
/// let sink = ops.clone();
/// list.signals().changed.connect(move |op| sink.lock().unwrap().push(op.clone()));
///
/// numbers.insert(1, 15);
/// assert_eq!(*ops.lock().unwrap(), vec![ChangeOp::Insert { position: 3, count: 1 }]);
///
/// list.unregister(words_id).unwrap();
/// assert_eq!(list.len(), 4);
/// assert!(list.resolve(ViewType::new(1)).is_err());
/// ```
#[derive(Clone)]
pub struct CompositeList {
    inner: Arc<CompositeInner>,
}

impl Default for CompositeList {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeList {
    /// Creates an empty composite with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CompositeConfig::default())
    }

    /// Creates an empty composite.
    pub fn with_config(config: CompositeConfig) -> Self {
        let registry = SourceRegistry::new();
        let sequence = Flattener::new(&config).rebuild(&registry);

        Self {
            inner: Arc::new(CompositeInner {
                state: Mutex::new(CompositeState {
                    registry,
                    dispatch: DispatchTable::new(),
                    config,
                }),
                sequence: RwLock::new(Arc::new(sequence)),
                outbox: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                signals: CompositeSignals::new(),
            }),
        }
    }

    /// Returns the composite's signals.
    pub fn signals(&self) -> &CompositeSignals {
        &self.inner.signals
    }

    /// Returns a copy of the current configuration.
    pub fn config(&self) -> CompositeConfig {
        self.inner.state.lock().config.clone()
    }

    /// Replaces the configuration and refreshes.
    pub fn set_config(&self, config: CompositeConfig) -> Result<()> {
        self.inner.mutate(|inner, state| {
            state.config = config;
            inner.refresh_locked(state)
        })
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Appends `provider` to the composite and shows its items.
    ///
    /// Fails with [`ComposeError::AlreadyRegistered`] if this instance is
    /// already registered, and with a fatal error if its items use a view
    /// type owned by another provider or reserved by the composite. A failed
    /// registration leaves the composite unchanged.
    pub fn register<P: ListProvider>(&self, provider: Arc<P>) -> Result<ProviderId> {
        self.register_entry(provider, None)
    }

    /// Like [`register`](Self::register), with a section title shown before
    /// the provider's items.
    pub fn register_with_title<P: ListProvider>(
        &self,
        provider: Arc<P>,
        title: impl Into<String>,
    ) -> Result<ProviderId> {
        self.register_entry(provider, Some(title.into()))
    }

    fn register_entry<P: ListProvider>(&self, provider: Arc<P>, title: Option<String>) -> Result<ProviderId> {
        let weak = Arc::downgrade(&self.inner);
        let sink: Weak<dyn RelaySink> = weak;

        self.inner.mutate(move |inner, state| {
            if let Some(existing) = state.registry.find_by_address(provider_address(&provider)) {
                return Err(ComposeError::AlreadyRegistered(existing));
            }

            let id = state.registry.insert_with(|id| {
                let erased: Arc<dyn DynProvider> = Arc::new(ErasedProvider::new(id, provider));
                RegistryEntry::new(erased, title, sink)
            });

            if let Err(err) = inner.refresh_locked(state) {
                if let Some(entry) = state.registry.remove(id) {
                    entry.detach();
                }
                state.dispatch.purge(id);
                return Err(err);
            }
            Ok(id)
        })
    }

    /// Removes a provider and its rows.
    ///
    /// Its relay is detached before this returns, so later events from the
    /// provider are ignored.
    pub fn unregister(&self, id: ProviderId) -> Result<()> {
        self.inner.mutate(|inner, state| {
            let entry = state
                .registry
                .remove(id)
                .ok_or(ComposeError::UnknownProvider(id))?;
            entry.detach();
            state.dispatch.purge(id);
            inner.refresh_locked(state)
        })
    }

    /// Removes the registration of a provider instance.
    ///
    /// Returns `false` if the instance is not registered.
    pub fn unregister_provider<P: ListProvider>(&self, provider: &Arc<P>) -> Result<bool> {
        match self.provider_id(provider) {
            Some(id) => self.unregister(id).map(|()| true),
            None => Ok(false),
        }
    }

    /// Removes every provider, then emits [`CompositeSignals::reset`].
    pub fn clear(&self) {
        let outcome = self.inner.mutate(|inner, state| {
            for entry in state.registry.drain() {
                entry.detach();
            }
            state.dispatch.clear();
            inner.refresh_locked(state)?;
            inner.outbox.lock().push_back(Outgoing::Reset);
            Ok(())
        });

        // Nothing left to conflict with.
        if let Err(err) = outcome {
            tracing::error!(target: targets::COMPOSITE, %err, "refresh after clear failed");
        }
    }

    /// Registered providers in compose order.
    pub fn providers(&self) -> Vec<ProviderId> {
        self.inner.state.lock().registry.list()
    }

    /// Returns the registration of a provider instance.
    pub fn provider_id<P: ListProvider>(&self, provider: &Arc<P>) -> Option<ProviderId> {
        self.inner
            .state
            .lock()
            .registry
            .find_by_address(provider_address(provider))
    }

    /// Returns `true` if `id` is registered.
    pub fn contains(&self, id: ProviderId) -> bool {
        self.inner.state.lock().registry.contains(id)
    }

    /// Returns the state of a registration's relay.
    pub fn relay_state(&self, id: ProviderId) -> Option<RelayState> {
        self.inner
            .state
            .lock()
            .registry
            .get(id)
            .map(|entry| entry.relay().state())
    }

    /// View types observed for a provider so far.
    pub fn view_types_of(&self, id: ProviderId) -> Vec<ViewType> {
        self.inner.state.lock().dispatch.view_types_of(id)
    }

    // -------------------------------------------------------------------------
    // Rows
    // -------------------------------------------------------------------------

    /// Rebuilds the rows from every provider and forwards the difference.
    pub fn refresh(&self) -> Result<()> {
        self.inner.mutate(|inner, state| inner.refresh_locked(state))
    }

    /// Shows or hides the trailing pending row.
    pub fn set_pending(&self, pending: bool) -> Result<()> {
        self.inner.mutate(|inner, state| {
            if state.config.pending == pending {
                return Ok(());
            }
            state.config.pending = pending;
            inner.refresh_locked(state)
        })
    }

    /// Returns `true` while the pending row is shown.
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().config.pending
    }

    /// Sets whether titles of providers without items are hidden.
    pub fn set_hide_titles_when_empty(&self, hide: bool) -> Result<()> {
        self.inner.mutate(|inner, state| {
            if state.config.hide_titles_when_empty == hide {
                return Ok(());
            }
            state.config.hide_titles_when_empty = hide;
            inner.refresh_locked(state)
        })
    }

    /// The rows as currently rendered.
    pub fn snapshot(&self) -> Arc<FlatSequence> {
        self.inner.snapshot()
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.inner.sequence.read().len()
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.inner.sequence.read().is_empty()
    }

    /// Returns the row at `position`.
    pub fn item_at(&self, position: usize) -> Option<FlatEntry> {
        self.inner.sequence.read().get(position).cloned()
    }

    /// Returns the provider item at `position` as a `T`.
    ///
    /// Returns `None` for synthetic rows and for items of another type.
    pub fn item_for_position<T: Clone + 'static>(&self, position: usize) -> Option<T> {
        self.item_at(position)?.as_item()?.item::<T>().cloned()
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    /// Returns the view type of the row at `position`, recording its owner.
    pub fn item_view_type(&self, position: usize) -> Result<ViewType> {
        let entry = self.row(position)?;
        let Some(item) = entry.as_item() else {
            return Ok(entry.view_type());
        };

        let view_type = item.view_type();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        state
            .dispatch
            .record(view_type, item.provider_id(), &state.registry)?;
        Ok(view_type)
    }

    /// Returns the live provider that owns `view_type`.
    pub fn resolve(&self, view_type: ViewType) -> Result<ProviderId> {
        let state = self.inner.state.lock();
        state.dispatch.resolve(view_type, &state.registry)
    }

    /// Creates a host view for `view_type`.
    ///
    /// Title and pending rows are created by the composite; other view types
    /// go to their owning provider.
    pub fn create_view(&self, view_type: ViewType) -> Result<ViewHolder> {
        match view_type {
            ViewType::TITLE => Ok(ViewHolder::new(view_type, TitleView::default())),
            ViewType::PENDING => Ok(ViewHolder::new(view_type, PendingView::default())),
            _ => {
                let provider = self.owner_of(view_type)?;
                let mut holder = provider.create_view(view_type);
                holder.set_view_type(view_type);
                Ok(holder)
            }
        }
    }

    /// Binds the row at `position` to `holder`.
    ///
    /// `payloads` is empty for a full bind.
    pub fn bind_view(&self, holder: &mut ViewHolder, position: usize, payloads: &[Payload]) -> Result<()> {
        let entry = self.row(position)?;
        match &entry {
            FlatEntry::Item(item) => item.bind(holder, payloads),
            FlatEntry::Title(title) => {
                if let Some(view) = holder.view_mut::<TitleView>() {
                    view.bind(title);
                }
            }
            FlatEntry::Pending => {}
        }
        holder.set_position(Some(position));
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Host lifecycle
    // -------------------------------------------------------------------------

    /// The host attached to this composite.
    pub fn on_attached(&self) {
        let providers = self.inner.state.lock().registry.providers();
        for provider in providers {
            provider.on_attached();
        }
    }

    /// The host detached from this composite.
    pub fn on_detached(&self) {
        let providers = self.inner.state.lock().registry.providers();
        for provider in providers {
            provider.on_detached();
        }
    }

    /// The host switched stable-id mode.
    pub fn set_has_stable_ids(&self, has_stable_ids: bool) {
        let providers = self.inner.state.lock().registry.providers();
        for provider in providers {
            provider.set_has_stable_ids(has_stable_ids);
        }
    }

    /// The host is recycling `holder`.
    pub fn on_view_recycled(&self, holder: &mut ViewHolder) {
        if !holder.view_type().is_reserved() {
            if let Some(provider) = self.live_owner(holder.view_type()) {
                provider.on_view_recycled(holder);
            }
        }
        holder.set_position(None);
    }

    /// `holder` became visible.
    pub fn on_view_attached_to_window(&self, holder: &mut ViewHolder) {
        match holder.view_type() {
            ViewType::PENDING => {
                if let Some(view) = holder.view_mut::<PendingView>() {
                    view.set_animating(true);
                }
            }
            ViewType::TITLE => {}
            view_type => {
                if let Some(provider) = self.live_owner(view_type) {
                    provider.on_view_attached_to_window(holder);
                }
            }
        }
    }

    /// `holder` left the window.
    pub fn on_view_detached_from_window(&self, holder: &mut ViewHolder) {
        match holder.view_type() {
            ViewType::PENDING => {
                if let Some(view) = holder.view_mut::<PendingView>() {
                    view.set_animating(false);
                }
            }
            ViewType::TITLE => {}
            view_type => {
                if let Some(provider) = self.live_owner(view_type) {
                    provider.on_view_detached_from_window(holder);
                }
            }
        }
    }

    /// The host failed to recycle `holder`. Returns `true` to allow reuse.
    pub fn on_failed_to_recycle_view(&self, holder: &mut ViewHolder) -> bool {
        if holder.view_type().is_reserved() {
            return false;
        }
        self.live_owner(holder.view_type())
            .is_some_and(|provider| provider.on_failed_to_recycle_view(holder))
    }

    /// The user dragged the row at `from` onto the row at `to`.
    ///
    /// Only moves between two items of the same provider are offered to that
    /// provider. Returns `true` if the provider reordered its items.
    pub fn item_moved(&self, from: usize, to: usize) -> bool {
        let sequence = self.snapshot();
        let (Some(source), Some(target)) = (
            sequence.get(from).and_then(FlatEntry::as_item),
            sequence.get(to).and_then(FlatEntry::as_item),
        ) else {
            return false;
        };

        if source.provider_id() != target.provider_id() {
            tracing::trace!(target: targets::COMPOSITE, from, to, "move across providers ignored");
            return false;
        }
        source.on_item_move(target)
    }

    fn row(&self, position: usize) -> Result<FlatEntry> {
        let sequence = self.inner.sequence.read();
        sequence
            .get(position)
            .cloned()
            .ok_or_else(|| ComposeError::out_of_range(position, sequence.len()))
    }

    fn owner_of(&self, view_type: ViewType) -> Result<Arc<dyn DynProvider>> {
        let state = self.inner.state.lock();
        let id = state.dispatch.resolve(view_type, &state.registry)?;
        state
            .registry
            .provider(id)
            .ok_or(ComposeError::UnknownProvider(id))
    }

    fn live_owner(&self, view_type: ViewType) -> Option<Arc<dyn DynProvider>> {
        match self.owner_of(view_type) {
            Ok(provider) => Some(provider),
            Err(err) => {
                tracing::trace!(target: targets::DISPATCH, %err, "lifecycle call not forwarded");
                None
            }
        }
    }
}

impl CompositeInner {
    fn snapshot(&self) -> Arc<FlatSequence> {
        self.sequence.read().clone()
    }

    /// Runs `f` under the state lock, then delivers whatever it queued.
    fn mutate<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Self, &mut CompositeState) -> Result<R>,
    {
        let result = {
            let mut state = self.state.lock();
            f(self, &mut state)
        };
        self.flush();
        result
    }

    /// Rebuilds, diffs against the rendered rows, and publishes.
    ///
    /// On error nothing is published.
    fn refresh_locked(&self, state: &mut CompositeState) -> Result<()> {
        let sequence = Flattener::new(&state.config).rebuild(&state.registry);
        state.dispatch.record_entries(&sequence, &state.registry)?;

        let current = self.snapshot();
        let ops = DiffEngine::new()
            .with_detect_moves(state.config.detect_moves)
            .diff(current.as_slice(), sequence.as_slice());
        tracing::debug!(
            target: targets::COMPOSITE,
            rows = sequence.len(),
            ops = ops.len(),
            "composite refreshed"
        );
        self.publish(sequence, ops);
        Ok(())
    }

    /// Swaps in `sequence` and queues `ops`. Called with the state lock held,
    /// so queued operations follow the order of the swaps.
    fn publish(&self, sequence: FlatSequence, ops: Vec<ChangeOp>) {
        *self.sequence.write() = Arc::new(sequence);
        self.outbox
            .lock()
            .extend(ops.into_iter().map(Outgoing::Op));
    }

    /// Emits queued notifications in order.
    ///
    /// A slot that causes further changes only queues them; the outermost
    /// flush delivers them after the current notification.
    fn flush(&self) {
        loop {
            if self.draining.swap(true, Ordering::AcqRel) {
                return;
            }
            loop {
                let next = self.outbox.lock().pop_front();
                match next {
                    Some(Outgoing::Op(op)) => self.signals.changed.emit(op),
                    Some(Outgoing::Reset) => self.signals.reset.emit(()),
                    Some(Outgoing::Failed(err)) => self.signals.failed.emit(err),
                    None => break,
                }
            }
            self.draining.store(false, Ordering::Release);
            if self.outbox.lock().is_empty() {
                return;
            }
        }
    }

    fn handle_event(&self, id: ProviderId, event: &ProviderEvent) -> Result<()> {
        let _span = PerfSpan::new(span_names::RELAY);
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Some(entry) = state.registry.get(id) else {
            tracing::trace!(target: targets::RELAY, provider = ?id, "event from unregistered provider ignored");
            return Ok(());
        };
        if entry.relay().state() == RelayState::Detached {
            return Ok(());
        }

        if state.config.relay_mode == RelayMode::FullDiff {
            return self.refresh_locked(state);
        }

        let refresh_when_emptied = state.config.hide_titles_when_empty && entry.title().is_some();
        let provider = entry.provider().clone();
        let current = self.snapshot();
        match remap(&current, provider.as_ref(), event, refresh_when_emptied) {
            Remap::Forward {
                sequence,
                ops,
                touched,
            } => {
                let rows = sequence.as_slice().get(touched).unwrap_or_default();
                state.dispatch.record_entries(rows, &state.registry)?;
                self.publish(sequence, ops);
                Ok(())
            }
            Remap::Skip => Ok(()),
            Remap::Refresh => self.refresh_locked(state),
        }
    }
}

impl RelaySink for CompositeInner {
    fn relay(&self, provider: ProviderId, event: &ProviderEvent) {
        if let Err(err) = self.handle_event(provider, event) {
            tracing::error!(target: targets::RELAY, provider = ?provider, %err, "provider event rejected");
            self.outbox.lock().push_back(Outgoing::Failed(err));
        }
        self.flush();
    }
}

impl Drop for CompositeInner {
    fn drop(&mut self) {
        for entry in self.state.get_mut().registry.drain() {
            entry.detach();
        }
    }
}

static_assertions::assert_impl_all!(CompositeList: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::testing::numbers;
    use crate::compose::{apply_ops, ProviderSignals, VecProvider};

    fn capture(list: &CompositeList) -> Arc<Mutex<Vec<ChangeOp>>> {
        let ops = Arc::new(Mutex::new(Vec::new()));
        let sink = ops.clone();
        list.signals().changed.connect(move |op| sink.lock().push(op.clone()));
        ops
    }

    fn values(list: &CompositeList) -> Vec<Option<u32>> {
        (0..list.len())
            .map(|position| list.item_for_position::<u32>(position))
            .collect()
    }

    #[test]
    fn test_register_emits_inserts() {
        let list = CompositeList::new();
        let ops = capture(&list);

        list.register(numbers(&[1, 2], 1)).unwrap();
        list.register(numbers(&[3], 2)).unwrap();

        assert_eq!(values(&list), vec![Some(1), Some(2), Some(3)]);
        assert_eq!(
            *ops.lock(),
            vec![
                ChangeOp::Insert { position: 0, count: 2 },
                ChangeOp::Insert { position: 2, count: 1 },
            ]
        );
    }

    #[test]
    fn test_register_same_instance_twice() {
        let list = CompositeList::new();
        let a = numbers(&[1], 1);
        let id = list.register(a.clone()).unwrap();

        assert_eq!(
            list.register(a.clone()),
            Err(ComposeError::AlreadyRegistered(id))
        );
        assert_eq!(list.len(), 1);
        assert_eq!(a.signals().changed.connection_count(), 1);
    }

    #[test]
    fn test_failed_registration_leaves_no_trace() {
        let list = CompositeList::new();
        list.register(numbers(&[1], 7)).unwrap();

        let clash = numbers(&[2], 7);
        let err = list.register(clash.clone()).unwrap_err();
        assert!(matches!(err, ComposeError::ViewTypeConflict { .. }));
        assert_eq!(list.providers().len(), 1);
        assert_eq!(list.len(), 1);
        assert_eq!(clash.signals().changed.connection_count(), 0);

        let reserved = numbers(&[3], ViewType::PENDING.get());
        let err = list.register(reserved).unwrap_err();
        assert!(matches!(err, ComposeError::ProviderContract { .. }));
        assert_eq!(list.providers().len(), 1);
    }

    #[test]
    fn test_full_change_is_diffed() {
        let list = CompositeList::new();
        let a = numbers(&[1, 2, 3], 1);
        list.register(a.clone()).unwrap();
        let ops = capture(&list);

        a.set_items(vec![3, 1, 2, 4]);

        let mut replay = vec![Some(1), Some(2), Some(3)];
        apply_ops(&mut replay, &ops.lock(), |position| {
            list.item_for_position::<u32>(position)
        });
        assert_eq!(replay, values(&list));
        assert_eq!(values(&list), vec![Some(3), Some(1), Some(2), Some(4)]);
    }

    #[test]
    fn test_full_diff_mode() {
        let config = CompositeConfig::new().with_relay_mode(RelayMode::FullDiff);
        let list = CompositeList::with_config(config);
        let a = numbers(&[1, 2], 1);
        list.register(a.clone()).unwrap();
        let ops = capture(&list);

        a.insert(1, 5);
        assert_eq!(*ops.lock(), vec![ChangeOp::Insert { position: 1, count: 1 }]);
        assert_eq!(values(&list), vec![Some(1), Some(5), Some(2)]);
    }

    #[test]
    fn test_pending_row() {
        let list = CompositeList::new();
        list.register(numbers(&[1], 1)).unwrap();
        let ops = capture(&list);

        list.set_pending(true).unwrap();
        list.set_pending(true).unwrap();
        assert!(list.is_pending());
        assert_eq!(list.len(), 2);
        assert!(matches!(list.item_at(1), Some(FlatEntry::Pending)));
        assert_eq!(list.item_view_type(1), Ok(ViewType::PENDING));

        let mut holder = list.create_view(ViewType::PENDING).unwrap();
        list.on_view_attached_to_window(&mut holder);
        assert!(holder.view::<PendingView>().unwrap().is_animating());
        list.on_view_detached_from_window(&mut holder);
        assert!(!holder.view::<PendingView>().unwrap().is_animating());

        list.set_pending(false).unwrap();
        assert_eq!(
            *ops.lock(),
            vec![
                ChangeOp::Insert { position: 1, count: 1 },
                ChangeOp::Remove { position: 1, count: 1 },
            ]
        );
    }

    #[test]
    fn test_titles_follow_their_provider() {
        let config = CompositeConfig::new().with_hide_titles_when_empty(true);
        let list = CompositeList::with_config(config);
        let a = numbers(&[], 1);
        list.register_with_title(a.clone(), "Numbers").unwrap();
        assert!(list.is_empty());

        a.push(1);
        assert!(matches!(list.item_at(0), Some(FlatEntry::Title(ref t)) if t == "Numbers"));
        assert_eq!(list.len(), 2);

        let mut holder = list.create_view(list.item_view_type(0).unwrap()).unwrap();
        list.bind_view(&mut holder, 0, &[]).unwrap();
        assert_eq!(holder.view::<TitleView>().unwrap().title(), "Numbers");
        assert_eq!(holder.position(), Some(0));

        a.remove(0);
        assert!(list.is_empty());
    }

    #[test]
    fn test_slot_mutation_is_delivered_in_order() {
        let list = CompositeList::new();
        let a = numbers(&[1], 1);
        list.register(a.clone()).unwrap();

        let ops = capture(&list);
        let follower = a.clone();
        list.signals().changed.connect(move |op| {
            if matches!(op, ChangeOp::Insert { position: 1, .. }) {
                follower.push(3);
            }
        });

        a.push(2);
        assert_eq!(
            *ops.lock(),
            vec![
                ChangeOp::Insert { position: 1, count: 1 },
                ChangeOp::Insert { position: 2, count: 1 },
            ]
        );
        assert_eq!(values(&list), vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_conflict_from_event_is_reported() {
        let list = CompositeList::new();
        let a = Arc::new(
            VecProvider::new(vec![1u32], ViewType::new(1))
                .with_view_types(|value| ViewType::new(*value)),
        );
        let b = numbers(&[2], 2);
        list.register(a.clone()).unwrap();
        list.register(b).unwrap();

        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = failures.clone();
        list.signals().failed.connect(move |err| sink.lock().push(err.clone()));

        a.push(2);
        assert_eq!(failures.lock().len(), 1);
        assert!(failures.lock()[0].is_fatal());
        assert_eq!(values(&list), vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_drop_detaches_relays() {
        let a = numbers(&[1], 1);
        {
            let list = CompositeList::new();
            list.register(a.clone()).unwrap();
            assert_eq!(a.signals().changed.connection_count(), 1);
        }
        assert_eq!(a.signals().changed.connection_count(), 0);
        a.push(2);
    }

    /// A provider that logs every host callback it receives.
    struct Recording {
        items: Vec<u32>,
        view_type: ViewType,
        calls: Mutex<Vec<String>>,
        signals: ProviderSignals,
    }

    impl Recording {
        fn new(items: &[u32], view_type: u32) -> Arc<Self> {
            Arc::new(Self {
                items: items.to_vec(),
                view_type: ViewType::new(view_type),
                calls: Mutex::new(Vec::new()),
                signals: ProviderSignals::new(),
            })
        }

        fn log(&self, call: impl Into<String>) {
            self.calls.lock().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl ListProvider for Recording {
        type Item = u32;

        fn items(&self) -> Vec<u32> {
            self.items.clone()
        }

        fn view_type(&self, _item: &u32) -> ViewType {
            self.view_type
        }

        fn create_view(&self, view_type: ViewType) -> ViewHolder {
            self.log(format!("create {view_type}"));
            ViewHolder::new(view_type, 0u32)
        }

        fn bind(&self, holder: &mut ViewHolder, item: &u32, _payloads: &[Payload]) {
            if let Some(view) = holder.view_mut::<u32>() {
                *view = *item;
            }
        }

        fn same_item(&self, old: &u32, new: &u32) -> bool {
            old == new
        }

        fn same_content(&self, _old: &u32, _new: &u32) -> bool {
            true
        }

        fn signals(&self) -> &ProviderSignals {
            &self.signals
        }

        fn on_attached(&self) {
            self.log("attached");
        }

        fn on_detached(&self) {
            self.log("detached");
        }

        fn set_has_stable_ids(&self, has_stable_ids: bool) {
            self.log(format!("stable ids {has_stable_ids}"));
        }

        fn on_view_recycled(&self, _holder: &mut ViewHolder) {
            self.log("recycled");
        }

        fn on_view_attached_to_window(&self, _holder: &mut ViewHolder) {
            self.log("attached to window");
        }

        fn on_view_detached_from_window(&self, _holder: &mut ViewHolder) {
            self.log("detached from window");
        }

        fn on_failed_to_recycle_view(&self, _holder: &mut ViewHolder) -> bool {
            self.log("failed to recycle");
            true
        }

        fn on_item_move(&self, from: &u32, to: &u32) -> bool {
            self.log(format!("move {from} to {to}"));
            true
        }
    }

    #[test]
    fn test_full_change_from_provider_without_rows() {
        let list = CompositeList::new();
        list.register(numbers(&[7], 1)).unwrap();
        let a = numbers(&[], 2);
        list.register(a.clone()).unwrap();
        let ops = capture(&list);

        a.set_items(vec![1, 2]);
        assert_eq!(*ops.lock(), vec![ChangeOp::Insert { position: 1, count: 2 }]);
        assert_eq!(values(&list), vec![Some(7), Some(1), Some(2)]);

        a.clear();
        a.clear();
        assert_eq!(values(&list), vec![Some(7)]);
        assert_eq!(
            *ops.lock(),
            vec![
                ChangeOp::Insert { position: 1, count: 2 },
                ChangeOp::Remove { position: 1, count: 2 },
            ]
        );
    }

    #[test]
    fn test_lifecycle_is_forwarded_to_owners() {
        let list = CompositeList::new();
        let a = Recording::new(&[1, 2], 1);
        let b = Recording::new(&[3], 2);
        list.register(a.clone()).unwrap();
        list.register(b.clone()).unwrap();

        list.on_attached();
        list.set_has_stable_ids(true);

        let mut holder = list.create_view(ViewType::new(2)).unwrap();
        list.bind_view(&mut holder, 2, &[]).unwrap();
        assert_eq!(holder.view::<u32>(), Some(&3));
        assert_eq!(holder.position(), Some(2));

        list.on_view_attached_to_window(&mut holder);
        list.on_view_detached_from_window(&mut holder);
        assert!(list.on_failed_to_recycle_view(&mut holder));
        list.on_view_recycled(&mut holder);
        assert_eq!(holder.position(), None);
        list.on_detached();

        assert_eq!(a.calls(), vec!["attached", "stable ids true", "detached"]);
        assert_eq!(
            b.calls(),
            vec![
                "attached",
                "stable ids true",
                "create 2",
                "attached to window",
                "detached from window",
                "failed to recycle",
                "recycled",
                "detached",
            ]
        );
    }

    #[test]
    fn test_lifecycle_without_owner_is_dropped() {
        let list = CompositeList::new();
        let a = Recording::new(&[1], 1);
        let id = list.register(a.clone()).unwrap();

        let mut holder = list.create_view(ViewType::new(1)).unwrap();
        list.unregister(id).unwrap();

        list.on_view_attached_to_window(&mut holder);
        list.on_view_detached_from_window(&mut holder);
        list.on_view_recycled(&mut holder);
        assert!(!list.on_failed_to_recycle_view(&mut holder));

        let mut title = list.create_view(ViewType::TITLE).unwrap();
        assert!(!list.on_failed_to_recycle_view(&mut title));

        assert_eq!(a.calls(), vec!["create 1"]);
        assert_eq!(
            list.create_view(ViewType::new(1)).unwrap_err(),
            ComposeError::UnknownViewType(ViewType::new(1))
        );
    }

    #[test]
    fn test_item_moved_stays_within_one_provider() {
        let list = CompositeList::new();
        let a = Recording::new(&[1, 2], 1);
        let b = Recording::new(&[3], 2);
        list.register_with_title(a.clone(), "A").unwrap();
        list.register(b.clone()).unwrap();

        // Rows: title, 1, 2, 3.
        assert!(list.item_moved(1, 2));
        assert!(!list.item_moved(2, 3));
        assert!(!list.item_moved(0, 1));
        assert!(!list.item_moved(1, 9));

        assert_eq!(a.calls(), vec!["move 1 to 2"]);
        assert!(b.calls().is_empty());
    }

    #[test]
    fn test_item_moved_reorders_vec_provider() {
        let list = CompositeList::new();
        let a = Arc::new(VecProvider::new(vec![1u32, 2, 3], ViewType::new(1)).with_reordering(true));
        list.register(numbers(&[9], 2)).unwrap();
        list.register(a.clone()).unwrap();
        let ops = capture(&list);

        assert!(list.item_moved(1, 3));
        assert_eq!(a.to_vec(), vec![2, 3, 1]);
        assert_eq!(*ops.lock(), vec![ChangeOp::Move { from: 1, to: 3 }]);
        assert_eq!(values(&list), vec![Some(9), Some(2), Some(3), Some(1)]);
    }
}
