//! A ready-made provider backed by a vector.

use std::sync::Arc;

use parking_lot::RwLock;

use super::provider::{ListProvider, ProviderSignals};
use super::view::{Payload, ViewHolder, ViewType};

/// Picks the view type for an item.
pub type ViewTypeFn<T> = Arc<dyn Fn(&T) -> ViewType + Send + Sync>;

/// Creates a host view for a view type.
pub type CreateViewFn = Arc<dyn Fn(ViewType) -> ViewHolder + Send + Sync>;

/// Binds an item to a host view.
pub type BindFn<T> = Arc<dyn Fn(&mut ViewHolder, &T, &[Payload]) + Send + Sync>;

/// Compares an old and a new item.
pub type CompareFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Computes a change payload between an old and a new item.
pub type PayloadFn<T> = Arc<dyn Fn(&T, &T) -> Option<Payload> + Send + Sync>;

/// A provider holding its items in a `Vec`.
///
/// Every mutator announces itself through [`ProviderSignals`] after the
/// change is visible, so a composite list following this provider updates
/// incrementally.
///
/// # Example
///
/// ```
/// use horizon_weave::compose::{CompositeList, VecProvider, ViewType};
/// use std::sync::Arc;
///
/// let words = Arc::new(VecProvider::new(
///     vec!["alpha".to_string(), "beta".to_string()],
///     ViewType::new(1),
/// ));
///
/// let list = CompositeList::new();
/// list.register(words.clone()).unwrap();
/// assert_eq!(list.len(), 2);
///
/// words.push("gamma".to_string());
/// assert_eq!(list.len(), 3);
/// ```
pub struct VecProvider<T> {
    items: RwLock<Vec<T>>,
    view_type: ViewTypeFn<T>,
    create_view: CreateViewFn,
    bind: Option<BindFn<T>>,
    same_item: CompareFn<T>,
    same_content: CompareFn<T>,
    payload: Option<PayloadFn<T>>,
    reorderable: bool,
    signals: ProviderSignals,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> VecProvider<T> {
    /// Creates a provider rendering every item with `view_type`.
    ///
    /// Items are the same item, with the same content, when they are equal.
    pub fn new(items: Vec<T>, view_type: ViewType) -> Self {
        Self::with_comparators(items, view_type, |a, b| a == b, |a, b| a == b)
    }
}

impl<T: Clone + Send + Sync + 'static> VecProvider<T> {
    /// Creates a provider with explicit identity and content comparisons.
    pub fn with_comparators<I, C>(items: Vec<T>, view_type: ViewType, same_item: I, same_content: C) -> Self
    where
        I: Fn(&T, &T) -> bool + Send + Sync + 'static,
        C: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            items: RwLock::new(items),
            view_type: Arc::new(move |_| view_type),
            create_view: Arc::new(|view_type| ViewHolder::new(view_type, ())),
            bind: None,
            same_item: Arc::new(same_item),
            same_content: Arc::new(same_content),
            payload: None,
            reorderable: false,
            signals: ProviderSignals::new(),
        }
    }

    /// Picks the view type per item.
    pub fn with_view_types<F>(mut self, view_type: F) -> Self
    where
        F: Fn(&T) -> ViewType + Send + Sync + 'static,
    {
        self.view_type = Arc::new(view_type);
        self
    }

    /// Sets how host views are created.
    pub fn with_create_view<F>(mut self, create_view: F) -> Self
    where
        F: Fn(ViewType) -> ViewHolder + Send + Sync + 'static,
    {
        self.create_view = Arc::new(create_view);
        self
    }

    /// Sets how items are bound to host views.
    pub fn with_bind<F>(mut self, bind: F) -> Self
    where
        F: Fn(&mut ViewHolder, &T, &[Payload]) + Send + Sync + 'static,
    {
        self.bind = Some(Arc::new(bind));
        self
    }

    /// Sets how change payloads are computed.
    pub fn with_payload<F>(mut self, payload: F) -> Self
    where
        F: Fn(&T, &T) -> Option<Payload> + Send + Sync + 'static,
    {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// Lets the host reorder items by dragging.
    pub fn with_reordering(mut self, reorderable: bool) -> Self {
        self.reorderable = reorderable;
        self
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns `true` if there are no items.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Returns a clone of the item at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.read().get(index).cloned()
    }

    /// Returns a clone of all items.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.read().clone()
    }

    /// Appends an item to the end.
    pub fn push(&self, item: T) {
        let row = {
            let mut items = self.items.write();
            items.push(item);
            items.len() - 1
        };
        self.signals.emit_inserted(row, 1);
    }

    /// Appends several items to the end.
    pub fn extend<I: IntoIterator<Item = T>>(&self, new_items: I) {
        let (start, count) = {
            let mut items = self.items.write();
            let start = items.len();
            items.extend(new_items);
            (start, items.len() - start)
        };
        if count > 0 {
            self.signals.emit_inserted(start, count);
        }
    }

    /// Inserts an item at `index`.
    ///
    /// Returns `false` and leaves the items untouched if `index > len()`.
    pub fn insert(&self, index: usize, item: T) -> bool {
        {
            let mut items = self.items.write();
            if index > items.len() {
                return false;
            }
            items.insert(index, item);
        }
        self.signals.emit_inserted(index, 1);
        true
    }

    /// Removes and returns the item at `index`.
    pub fn remove(&self, index: usize) -> Option<T> {
        let removed = {
            let mut items = self.items.write();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        self.signals.emit_removed(index, 1);
        Some(removed)
    }

    /// Moves the item at `from` so it ends up at `to`.
    pub fn move_item(&self, from: usize, to: usize) -> bool {
        {
            let mut items = self.items.write();
            if from >= items.len() || to >= items.len() {
                return false;
            }
            if from == to {
                return true;
            }
            let item = items.remove(from);
            items.insert(to, item);
        }
        self.signals.emit_moved(from, to, 1);
        true
    }

    /// Provides mutable access to an item via a closure.
    ///
    /// Emits a change without payload after modification.
    pub fn modify<F, R>(&self, index: usize, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        self.modify_with_payload(index, None, f)
    }

    /// Like [`modify`](Self::modify), announcing the change with `payload`.
    pub fn modify_with_payload<F, R>(&self, index: usize, payload: Option<Payload>, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let result = {
            let mut items = self.items.write();
            f(items.get_mut(index)?)
        };
        self.signals.emit_changed(index, 1, payload);
        Some(result)
    }

    /// Replaces all items.
    pub fn set_items(&self, items: Vec<T>) {
        *self.items.write() = items;
        self.signals.emit_full_change();
    }

    /// Removes all items.
    pub fn clear(&self) {
        self.items.write().clear();
        self.signals.emit_full_change();
    }

    fn position_of(&self, target: &T) -> Option<usize> {
        self.items
            .read()
            .iter()
            .position(|item| (self.same_item)(item, target))
    }
}

impl<T: Clone + Send + Sync + 'static> ListProvider for VecProvider<T> {
    type Item = T;

    fn items(&self) -> Vec<T> {
        self.to_vec()
    }

    fn view_type(&self, item: &T) -> ViewType {
        (self.view_type)(item)
    }

    fn create_view(&self, view_type: ViewType) -> ViewHolder {
        (self.create_view)(view_type)
    }

    fn bind(&self, holder: &mut ViewHolder, item: &T, payloads: &[Payload]) {
        if let Some(bind) = &self.bind {
            bind(holder, item, payloads);
        }
    }

    fn same_item(&self, old: &T, new: &T) -> bool {
        (self.same_item)(old, new)
    }

    fn same_content(&self, old: &T, new: &T) -> bool {
        (self.same_content)(old, new)
    }

    fn change_payload(&self, old: &T, new: &T) -> Option<Payload> {
        self.payload.as_ref().and_then(|payload| payload(old, new))
    }

    fn signals(&self) -> &ProviderSignals {
        &self.signals
    }

    fn on_item_move(&self, from: &T, to: &T) -> bool {
        if !self.reorderable {
            return false;
        }
        match (self.position_of(from), self.position_of(to)) {
            (Some(from), Some(to)) => self.move_item(from, to),
            _ => false,
        }
    }
}

static_assertions::assert_impl_all!(VecProvider<String>: Send, Sync);
