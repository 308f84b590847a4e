//! Flattened items and the rendered sequence.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use super::diff::DiffItem;
use super::provider::{ItemEntry, ProviderId};
use super::view::{Payload, ViewHolder, ViewType};

/// An item tagged with the provider registration that owns it.
///
/// Two wrapped items from different providers never match, whatever their
/// values.
#[derive(Clone)]
pub struct WrappedItem {
    entry: Arc<dyn ItemEntry>,
}

impl WrappedItem {
    pub(crate) fn new(entry: Arc<dyn ItemEntry>) -> Self {
        Self { entry }
    }

    /// The owning provider registration.
    pub fn provider_id(&self) -> ProviderId {
        self.entry.provider_id()
    }

    /// Asks the owning provider for this item's view type.
    pub fn view_type(&self) -> ViewType {
        self.entry.view_type()
    }

    /// Borrows the item as its concrete type.
    pub fn item<T: 'static>(&self) -> Option<&T> {
        self.entry.item().downcast_ref::<T>()
    }

    pub(crate) fn bind(&self, holder: &mut ViewHolder, payloads: &[Payload]) {
        self.entry.bind(holder, payloads);
    }

    pub(crate) fn on_item_move(&self, to: &WrappedItem) -> bool {
        self.entry.on_item_move(to.entry.as_ref())
    }
}

impl fmt::Debug for WrappedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedItem")
            .field("provider", &self.provider_id())
            .finish_non_exhaustive()
    }
}

/// One row of the flattened sequence.
#[derive(Debug, Clone)]
pub enum FlatEntry {
    /// An item contributed by a provider.
    Item(WrappedItem),
    /// A section title shown before a provider's items.
    Title(String),
    /// The trailing loading indicator.
    Pending,
}

impl FlatEntry {
    /// The owning provider, for provider items.
    pub fn provider_id(&self) -> Option<ProviderId> {
        match self {
            Self::Item(item) => Some(item.provider_id()),
            _ => None,
        }
    }

    /// Returns the wrapped provider item, if this row is one.
    pub fn as_item(&self) -> Option<&WrappedItem> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    /// The view type this row renders with.
    pub fn view_type(&self) -> ViewType {
        match self {
            Self::Item(item) => item.view_type(),
            Self::Title(_) => ViewType::TITLE,
            Self::Pending => ViewType::PENDING,
        }
    }
}

impl DiffItem for FlatEntry {
    fn same_item(&self, new: &Self) -> bool {
        match (self, new) {
            (Self::Item(old), Self::Item(new)) => old.entry.same_item(new.entry.as_ref()),
            (Self::Title(old), Self::Title(new)) => old == new,
            (Self::Pending, Self::Pending) => true,
            _ => false,
        }
    }

    fn same_content(&self, new: &Self) -> bool {
        match (self, new) {
            (Self::Item(old), Self::Item(new)) => old.entry.same_content(new.entry.as_ref()),
            (Self::Title(_), Self::Title(_)) | (Self::Pending, Self::Pending) => true,
            _ => false,
        }
    }

    fn change_payload(&self, new: &Self) -> Option<Payload> {
        match (self, new) {
            (Self::Item(old), Self::Item(new)) => old.entry.change_payload(new.entry.as_ref()),
            _ => None,
        }
    }
}

/// The ordered sequence rendered by the host widget.
///
/// The composite never mutates a published sequence; it builds a new one and
/// swaps it in whole.
#[derive(Debug, Clone, Default)]
pub struct FlatSequence {
    entries: Vec<FlatEntry>,
}

impl FlatSequence {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the row at `position`.
    pub fn get(&self, position: usize) -> Option<&FlatEntry> {
        self.entries.get(position)
    }

    /// Iterates the rows in order.
    pub fn iter(&self) -> std::slice::Iter<'_, FlatEntry> {
        self.entries.iter()
    }

    /// Returns all rows as a slice.
    pub fn as_slice(&self) -> &[FlatEntry] {
        &self.entries
    }

    /// Position of the first item owned by `provider`.
    ///
    /// Returns `None` when the provider contributes no items.
    pub fn offset_of(&self, provider: ProviderId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.provider_id() == Some(provider))
    }

    /// Number of consecutive items owned by `provider` starting at `offset`.
    pub fn segment_len(&self, provider: ProviderId, offset: usize) -> usize {
        self.entries
            .get(offset..)
            .map_or(0, |rest| {
                rest.iter()
                    .take_while(|entry| entry.provider_id() == Some(provider))
                    .count()
            })
    }

    pub(crate) fn push(&mut self, entry: FlatEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn insert_entries(&mut self, position: usize, entries: Vec<FlatEntry>) {
        self.entries.splice(position..position, entries);
    }

    pub(crate) fn remove_range(&mut self, range: Range<usize>) {
        self.entries.drain(range);
    }

    pub(crate) fn replace_range(&mut self, position: usize, entries: Vec<FlatEntry>) {
        let end = position + entries.len();
        self.entries.splice(position..end, entries);
    }
}

impl FromIterator<FlatEntry> for FlatSequence {
    fn from_iter<I: IntoIterator<Item = FlatEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FlatSequence {
    type Item = &'a FlatEntry;
    type IntoIter = std::slice::Iter<'a, FlatEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
