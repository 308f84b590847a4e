//! View types shared between the composite list and its host widget.
//!
//! The host widget owns the actual visual elements. The composite only needs
//! an opaque handle to pass to the provider that owns a row kind, so
//! [`ViewHolder`] carries the host's view object type-erased, next to the
//! [`ViewType`] it was created for.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An opaque identifier selecting which row kind renders an item.
///
/// Every provider picks its own view types. Two live providers must never
/// present the same value; [`ViewType::TITLE`] and [`ViewType::PENDING`] are
/// reserved for rows the composite owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewType(pub u32);

impl ViewType {
    /// Section title rows inserted before a provider's items.
    pub const TITLE: ViewType = ViewType(1000);

    /// The trailing loading-indicator row.
    pub const PENDING: ViewType = ViewType(1001);

    /// Creates a view type from a raw identifier.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns `true` for the identifiers providers may not use.
    pub const fn is_reserved(self) -> bool {
        self.0 == Self::TITLE.0 || self.0 == Self::PENDING.0
    }
}

impl From<u32> for ViewType {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-erased data describing what changed about an item.
///
/// Providers compute payloads for partial rebinds; the composite passes them
/// through untouched. Cloning is cheap and two payloads compare equal only if
/// they share the same allocation.
#[derive(Clone)]
pub struct Payload(Arc<dyn Any + Send + Sync>);

impl Payload {
    /// Wraps a value as a payload.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Attempts to borrow the payload as a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Returns `true` if the payload holds a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Payload(..)")
    }
}

/// A host-side view together with the row kind it renders.
pub struct ViewHolder {
    view_type: ViewType,
    position: Option<usize>,
    view: Box<dyn Any + Send>,
}

impl ViewHolder {
    /// Wraps a host view created for `view_type`.
    pub fn new<V: Any + Send>(view_type: ViewType, view: V) -> Self {
        Self {
            view_type,
            position: None,
            view: Box::new(view),
        }
    }

    /// The row kind this holder was created for.
    pub fn view_type(&self) -> ViewType {
        self.view_type
    }

    /// The flattened position this holder was last bound to.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Borrows the host view as a concrete type.
    pub fn view<V: Any>(&self) -> Option<&V> {
        self.view.downcast_ref::<V>()
    }

    /// Mutably borrows the host view as a concrete type.
    pub fn view_mut<V: Any>(&mut self) -> Option<&mut V> {
        self.view.downcast_mut::<V>()
    }

    pub(crate) fn set_view_type(&mut self, view_type: ViewType) {
        self.view_type = view_type;
    }

    pub(crate) fn set_position(&mut self, position: Option<usize>) {
        self.position = position;
    }
}

impl fmt::Debug for ViewHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewHolder")
            .field("view_type", &self.view_type)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// View state for a section title row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleView {
    title: String,
}

impl TitleView {
    /// The title text last bound to this view.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn bind(&mut self, title: &str) {
        self.title.clear();
        self.title.push_str(title);
    }
}

/// View state for the pending (loading) row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingView {
    animating: bool,
}

impl PendingView {
    /// Returns `true` while the indicator is attached to the window.
    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub(crate) fn set_animating(&mut self, animating: bool) {
        self.animating = animating;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_view_types() {
        assert!(ViewType::TITLE.is_reserved());
        assert!(ViewType::PENDING.is_reserved());
        assert!(!ViewType::new(1).is_reserved());
        assert_eq!(ViewType::from(7).get(), 7);
    }

    #[test]
    fn test_payload_identity_and_downcast() {
        let payload = Payload::new("color".to_string());
        let same = payload.clone();
        let other = Payload::new("color".to_string());

        assert_eq!(payload, same);
        assert_ne!(payload, other);
        assert!(payload.is::<String>());
        assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some("color"));
        assert!(payload.downcast_ref::<i32>().is_none());
    }

    #[test]
    fn test_view_holder_downcast() {
        let mut holder = ViewHolder::new(ViewType::TITLE, TitleView::default());
        assert_eq!(holder.view_type(), ViewType::TITLE);
        assert_eq!(holder.position(), None);

        holder.view_mut::<TitleView>().unwrap().bind("Words");
        assert_eq!(holder.view::<TitleView>().unwrap().title(), "Words");
        assert!(holder.view::<PendingView>().is_none());
    }
}
