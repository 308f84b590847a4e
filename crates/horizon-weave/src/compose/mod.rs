//! Composing several list providers into one list.
//!
//! A host list widget renders one flat sequence of rows. This module lets
//! several independently owned providers, each with its own item type, view
//! types and comparison logic, contribute to that sequence.
//!
//! # Core Types
//!
//! - `ListProvider`: The trait providers implement
//! - `CompositeList`: The list handed to the host widget
//! - `FlatSequence`: The rendered rows, made of `FlatEntry` values
//! - `ChangeOp`: One edit forwarded to the host
//! - `ViewType`, `ViewHolder`, `Payload`: The host-facing view vocabulary
//! - `VecProvider`: A provider backed by a vector
//!
//! # Architecture Overview
//!
//! ```text
//! ┌────────────┐ ProviderEvent ┌─────────┐  remap   ┌───────────────┐ ChangeOp ┌──────┐
//! │  Provider  │──────────────>│  Relay  │─────────>│ CompositeList │─────────>│ Host │
//! └────────────┘               └─────────┘          └───────────────┘          └──────┘
//!       ^                                              │      │                   │
//!       │          items()      ┌───────────┐          │      │  view type        │
//!       └───────────────────────│ Flattener │<─────────┘      └─> Dispatch <──────┘
//!                               └───────────┘   rebuild + diff     Table
//! ```
//!
//! Local provider events are shifted by the provider's offset in the
//! rendered rows and forwarded directly. Coarse events (and every event in
//! [`RelayMode::FullDiff`](crate::config::RelayMode::FullDiff)) rebuild the
//! rows and forward the difference computed by the [`DiffEngine`].

mod composite;
mod diff;
mod dispatch;
mod flatten;
mod item;
mod provider;
mod registry;
mod relay;
mod vec_provider;
mod view;

#[cfg(test)]
mod testing;

pub use composite::{CompositeList, CompositeSignals};
pub use diff::{apply_ops, diff, ChangeOp, DiffEngine, DiffItem};
pub use item::{FlatEntry, FlatSequence, WrappedItem};
pub use provider::{ListProvider, ProviderEvent, ProviderId, ProviderSignals};
pub use relay::RelayState;
pub use vec_provider::{BindFn, CompareFn, CreateViewFn, PayloadFn, VecProvider, ViewTypeFn};
pub use view::{Payload, PendingView, TitleView, ViewHolder, ViewType};
