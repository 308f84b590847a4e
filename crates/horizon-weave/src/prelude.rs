//! Prelude module for Horizon Weave.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use horizon_weave::prelude::*;
//! ```

// ============================================================================
// Signal/Slot System
// ============================================================================

pub use crate::{ConnectionId, Signal};

// ============================================================================
// Composition
// ============================================================================

pub use crate::compose::{
    ChangeOp, CompositeList, CompositeSignals, FlatEntry, ListProvider, ProviderEvent, ProviderId,
    ProviderSignals, VecProvider,
};

// ============================================================================
// Host Views
// ============================================================================

pub use crate::compose::{Payload, PendingView, TitleView, ViewHolder, ViewType};

// ============================================================================
// Configuration and Errors
// ============================================================================

pub use crate::config::{CompositeConfig, RelayMode};
pub use crate::ComposeError;
