//! Core systems for Horizon Weave.
//!
//! This crate provides the foundational pieces shared by the composition
//! layer:
//!
//! - **Signal/Slot System**: Type-safe change notification between list
//!   providers, the composite list, and the host widget
//! - **Logging**: `tracing` targets, span names and the perf span guard
//! - **Errors**: Error types for the core primitives
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_weave_core::Signal;
//!
//! // Create a signal that notifies when a value changes
//! let value_changed = Signal::<i32>::new();
//!
//! // Connect a slot to handle the signal
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! // Emit the signal
//! value_changed.emit(42);
//!
//! // Disconnect when done
//! value_changed.disconnect(conn_id);
//! ```

mod error;
pub mod logging;
pub mod signal;

pub use error::SignalError;
pub use logging::PerfSpan;
pub use signal::{ConnectionId, Signal};
