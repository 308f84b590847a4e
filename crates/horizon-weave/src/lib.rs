//! Horizon Weave - composing heterogeneous item providers into one list.
//!
//! Several providers, each with its own item type, view types and change
//! logic, are shown by a host list widget as one seamless list. The
//! composite keeps view types collision-free across providers, forwards
//! provider mutations at the right flattened positions, and diffs full
//! rebuilds into minimal change operations.
//!
//! # Example
//!
//! ```
//! use horizon_weave::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), ComposeError> {
//!     let colors = Arc::new(VecProvider::new(vec!["red", "green"], ViewType::new(1)));
//!     let sizes = Arc::new(VecProvider::new(vec![8, 12], ViewType::new(2)));
//!
//!     let list = CompositeList::new();
//!     list.register_with_title(colors, "Colors")?;
//!     list.register_with_title(sizes, "Sizes")?;
//!
//!     list.signals().changed.connect(|op| println!("{op:?}"));
//!     assert_eq!(list.len(), 6);
//!     Ok(())
//! }
//! ```

pub use horizon_weave_core::*;

pub mod compose;
pub mod config;
mod error;
pub mod prelude;

pub use error::{ComposeError, Result};
