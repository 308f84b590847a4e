//! Logging facilities for Horizon Weave.
//!
//! Horizon Weave uses the `tracing` crate for instrumentation. The library
//! never installs a subscriber; to see logs, install one in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_weave::relay=debug,horizon_weave::diff=trace")
//!         .init();
//! }
//! ```
//!
//! # Performance Spans
//!
//! [`PerfSpan`] wraps an entered span on the `horizon_weave::perf` target.
//! The composition layer opens one around every rebuild and diff pass, so a
//! subscriber with span timings shows where relayout time is spent.

/// Span names used throughout Horizon Weave for tracing.
///
/// These constants can be used to filter traces for specific subsystems.
pub mod span_names {
    /// Flattening all providers into one sequence.
    pub const REBUILD: &str = "horizon_weave::rebuild";
    /// Computing change operations between two sequences.
    pub const DIFF: &str = "horizon_weave::diff";
    /// Remapping one provider event to global positions.
    pub const RELAY: &str = "horizon_weave::relay";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_weave_core::signal";
    /// Provider registration target.
    pub const REGISTRY: &str = "horizon_weave::registry";
    /// View-type dispatch target.
    pub const DISPATCH: &str = "horizon_weave::dispatch";
    /// Diff engine target.
    pub const DIFF: &str = "horizon_weave::diff";
    /// Notification relay target.
    pub const RELAY: &str = "horizon_weave::relay";
    /// Composite list target.
    pub const COMPOSITE: &str = "horizon_weave::composite";
    /// Performance span target.
    pub const PERF: &str = "horizon_weave::perf";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        // No subscriber installed; the guard must still be usable.
        let _span = PerfSpan::new("test_operation");
        tracing::trace!(target: targets::SIGNAL, value = 1, "inside span");
    }

    #[test]
    fn test_targets_are_namespaced() {
        for target in [
            targets::REGISTRY,
            targets::DISPATCH,
            targets::DIFF,
            targets::RELAY,
            targets::COMPOSITE,
        ] {
            assert!(target.starts_with("horizon_weave::"));
        }
        assert!(targets::SIGNAL.starts_with("horizon_weave_core::"));
    }
}
