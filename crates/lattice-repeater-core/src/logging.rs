//! Logging facilities for the repeater.
//!
//! The repeater is instrumented with the `tracing` crate. Nothing is printed
//! unless the host application installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("lattice_repeater::merge=trace,lattice_repeater=debug")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "lattice_repeater_core";
    /// Signal emission.
    pub const SIGNAL: &str = "lattice_repeater_core::signal";
    /// Search key handling and filter invocations.
    pub const SEARCH: &str = "lattice_repeater::search";
    /// Reconciliation of edited rows into the canonical collection.
    pub const MERGE: &str = "lattice_repeater::merge";
    /// Reporting merged values to the host.
    pub const SYNC: &str = "lattice_repeater::sync";
    /// Inline add/update/save/cancel coordination.
    pub const LIFECYCLE: &str = "lattice_repeater::lifecycle";
    /// Reference row collection.
    pub const ROWS: &str = "lattice_repeater::rows";
}

/// Span names used for performance tracing.
pub mod span_names {
    /// A host filter invocation.
    pub const FILTER: &str = "lattice_repeater::filter";
    /// A host format handler invocation.
    pub const FORMAT: &str = "lattice_repeater::format";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Only use it around synchronous sections. Across an `.await` prefer
/// [`PerfSpan::span`] with `tracing::Instrument`.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a new performance span for `operation`.
    pub fn new(operation: &'static str) -> Self {
        Self {
            span: Self::span(operation).entered(),
        }
    }

    /// Build the span without entering it, for instrumenting futures.
    pub fn span(operation: &'static str) -> tracing::Span {
        tracing::info_span!(target: "lattice_repeater::perf", "perf", operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_are_namespaced() {
        for target in [targets::SEARCH, targets::MERGE, targets::SYNC, targets::LIFECYCLE, targets::ROWS] {
            assert!(target.starts_with("lattice_repeater::"));
        }
        assert!(targets::SIGNAL.starts_with(targets::CORE));
    }

    #[test]
    fn test_perf_span_without_subscriber() {
        let _span = PerfSpan::new(span_names::FILTER);
        let span = PerfSpan::span(span_names::FORMAT);
        assert!(span.is_disabled() || span.id().is_some());
    }
}
