//! Request generations for discarding superseded async resolutions.
//!
//! Each asynchronous request takes a [`Ticket`] from a [`Generation`] before it
//! suspends. When it resumes it asks whether its ticket is still the latest
//! one issued; if not, a newer request has started in the meantime and the
//! stale result must be dropped. Nothing is cancelled: in-flight futures run
//! to completion, only their effects are discarded.
//!
//! # Example
//!
//! ```
//! use lattice_repeater_core::Generation;
//!
//! let searches = Generation::new();
//! let first = searches.issue();
//! let second = searches.issue();
//!
//! assert!(!searches.is_current(first));
//! assert!(searches.is_current(second));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one issued request within a [`Generation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A monotonically increasing request counter.
#[derive(Debug, Default)]
pub struct Generation {
    latest: AtomicU64,
}

impl Generation {
    /// Create a counter with no requests issued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket, superseding every ticket issued before it.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `ticket` is the most recently issued one.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    /// Supersede all outstanding tickets without starting a request.
    ///
    /// Used when a synchronous write makes any pending async result obsolete.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_ticket_is_current() {
        let generation = Generation::new();
        let a = generation.issue();
        assert!(generation.is_current(a));

        let b = generation.issue();
        assert!(!generation.is_current(a));
        assert!(generation.is_current(b));
        assert!(b > a);
    }

    #[test]
    fn test_invalidate_supersedes_outstanding() {
        let generation = Generation::new();
        let ticket = generation.issue();
        generation.invalidate();
        assert!(!generation.is_current(ticket));
        assert_eq!(generation.issue().to_string(), "#3");
    }

    #[test]
    fn test_ticket_display() {
        let generation = Generation::new();
        generation.issue();
        assert_eq!(generation.issue().to_string(), "#2");
    }
}
