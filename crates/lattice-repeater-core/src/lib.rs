//! Core primitives for Lattice Repeater.
//!
//! This crate holds the pieces of the repeater engine that do not know about
//! records or rows:
//!
//! - **Signals**: direct, single-context notifications ([`Signal`])
//! - **Request generations**: discard superseded async results ([`Generation`])
//! - **Logging**: `tracing` targets and performance spans ([`logging`])
//!
//! # Example
//!
//! ```
//! use lattice_repeater_core::{Generation, Signal};
//!
//! let searches = Generation::new();
//! let refreshed = Signal::<()>::new();
//! refreshed.connect(|_| println!("refresh"));
//!
//! let ticket = searches.issue();
//! // ... await the filter ...
//! if searches.is_current(ticket) {
//!     refreshed.emit(());
//! }
//! ```

pub mod generation;
pub mod logging;
pub mod signal;

pub use generation::{Generation, Ticket};
pub use logging::PerfSpan;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
