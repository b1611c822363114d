//! Filtered-view reconciliation for editable row lists.
//!
//! A repeater shows a list of records as editable rows. When the host
//! supplies a filter, searching narrows the rows to a visible subset; edits,
//! insertions and deletions made there are merged back into the full
//! collection, preserving the rows the filter hid.
//!
//! # Core Types
//!
//! - `Repeater`: the engine, built with `RepeaterBuilder`
//! - `Anchored`: a record paired with its offset in the canonical collection
//! - `merge_visible`: folds an edited view back into the canonical collection
//! - `RowCollection`: the rows the user edits, with `MemoryRows` as the
//!   in-memory implementation
//! - `FormCore`: the record core of one row
//!
//! # Architecture Overview
//!
//! ```text
//! host value ──> anchor ──> filter ──> visible subset ──> RowCollection
//!     ^                                                        │ edits
//!     │                                                        v
//! on_change <── format <── merge_visible(canonical, visible, values)
//! ```
//!
//! Anchors are recomputed every time the host supplies a value, so the merged
//! value the host receives is anchored afresh on the next cycle.

mod anchor;
mod lifecycle;
mod merge;
mod record;
mod repeater;
mod rows;
mod schema;
mod search;
mod validation;

pub use anchor::{Anchored, anchor_all, into_visible_subset, is_visible_subset, strip_anchors};
pub use merge::merge_visible;
pub use record::{AnchoredRecord, FormCore, Record, RowMode, RowStatus};
pub use repeater::{
    ChangeFn, FormatFn, FormatFuture, Repeater, RepeaterBuilder, RepeaterSignals,
};
pub use rows::{CommitFn, MemoryRows, NewRow, RowCollection, RowCommit, RowId, RowView};
pub use schema::{ColumnSpec, RowSchema};
pub use search::{FilterFn, FilterFuture, SearchInput, filter_fn};
pub use validation::{ValidateConfig, ValidateFn, Validator};
