//! Index-anchored records.
//!
//! Every record the engine shows carries an anchor: its offset in the
//! canonical collection at the moment the engine last captured it. Anchors
//! are how a row in a filtered view is correlated with its row in the full
//! collection. They are recomputed on every capture, so they are only
//! meaningful within one canonical snapshot.

use serde::{Deserialize, Serialize};

/// A record paired with its canonical offset (`$idx`).
///
/// A record without an anchor is net-new: it was added through the view and
/// has no counterpart in the canonical collection yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchored<T> {
    #[serde(rename = "$idx", default, skip_serializing_if = "Option::is_none")]
    anchor: Option<usize>,
    record: T,
}

impl<T> Anchored<T> {
    /// A record captured at canonical offset `anchor`.
    pub fn new(anchor: usize, record: T) -> Self {
        Self {
            anchor: Some(anchor),
            record,
        }
    }

    /// A net-new record with no canonical counterpart.
    pub fn fresh(record: T) -> Self {
        Self {
            anchor: None,
            record,
        }
    }

    /// The canonical offset, or `None` for net-new records.
    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    /// Returns `true` if the record has no anchor.
    pub fn is_fresh(&self) -> bool {
        self.anchor.is_none()
    }

    /// The wrapped record.
    pub fn record(&self) -> &T {
        &self.record
    }

    /// Mutable access to the wrapped record. The anchor is left untouched.
    pub fn record_mut(&mut self) -> &mut T {
        &mut self.record
    }

    /// Unwrap the record, discarding the anchor.
    pub fn into_record(self) -> T {
        self.record
    }

    /// Replace the record, keeping the anchor.
    pub fn with_record<U>(self, record: U) -> Anchored<U> {
        Anchored {
            anchor: self.anchor,
            record,
        }
    }
}

/// Anchor every record at its index in `records`.
pub fn anchor_all<T: Clone>(records: &[T]) -> Vec<Anchored<T>> {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| Anchored::new(idx, record.clone()))
        .collect()
}

/// Drop the anchors, keeping record order.
pub fn strip_anchors<T>(anchored: Vec<Anchored<T>>) -> Vec<T> {
    anchored.into_iter().map(Anchored::into_record).collect()
}

/// Returns `true` if `view` is an order-preserving sub-sequence of a canonical
/// collection of `canonical_len` records: every record anchored, anchors in
/// range and strictly increasing.
pub fn is_visible_subset<T>(view: &[Anchored<T>], canonical_len: usize) -> bool {
    let mut last = None;
    for record in view {
        match record.anchor {
            Some(anchor) if anchor < canonical_len && last.is_none_or(|prev| anchor > prev) => {
                last = Some(anchor);
            }
            _ => return false,
        }
    }
    true
}

/// Coerce an arbitrary filter result into a visible subset.
///
/// Unanchored and out-of-range records are dropped, the rest are ordered by
/// anchor and de-duplicated (first occurrence wins). The boolean is `true`
/// when anything had to change.
pub fn into_visible_subset<T>(view: Vec<Anchored<T>>, canonical_len: usize) -> (Vec<Anchored<T>>, bool) {
    if is_visible_subset(&view, canonical_len) {
        return (view, false);
    }

    let mut kept: Vec<Anchored<T>> = view
        .into_iter()
        .filter(|record| record.anchor.is_some_and(|anchor| anchor < canonical_len))
        .collect();
    kept.sort_by_key(|record| record.anchor);
    kept.dedup_by_key(|record| record.anchor);
    (kept, true)
}
