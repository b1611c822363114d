//! Reconciliation of an edited filtered view back into the canonical collection.
//!
//! When a filter is active the row collection only holds the visible subset.
//! Edits made there (field updates, deletions, insertions) must be folded back
//! into the full collection without disturbing the rows the filter hid.
//!
//! ```text
//! canonical   A0  B1  C2  D3
//! before          B1      D3     (visible when editing began)
//! after           B'1            (B edited, D deleted)
//! merged      A0  B'1 C2
//! ```

use std::collections::HashSet;

use super::anchor::Anchored;
use lattice_repeater_core::logging::targets;

/// Merge an edited view into the canonical collection.
///
/// - `canonical`: the full collection the view was filtered from, anchored.
/// - `before`: the visible subset as it stood before editing, ordered by anchor.
/// - `after`: the visible subset after editing. Surviving rows keep their
///   anchors and relative order; net-new rows have no anchor.
///
/// Rows never visible pass through in their original order. A row of
/// `before` is replaced by its `after` counterpart (matched by anchor) or
/// dropped if it has none. Every `after` row left unmatched is appended at the
/// end in `after` order, never interleaved with existing rows.
///
/// Anchors in `before` that no longer exist in `canonical` are skipped,
/// `after` rows carrying an anchor that `canonical` does not contain are
/// dropped, and canonical rows without an anchor are passed through.
/// Malformed input never fails; it degrades to dropping or appending rows.
pub fn merge_visible<T: Clone>(
    canonical: &[Anchored<T>],
    before: &[Anchored<T>],
    after: &[Anchored<T>],
) -> Vec<Anchored<T>> {
    let mut merged = Vec::with_capacity(canonical.len() + after.len());
    let mut emitted = vec![false; after.len()];

    // Cursor over the anchored rows of `after`; net-new rows are never matched.
    let survivors: Vec<usize> = (0..after.len())
        .filter(|&pos| after[pos].anchor().is_some())
        .collect();
    let mut i = 0;
    let mut j = 0;

    for item in canonical {
        let Some(anchor) = item.anchor() else {
            merged.push(item.clone());
            continue;
        };

        // `before` rows behind the walk (or unanchored) have no canonical position.
        while let Some(stale) = before
            .get(i)
            .filter(|row| row.anchor().is_none_or(|b| b < anchor))
        {
            tracing::trace!(target: targets::MERGE, stale = ?stale.anchor(), "skipping row missing from canonical collection");
            i += 1;
        }

        match before.get(i).and_then(Anchored::anchor) {
            Some(visible) if visible == anchor => {
                match survivors.get(j) {
                    Some(&pos) if after[pos].anchor() == Some(anchor) => {
                        merged.push(after[pos].clone());
                        emitted[pos] = true;
                        j += 1;
                    }
                    _ => {
                        tracing::trace!(target: targets::MERGE, anchor, "row deleted in view");
                    }
                }
                i += 1;
            }
            // Not visible: `before` is exhausted or its next anchor lies further on.
            _ => merged.push(item.clone()),
        }
    }

    let known: HashSet<usize> = canonical.iter().filter_map(Anchored::anchor).collect();
    for (record, _) in after.iter().zip(&emitted).filter(|(_, done)| !**done) {
        match record.anchor() {
            Some(anchor) if !known.contains(&anchor) => {
                tracing::trace!(target: targets::MERGE, anchor, "dropping row anchored outside canonical collection");
            }
            _ => merged.push(record.clone()),
        }
    }

    tracing::debug!(
        target: targets::MERGE,
        canonical = canonical.len(),
        before = before.len(),
        after = after.len(),
        merged = merged.len(),
        "merged visible rows"
    );
    merged
}
