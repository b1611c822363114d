//! Row operations and the inline-edit lifecycle.
//!
//! Each operation forwards to the row collection, then syncs (reports the
//! merged value to the host) and/or requests a refresh:
//!
//! | Operation | Sync | Refresh |
//! |---|---|---|
//! | [`add`](Repeater::add), [`update`](Repeater::update), [`delete`](Repeater::delete) | yes | no |
//! | [`add_inline`](Repeater::add_inline), [`add_multiple_inline`](Repeater::add_multiple_inline) | if the value changed | yes |
//! | [`update_inline`](Repeater::update_inline) | no | yes |
//! | [`save_inline`](Repeater::save_inline) | on success | on success |
//! | [`cancel_inline`](Repeater::cancel_inline) | yes | yes |
//! | [`edit_field`](Repeater::edit_field) | through the commit callback | yes |
//!
//! Values are read together with the view they belong to while the rows are
//! locked, so a search that lands in between cannot change how they merge.
//!
//! Validation failures never surface as errors. Only the host handlers can
//! make an operation fail.

use std::sync::Arc;

use futures_util::FutureExt;

use super::record::Record;
use super::repeater::{Repeater, RowsValue};
use super::rows::{CommitFn, NewRow, RowCollection, RowCommit, RowId};
use crate::error::Result;
use lattice_repeater_core::logging::targets;

impl<C: RowCollection> Repeater<C> {
    /// Run `op` against the rows, publish the new snapshots and capture the
    /// value.
    async fn apply<R>(&self, op: impl FnOnce(&mut C) -> R) -> (R, RowsValue) {
        let mut rows = self.rows.lock().await;
        let result = op(&mut *rows);
        self.shared.publish(rows.rows());
        (result, self.shared.capture(rows.values()))
    }

    /// Report `values` if present, then refresh.
    async fn settle(&self, values: Option<RowsValue>) -> Result<()> {
        let synced = match values {
            Some(values) => self.shared.report(values).await,
            None => Ok(()),
        };
        self.refresh();
        synced
    }

    /// Append a committed row.
    pub async fn add(&self, row: impl Into<NewRow>) -> Result<RowId> {
        let (id, values) = self.apply(|rows| rows.add(row.into())).await;
        tracing::debug!(target: targets::LIFECYCLE, ?id, "add");
        self.shared.report(values).await?;
        Ok(id)
    }

    /// Overwrite the values of a row. Returns `false` for unknown ids.
    pub async fn update(&self, value: Record, id: RowId) -> Result<bool> {
        let (updated, values) = self.apply(|rows| rows.update(value, id)).await;
        tracing::debug!(target: targets::LIFECYCLE, ?id, updated, "update");
        self.shared.report(values).await?;
        Ok(updated)
    }

    /// Remove a row. Returns `false` for unknown ids.
    pub async fn delete(&self, id: RowId) -> Result<bool> {
        let (removed, values) = self.apply(|rows| rows.remove(id)).await;
        tracing::debug!(target: targets::LIFECYCLE, ?id, removed, "delete");
        self.shared.report(values).await?;
        Ok(removed)
    }

    /// Start an inline add. Returns `true` if the value changed.
    pub async fn add_inline(&self) -> Result<bool> {
        let (changed, values) = {
            let mut rows = self.rows.lock().await;
            let changed = rows.add_inline().await;
            self.shared.publish(rows.rows());
            (changed, changed.then(|| self.shared.capture(rows.values())))
        };
        tracing::debug!(target: targets::LIFECYCLE, changed, "add inline");
        self.settle(values).await.map(|()| changed)
    }

    /// Start a multi-row inline add.
    ///
    /// Every input on the new row reports the value and requests a refresh
    /// on its own; see [`edit_field`](Self::edit_field). Returns `true` if the
    /// value changed.
    pub async fn add_multiple_inline(&self) -> Result<bool> {
        let shared = Arc::clone(&self.shared);
        let on_commit: CommitFn = Arc::new(move |commit: RowCommit| {
            let shared = Arc::clone(&shared);
            async move {
                tracing::trace!(
                    target: targets::LIFECYCLE,
                    row = ?commit.row,
                    fired = ?commit.fired,
                    has_error = commit.has_error,
                    "multiple inline commit"
                );
                shared.publish(commit.rows);
                let reported = shared.report(shared.capture(commit.values)).await;
                shared.refresh();
                reported
            }
            .boxed()
        });

        let (changed, values) = {
            let mut rows = self.rows.lock().await;
            let changed = rows.add_multiple_inline(on_commit).await;
            self.shared.publish(rows.rows());
            (changed, changed.then(|| self.shared.capture(rows.values())))
        };
        tracing::debug!(target: targets::LIFECYCLE, changed, "add multiple inline");
        self.settle(values).await.map(|()| changed)
    }

    /// Put a row into inline edit. Returns `false` if it cannot be edited.
    pub async fn update_inline(&self, id: RowId) -> bool {
        let started = {
            let mut rows = self.rows.lock().await;
            let started = rows.update_inline(id);
            self.shared.publish(rows.rows());
            started
        };
        tracing::debug!(target: targets::LIFECYCLE, ?id, started, "update inline");
        self.refresh();
        started
    }

    /// Validate and commit an inline row.
    ///
    /// Returns `true` if the row failed validation; nothing is reported and
    /// no refresh is requested in that case, but [`rows`](Self::rows) shows
    /// the errors.
    pub async fn save_inline(&self, id: RowId) -> Result<bool> {
        let (has_error, values) = {
            let mut rows = self.rows.lock().await;
            let has_error = rows.save_inline(id).await;
            self.shared.publish(rows.rows());
            (has_error, self.shared.capture(rows.values()))
        };
        if has_error {
            tracing::debug!(target: targets::LIFECYCLE, ?id, "save inline failed validation");
            return Ok(true);
        }
        tracing::debug!(target: targets::LIFECYCLE, ?id, "save inline");
        self.settle(Some(values)).await.map(|()| false)
    }

    /// Abandon an inline row.
    pub async fn cancel_inline(&self, id: RowId) -> Result<()> {
        let ((), values) = self.apply(|rows| rows.cancel_inline(id)).await;
        tracing::debug!(target: targets::LIFECYCLE, ?id, "cancel inline");
        self.settle(Some(values)).await
    }

    /// Route field input to a row.
    ///
    /// Returns `true` if the input was committed through a multi-row inline
    /// add, which has already reported and refreshed. Fails when reporting
    /// that commit fails.
    pub async fn edit_field(&self, id: RowId, field: &str, value: Record) -> Result<bool> {
        let committed = {
            let mut rows = self.rows.lock().await;
            let committed = rows.set_field(id, field, value).await;
            self.shared.publish(rows.rows());
            committed
        };
        tracing::trace!(target: targets::LIFECYCLE, ?id, field, ?committed, "edit field");
        if let Ok(false) = committed {
            self.refresh();
        }
        committed
    }
}
