//! The row collection behind a repeater.
//!
//! [`RowCollection`] is the interface the repeater drives: it holds the rows
//! currently shown (the visible subset when a search is active), applies
//! edits to them and reports their values. [`MemoryRows`] is the in-memory
//! implementation used by default.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use slotmap::{SecondaryMap, SlotMap, new_key_type};

use super::record::{AnchoredRecord, FormCore, Record, RowMode, RowStatus};
use super::validation::ValidateConfig;
use crate::error::Result;
use lattice_repeater_core::logging::targets;

new_key_type! {
    /// Identifies a row within a row collection.
    pub struct RowId;
}

/// A row handed to [`RowCollection::add`].
#[derive(Debug, Clone)]
pub enum NewRow {
    /// A prepared record core, added as-is.
    Core(FormCore),
    /// Plain values; the collection builds the core.
    Values(Record),
}

impl From<FormCore> for NewRow {
    fn from(core: FormCore) -> Self {
        NewRow::Core(core)
    }
}

impl From<Record> for NewRow {
    fn from(values: Record) -> Self {
        NewRow::Values(values)
    }
}

/// Render snapshot of one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: RowId,
    pub anchor: Option<usize>,
    /// Live values, including unsaved input.
    pub values: Record,
    pub status: RowStatus,
    pub mode: RowMode,
    pub errors: BTreeMap<String, String>,
}

/// Passed to the commit callback of a multi-row inline add.
#[derive(Debug, Clone)]
pub struct RowCommit {
    /// The row that received input.
    pub row: RowId,
    /// Fields touched by the input.
    pub fired: Vec<String>,
    /// Whether validation of the touched fields failed.
    pub has_error: bool,
    /// The collection value after the input.
    pub values: Vec<AnchoredRecord>,
    /// Render snapshots after the input.
    pub rows: Vec<RowView>,
}

/// Callback invoked on every committed input of a multi-row inline add.
///
/// Runs while the collection is still borrowed by the triggering call, so it
/// receives everything it needs in the [`RowCommit`]. Its error is returned
/// from [`RowCollection::set_field`].
pub type CommitFn = Arc<dyn Fn(RowCommit) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Row collection driven by a repeater.
///
/// Values are exchanged as anchored records: rows built by
/// [`update_value`](Self::update_value) keep the anchor of the record they
/// came from and report it back from [`values`](Self::values); rows added
/// later report no anchor.
pub trait RowCollection: Send + 'static {
    /// Build a collection holding `values`.
    fn create(values: Vec<AnchoredRecord>, status: RowStatus, rules: Arc<ValidateConfig>) -> Self;

    /// The collection value, in row order.
    fn values(&self) -> Vec<AnchoredRecord>;

    /// Replace every row with `values`.
    fn update_value(&mut self, values: Vec<AnchoredRecord>);

    /// Append a committed row.
    fn add(&mut self, row: NewRow) -> RowId;

    /// Overwrite the values of a row. Returns `false` for unknown ids.
    fn update(&mut self, value: Record, id: RowId) -> bool;

    /// Remove a row. Returns `false` for unknown ids.
    fn remove(&mut self, id: RowId) -> bool;

    /// Start an inline add. Returns `true` if the value changed.
    fn add_inline(&mut self) -> impl Future<Output = bool> + Send;

    /// Start a multi-row inline add whose inputs commit through `on_commit`.
    /// Returns `true` if the value changed.
    fn add_multiple_inline(&mut self, on_commit: CommitFn) -> impl Future<Output = bool> + Send;

    /// Put a committed row into inline edit. Returns `false` if it cannot be.
    fn update_inline(&mut self, id: RowId) -> bool;

    /// Validate and commit an inline row. Returns `true` on error.
    fn save_inline(&mut self, id: RowId) -> impl Future<Output = bool> + Send;

    /// Abandon an inline row.
    fn cancel_inline(&mut self, id: RowId);

    /// Route field input to a row. Returns `true` if the input was committed.
    fn set_field(
        &mut self,
        id: RowId,
        field: &str,
        value: Record,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Render snapshots of every row, in row order.
    fn rows(&self) -> Vec<RowView>;
}

/// In-memory [`RowCollection`].
///
/// Inline adds create `Draft` rows that stay out of the value until saved.
/// At most one draft exists at a time: starting another inline add saves the
/// outstanding draft first, or refuses if it does not validate.
pub struct MemoryRows {
    cores: SlotMap<RowId, FormCore>,
    order: Vec<RowId>,
    hooks: SecondaryMap<RowId, CommitFn>,
    status: RowStatus,
    rules: Arc<ValidateConfig>,
}

impl MemoryRows {
    pub fn new(status: RowStatus, rules: Arc<ValidateConfig>) -> Self {
        Self {
            cores: SlotMap::with_key(),
            order: Vec::new(),
            hooks: SecondaryMap::new(),
            status,
            rules,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The record core of a row.
    pub fn core(&self, id: RowId) -> Option<&FormCore> {
        self.cores.get(id)
    }

    /// Row ids in row order.
    pub fn ids(&self) -> &[RowId] {
        &self.order
    }

    /// The outstanding inline-add draft, if any.
    pub fn draft(&self) -> Option<RowId> {
        self.order
            .iter()
            .copied()
            .find(|&id| self.cores.get(id).is_some_and(|core| core.mode() == RowMode::Draft))
    }

    fn push(&mut self, core: FormCore) -> RowId {
        let id = self.cores.insert(core);
        self.order.push(id);
        id
    }

    fn blank(&self, mode: RowMode) -> FormCore {
        FormCore::with_parts(
            None,
            Record::Object(Default::default()),
            self.status,
            Arc::clone(&self.rules),
            mode,
        )
    }

    fn forget(&mut self, id: RowId) -> bool {
        self.hooks.remove(id);
        if self.cores.remove(id).is_none() {
            return false;
        }
        self.order.retain(|&row| row != id);
        true
    }

    /// Save the outstanding draft. Returns `false` if it failed validation.
    fn settle_draft(&mut self) -> Option<bool> {
        let id = self.draft()?;
        let core = self.cores.get_mut(id)?;
        if core.validate() {
            tracing::debug!(target: targets::ROWS, ?id, errors = ?core.errors(), "outstanding draft is invalid");
            return Some(false);
        }
        core.commit();
        tracing::debug!(target: targets::ROWS, ?id, "outstanding draft committed");
        Some(true)
    }
}

impl fmt::Debug for MemoryRows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRows")
            .field("rows", &self.order.len())
            .field("hooks", &self.hooks.len())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl RowCollection for MemoryRows {
    fn create(values: Vec<AnchoredRecord>, status: RowStatus, rules: Arc<ValidateConfig>) -> Self {
        let mut rows = Self::new(status, rules);
        rows.update_value(values);
        rows
    }

    fn values(&self) -> Vec<AnchoredRecord> {
        self.order
            .iter()
            .filter_map(|&id| self.cores.get(id))
            .filter_map(FormCore::snapshot)
            .collect()
    }

    fn update_value(&mut self, values: Vec<AnchoredRecord>) {
        self.cores.clear();
        self.order.clear();
        self.hooks.clear();
        for value in values {
            let anchor = value.anchor();
            let core = FormCore::with_parts(
                anchor,
                value.into_record(),
                self.status,
                Arc::clone(&self.rules),
                RowMode::Committed,
            );
            self.push(core);
        }
        tracing::debug!(target: targets::ROWS, rows = self.order.len(), "row collection replaced");
    }

    fn add(&mut self, row: NewRow) -> RowId {
        let core = match row {
            NewRow::Core(mut core) => {
                core.set_anchor(None);
                core
            }
            NewRow::Values(values) => FormCore::with_parts(
                None,
                values,
                self.status,
                Arc::clone(&self.rules),
                RowMode::Committed,
            ),
        };
        let id = self.push(core);
        tracing::trace!(target: targets::ROWS, ?id, "row added");
        id
    }

    fn update(&mut self, value: Record, id: RowId) -> bool {
        match self.cores.get_mut(id) {
            Some(core) => {
                core.apply_update(value);
                true
            }
            None => {
                tracing::debug!(target: targets::ROWS, ?id, "update of unknown row ignored");
                false
            }
        }
    }

    fn remove(&mut self, id: RowId) -> bool {
        let removed = self.forget(id);
        if !removed {
            tracing::debug!(target: targets::ROWS, ?id, "removal of unknown row ignored");
        }
        removed
    }

    async fn add_inline(&mut self) -> bool {
        match self.settle_draft() {
            Some(false) => false,
            settled => {
                let draft = self.blank(RowMode::Draft);
                let id = self.push(draft);
                tracing::trace!(target: targets::ROWS, ?id, "inline draft added");
                settled.unwrap_or(false)
            }
        }
    }

    async fn add_multiple_inline(&mut self, on_commit: CommitFn) -> bool {
        if self.settle_draft() == Some(false) {
            return false;
        }
        let row = self.blank(RowMode::Multiple);
        let id = self.push(row);
        self.hooks.insert(id, on_commit);
        tracing::trace!(target: targets::ROWS, ?id, "multiple inline row added");
        true
    }

    fn update_inline(&mut self, id: RowId) -> bool {
        match self.cores.get_mut(id) {
            Some(core) if core.mode() == RowMode::Committed => {
                core.begin_edit();
                true
            }
            _ => false,
        }
    }

    async fn save_inline(&mut self, id: RowId) -> bool {
        let Some(core) = self.cores.get_mut(id) else {
            tracing::debug!(target: targets::ROWS, ?id, "save of unknown row");
            return true;
        };
        if core.mode() == RowMode::Committed {
            return false;
        }
        if core.validate() {
            tracing::debug!(target: targets::ROWS, ?id, errors = ?core.errors(), "inline save failed validation");
            return true;
        }
        core.commit();
        self.hooks.remove(id);
        false
    }

    fn cancel_inline(&mut self, id: RowId) {
        let Some(mode) = self.cores.get(id).map(FormCore::mode) else {
            return;
        };
        match mode {
            RowMode::Editing => {
                if let Some(core) = self.cores.get_mut(id) {
                    core.revert();
                }
            }
            RowMode::Draft | RowMode::Multiple => {
                self.forget(id);
            }
            RowMode::Committed => {}
        }
    }

    async fn set_field(&mut self, id: RowId, field: &str, value: Record) -> Result<bool> {
        let Some(core) = self.cores.get_mut(id) else {
            return Ok(false);
        };
        if !core.mode().accepts_input() || !core.status().is_editable() {
            tracing::trace!(target: targets::ROWS, ?id, field, "input ignored");
            return Ok(false);
        }
        core.set_field(field, value);
        if core.mode() != RowMode::Multiple {
            return Ok(false);
        }

        let fired = vec![field.to_string()];
        let has_error = core.validate_fields(&fired);
        let Some(hook) = self.hooks.get(id).cloned() else {
            return Ok(false);
        };
        let commit = RowCommit {
            row: id,
            fired,
            has_error,
            values: self.values(),
            rows: self.rows(),
        };
        hook(commit).await?;
        Ok(true)
    }

    fn rows(&self) -> Vec<RowView> {
        self.order
            .iter()
            .filter_map(|&id| {
                let core = self.cores.get(id)?;
                Some(RowView {
                    id,
                    anchor: core.anchor(),
                    values: core.values().clone(),
                    status: core.status(),
                    mode: core.mode(),
                    errors: core.errors().clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::anchor::{Anchored, anchor_all};
    use crate::model::validation::Validator;
    use futures_util::FutureExt;
    use parking_lot::Mutex;
    use serde_json::json;

    fn rules() -> Arc<ValidateConfig> {
        Arc::new(ValidateConfig::new().rule("name", Validator::required()))
    }

    fn rows_with(names: &[&str]) -> MemoryRows {
        let values: Vec<Record> = names.iter().map(|n| json!({ "name": n })).collect();
        MemoryRows::create(anchor_all(&values), RowStatus::Edit, rules())
    }

    fn names(values: &[AnchoredRecord]) -> Vec<String> {
        values
            .iter()
            .map(|v| v.record()["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_values_keep_anchors() {
        let rows = rows_with(&["a", "b"]);
        let values = rows.values();
        assert_eq!(values[1], Anchored::new(1, json!({ "name": "b" })));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_add_update_remove() {
        let mut rows = rows_with(&["a"]);
        let id = rows.add(json!({ "name": "b" }).into());
        assert!(rows.values()[1].is_fresh());

        assert!(rows.update(json!({ "name": "c" }), id));
        assert_eq!(names(&rows.values()), vec!["a", "c"]);

        assert!(rows.remove(id));
        assert!(!rows.remove(id));
        assert!(!rows.update(json!({}), id));
        assert_eq!(names(&rows.values()), vec!["a"]);
    }

    #[test]
    fn test_add_core_drops_anchor() {
        let mut rows = rows_with(&[]);
        let mut core = FormCore::new(json!({ "name": "x" }));
        core.set_anchor(Some(7));
        rows.add(NewRow::from(core));
        assert!(rows.values()[0].is_fresh());
    }

    #[tokio::test]
    async fn test_add_inline_draft_rules() {
        let mut rows = rows_with(&["a"]);

        // First inline add only creates a draft.
        assert!(!rows.add_inline().await);
        let draft = rows.draft().unwrap();
        assert_eq!(rows.values().len(), 1);

        // An empty draft blocks the next one.
        assert!(!rows.add_inline().await);
        assert_eq!(rows.len(), 2);

        // A valid draft is committed and replaced by a new one.
        rows.set_field(draft, "name", json!("b")).await.unwrap();
        assert!(rows.add_inline().await);
        assert_eq!(names(&rows.values()), vec!["a", "b"]);
        assert_ne!(rows.draft(), Some(draft));
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_save_inline() {
        let mut rows = rows_with(&[]);
        rows.add_inline().await;
        let draft = rows.draft().unwrap();

        assert!(rows.save_inline(draft).await);
        assert_eq!(
            rows.core(draft).unwrap().error("name"),
            Some("This field is required")
        );
        assert!(rows.values().is_empty());

        rows.set_field(draft, "name", json!("x")).await.unwrap();
        assert!(!rows.save_inline(draft).await);
        assert_eq!(names(&rows.values()), vec!["x"]);
        assert_eq!(rows.draft(), None);
    }

    #[tokio::test]
    async fn test_save_unknown_row_is_error() {
        let mut rows = rows_with(&["a"]);
        let id = rows.ids()[0];
        rows.remove(id);
        assert!(rows.save_inline(id).await);
    }

    #[tokio::test]
    async fn test_update_inline_and_cancel() {
        let mut rows = rows_with(&["a"]);
        let id = rows.ids()[0];

        // Committed rows ignore input.
        assert!(!rows.set_field(id, "name", json!("z")).await.unwrap());
        assert_eq!(rows.rows()[0].values, json!({ "name": "a" }));

        assert!(rows.update_inline(id));
        assert!(!rows.update_inline(id));
        rows.set_field(id, "name", json!("b")).await.unwrap();
        // Unsaved input is not part of the value.
        assert_eq!(names(&rows.values()), vec!["a"]);
        assert_eq!(rows.rows()[0].values, json!({ "name": "b" }));

        rows.cancel_inline(id);
        assert_eq!(rows.rows()[0].values, json!({ "name": "a" }));
        assert_eq!(rows.rows()[0].mode, RowMode::Committed);
    }

    #[tokio::test]
    async fn test_cancel_draft_removes_it() {
        let mut rows = rows_with(&["a"]);
        rows.add_inline().await;
        let draft = rows.draft().unwrap();
        rows.cancel_inline(draft);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.draft(), None);
    }

    #[tokio::test]
    async fn test_disabled_rows_ignore_input() {
        let mut rows = MemoryRows::create(Vec::new(), RowStatus::Disabled, rules());
        rows.add_inline().await;
        let draft = rows.draft().unwrap();
        assert!(!rows.set_field(draft, "name", json!("x")).await.unwrap());
        assert_eq!(rows.rows()[0].values, json!({}));
    }

    #[tokio::test]
    async fn test_multiple_inline_commits_on_input() {
        let commits = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&commits);
        let on_commit: CommitFn = Arc::new(move |commit: RowCommit| {
            let recorder = Arc::clone(&recorder);
            async move {
                recorder.lock().push(commit);
                Ok(())
            }
            .boxed()
        });

        let mut rows = rows_with(&["a"]);
        assert!(rows.add_multiple_inline(on_commit).await);
        let id = rows.ids()[1];

        assert!(rows.set_field(id, "name", json!("")).await.unwrap());
        assert!(rows.set_field(id, "name", json!("m")).await.unwrap());

        let commits = commits.lock();
        assert_eq!(commits.len(), 2);
        assert!(commits[0].has_error);
        assert!(!commits[1].has_error);
        assert_eq!(commits[1].fired, vec!["name".to_string()]);
        assert_eq!(names(&commits[1].values), vec!["a", "m"]);
        assert_eq!(commits[1].rows.len(), 2);
    }

    #[tokio::test]
    async fn test_multiple_inline_blocked_by_invalid_draft() {
        let on_commit: CommitFn = Arc::new(|_: RowCommit| async { Ok(()) }.boxed());
        let mut rows = rows_with(&[]);
        rows.add_inline().await;
        assert!(!rows.add_multiple_inline(on_commit).await);
        assert_eq!(rows.len(), 1);
    }
}
