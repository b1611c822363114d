//! The repeater engine.
//!
//! A [`Repeater`] sits between a host-owned canonical collection of records
//! and a [`RowCollection`] that holds the rows the user edits. When a search
//! is active the row collection only holds the visible subset; every change
//! is merged back into the full collection before it is reported through the
//! change handler.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lattice_repeater::model::{Record, Repeater};
//! use parking_lot::Mutex;
//! use serde_json::json;
//!
//! # tokio_test_block(async {
//! let reported = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&reported);
//!
//! let repeater = Repeater::builder()
//!     .value(vec![json!({ "name": "Ada" }), json!({ "name": "Grace" })])
//!     .filter(|value, key| async move {
//!         Ok(value
//!             .iter()
//!             .filter(|row| row.record()["name"].as_str().is_some_and(|n| n.contains(&key)))
//!             .cloned()
//!             .collect::<Vec<_>>())
//!     })
//!     .on_change(move |value: Vec<Record>| *sink.lock() = value)
//!     .build()
//!     .unwrap();
//!
//! repeater.search("Gr").await.unwrap();
//! assert_eq!(repeater.rows().len(), 1);
//!
//! let id = repeater.rows()[0].id;
//! repeater.delete(id).await.unwrap();
//! assert_eq!(*reported.lock(), vec![json!({ "name": "Ada" })]);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use tracing::Instrument;

use super::anchor::{anchor_all, strip_anchors};
use super::merge::merge_visible;
use super::record::{AnchoredRecord, Record, RowStatus};
use super::rows::{MemoryRows, RowCollection, RowView};
use super::schema::RowSchema;
use super::search::{FilterFn, filter_fn};
use super::validation::ValidateConfig;
use crate::error::{Error, HandlerError, Result};
use lattice_repeater_core::logging::{span_names, targets};
use lattice_repeater_core::{Generation, PerfSpan, Signal, Ticket};

/// Future returned by a [`FormatFn`].
pub type FormatFuture = BoxFuture<'static, std::result::Result<Vec<Record>, HandlerError>>;

/// Host format handler, applied to every merged value before it is reported.
pub type FormatFn = Arc<dyn Fn(Vec<Record>) -> FormatFuture + Send + Sync>;

/// Host change handler, receiving every new canonical value.
pub type ChangeFn = Arc<dyn Fn(Vec<Record>) + Send + Sync>;

/// Signals emitted by a repeater.
pub struct RepeaterSignals {
    /// The rows should be rendered again; read them with [`Repeater::rows`].
    pub refresh_requested: Signal<()>,
    /// The stored search key changed.
    pub search_changed: Signal<String>,
}

impl RepeaterSignals {
    fn new() -> Self {
        Self {
            refresh_requested: Signal::new(),
            search_changed: Signal::new(),
        }
    }
}

impl fmt::Debug for RepeaterSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeaterSignals")
            .field("refresh_requested", &self.refresh_requested)
            .field("search_changed", &self.search_changed)
            .finish()
    }
}

/// What the repeater currently tracks of the host value.
#[derive(Debug)]
pub(super) struct ViewState {
    /// The host value as last supplied.
    source: Arc<Vec<Record>>,
    /// `source`, anchored.
    pub(super) canonical: Arc<Vec<AnchoredRecord>>,
    /// The visible subset the row collection was last filled with.
    pub(super) visible: Arc<Vec<AnchoredRecord>>,
    /// Whether `visible` came from the filter. Changes with `visible`, under
    /// the rows lock.
    pub(super) filtered: bool,
    /// `None` until a key is entered.
    pub(super) key: Option<String>,
}

impl ViewState {
    fn new(source: Arc<Vec<Record>>) -> Self {
        let canonical = Arc::new(anchor_all(&source));
        Self {
            source,
            visible: Arc::clone(&canonical),
            canonical,
            filtered: false,
            key: None,
        }
    }
}

/// A row collection value and the view it was read from.
///
/// Captured while the rows are locked, so it pairs the values with the
/// visible subset the rows actually held.
pub(super) struct RowsValue {
    values: Vec<AnchoredRecord>,
    /// `(canonical, visible)` when the rows held a filtered subset.
    filtered: Option<(Arc<Vec<AnchoredRecord>>, Arc<Vec<AnchoredRecord>>)>,
}

/// State shared by every clone of a repeater and by commit callbacks.
pub(super) struct Shared {
    pub(super) filter: Option<FilterFn>,
    format: Option<FormatFn>,
    on_change: ChangeFn,
    schema: RowSchema,
    pub(super) state: Mutex<ViewState>,
    view: RwLock<Vec<RowView>>,
    pub(super) searches: Generation,
    reports: Generation,
    pub(super) signals: RepeaterSignals,
}

impl Shared {
    fn is_filtering(&self, state: &ViewState) -> bool {
        self.filter.is_some() && state.key.as_deref().is_some_and(|key| !key.is_empty())
    }

    /// Cache render snapshots for synchronous readers.
    pub(super) fn publish(&self, rows: Vec<RowView>) {
        *self.view.write() = rows;
    }

    pub(super) fn refresh(&self) {
        self.signals.refresh_requested.emit(());
    }

    /// Pair `values` with the current view. Call with the rows locked.
    pub(super) fn capture(&self, values: Vec<AnchoredRecord>) -> RowsValue {
        let state = self.state.lock();
        let filtered = state
            .filtered
            .then(|| (Arc::clone(&state.canonical), Arc::clone(&state.visible)));
        RowsValue { values, filtered }
    }

    /// Merge a row collection value into the canonical collection and hand the
    /// result to the host.
    pub(super) async fn report(&self, value: RowsValue) -> Result<()> {
        let merged = match value.filtered {
            Some((canonical, visible)) => merge_visible(&canonical, &visible, &value.values),
            None => value.values,
        };
        let merged = strip_anchors(merged);

        let value = match self.format.as_ref() {
            Some(format) => {
                let ticket = self.reports.issue();
                let result = format(merged)
                    .instrument(PerfSpan::span(span_names::FORMAT))
                    .await;
                if !self.reports.is_current(ticket) {
                    tracing::debug!(target: targets::SYNC, %ticket, "discarding superseded format resolution");
                    return Ok(());
                }
                result.map_err(|source| {
                    tracing::warn!(target: targets::SYNC, error = %source, "format handler rejected value");
                    Error::Format(source)
                })?
            }
            None => {
                self.reports.invalidate();
                merged
            }
        };

        tracing::debug!(target: targets::SYNC, rows = value.len(), "reporting value");
        (self.on_change)(value);
        Ok(())
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("filter", &self.filter.is_some())
            .field("format", &self.format.is_some())
            .field("schema", &self.schema)
            .field("signals", &self.signals)
            .finish_non_exhaustive()
    }
}

/// What [`Repeater::set_value`] does after tracking a new value.
enum Refilter {
    /// Only track the value.
    Track,
    /// Run the stored key over the new value.
    Key(String, Arc<Vec<AnchoredRecord>>, Ticket),
    /// Replace filtered rows with the whole new value.
    ShowAll(Arc<Vec<AnchoredRecord>>, Ticket),
}

/// Builder for [`Repeater`].
pub struct RepeaterBuilder<C = MemoryRows> {
    value: Arc<Vec<Record>>,
    status: RowStatus,
    rules: ValidateConfig,
    schema: RowSchema,
    filter: Option<FilterFn>,
    format: Option<FormatFn>,
    on_change: Option<ChangeFn>,
    _rows: PhantomData<fn() -> C>,
}

impl RepeaterBuilder<MemoryRows> {
    pub fn new() -> Self {
        Self {
            value: Arc::default(),
            status: RowStatus::default(),
            rules: ValidateConfig::default(),
            schema: RowSchema::default(),
            filter: None,
            format: None,
            on_change: None,
            _rows: PhantomData,
        }
    }
}

impl Default for RepeaterBuilder<MemoryRows> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: RowCollection> RepeaterBuilder<C> {
    /// Set the initial canonical collection (empty by default).
    pub fn value(mut self, value: impl Into<Arc<Vec<Record>>>) -> Self {
        self.value = value.into();
        self
    }

    pub fn status(mut self, status: RowStatus) -> Self {
        self.status = status;
        self
    }

    pub fn validate_config(mut self, rules: ValidateConfig) -> Self {
        self.rules = rules;
        self
    }

    pub fn schema(mut self, schema: RowSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Enable searching through an async filter.
    pub fn filter<F, Fut>(mut self, filter: F) -> Self
    where
        F: Fn(Arc<Vec<AnchoredRecord>>, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Vec<AnchoredRecord>, HandlerError>> + Send + 'static,
    {
        self.filter = Some(filter_fn(filter));
        self
    }

    /// Post-process every merged value before it is reported.
    pub fn format<F, Fut>(mut self, format: F) -> Self
    where
        F: Fn(Vec<Record>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Vec<Record>, HandlerError>> + Send + 'static,
    {
        self.format = Some(Arc::new(move |value| format(value).boxed()));
        self
    }

    /// Receive every new canonical value. Required.
    pub fn on_change<F>(mut self, on_change: F) -> Self
    where
        F: Fn(Vec<Record>) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(on_change));
        self
    }

    /// Use another row collection implementation.
    pub fn collection<D: RowCollection>(self) -> RepeaterBuilder<D> {
        RepeaterBuilder {
            value: self.value,
            status: self.status,
            rules: self.rules,
            schema: self.schema,
            filter: self.filter,
            format: self.format,
            on_change: self.on_change,
            _rows: PhantomData,
        }
    }

    pub fn build(self) -> Result<Repeater<C>> {
        let on_change = self.on_change.ok_or(Error::MissingChangeHandler)?;
        let state = ViewState::new(self.value);
        let rows = C::create(state.canonical.to_vec(), self.status, Arc::new(self.rules));
        let view = rows.rows();

        tracing::debug!(
            target: targets::LIFECYCLE,
            rows = view.len(),
            status = %self.status,
            filter = self.filter.is_some(),
            "repeater built"
        );

        Ok(Repeater {
            shared: Arc::new(Shared {
                filter: self.filter,
                format: self.format,
                on_change,
                schema: self.schema,
                state: Mutex::new(state),
                view: RwLock::new(view),
                searches: Generation::new(),
                reports: Generation::new(),
                signals: RepeaterSignals::new(),
            }),
            rows: Arc::new(tokio::sync::Mutex::new(rows)),
        })
    }
}

/// Filtered-view reconciliation and inline-edit engine.
///
/// Cloning is cheap; clones drive the same engine.
pub struct Repeater<C: RowCollection = MemoryRows> {
    pub(super) shared: Arc<Shared>,
    pub(super) rows: Arc<tokio::sync::Mutex<C>>,
}

impl<C: RowCollection> Clone for Repeater<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<C: RowCollection> fmt::Debug for Repeater<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repeater").field("shared", &self.shared).finish_non_exhaustive()
    }
}

impl Repeater<MemoryRows> {
    pub fn builder() -> RepeaterBuilder<MemoryRows> {
        RepeaterBuilder::new()
    }
}

impl<C: RowCollection> Repeater<C> {
    /// Supply the next canonical collection.
    ///
    /// Without an active search the new value is only tracked, unless the
    /// rows still hold the subset of a search that was just cleared; they are
    /// then replaced by the new value. With an active search, a value that is
    /// not the same allocation as the previous one is filtered again with the
    /// stored key and the visible rows are replaced. Either way, pending
    /// searches over the previous value are superseded.
    pub async fn set_value(&self, value: impl Into<Arc<Vec<Record>>>) -> Result<()> {
        let value = value.into();
        let refilter = {
            let mut state = self.shared.state.lock();
            let changed = !Arc::ptr_eq(&state.source, &value);
            state.canonical = Arc::new(anchor_all(&value));
            state.source = value;

            if !self.shared.is_filtering(&state) {
                if state.filtered {
                    // A cleared search has not replaced the filtered rows yet.
                    Refilter::ShowAll(Arc::clone(&state.canonical), self.shared.searches.issue())
                } else {
                    self.shared.searches.invalidate();
                    state.visible = Arc::clone(&state.canonical);
                    Refilter::Track
                }
            } else if changed {
                let key = state.key.clone().unwrap_or_default();
                Refilter::Key(key, Arc::clone(&state.canonical), self.shared.searches.issue())
            } else {
                Refilter::Track
            }
        };

        let (key, canonical, ticket, filter) = match (refilter, self.shared.filter.as_ref()) {
            (Refilter::Key(key, canonical, ticket), Some(filter)) => (key, canonical, ticket, filter),
            (Refilter::ShowAll(canonical, ticket), _) => {
                tracing::debug!(target: targets::SEARCH, %ticket, "showing new value unfiltered");
                self.show(ticket, canonical, false).await;
                return Ok(());
            }
            _ => {
                tracing::trace!(target: targets::SEARCH, "value tracked without refilter");
                return Ok(());
            }
        };

        tracing::debug!(target: targets::SEARCH, %key, %ticket, "refiltering new value");
        match self.shared.run_filter(filter, canonical, &key).await {
            Ok(visible) => {
                self.show(ticket, Arc::new(visible), true).await;
                Ok(())
            }
            Err(_) if !self.shared.searches.is_current(ticket) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Report the row collection value to the change handler.
    pub async fn sync(&self) -> Result<()> {
        let value = {
            let rows = self.rows.lock().await;
            self.shared.capture(rows.values())
        };
        self.shared.report(value).await
    }

    /// [`sync`](Self::sync), then request a refresh.
    pub async fn sync_and_update(&self) -> Result<()> {
        self.sync().await?;
        self.refresh();
        Ok(())
    }

    /// Request a refresh.
    pub fn refresh(&self) {
        self.shared.refresh();
    }

    /// Render snapshots of the rows, as of the last change.
    pub fn rows(&self) -> Vec<RowView> {
        self.shared.view.read().clone()
    }

    /// The stored search key.
    pub fn search_key(&self) -> Option<String> {
        self.shared.state.lock().key.clone()
    }

    /// Returns `true` if a filter is configured and a non-empty key is stored.
    pub fn is_filtering(&self) -> bool {
        self.shared.is_filtering(&self.shared.state.lock())
    }

    /// The host value as last supplied.
    pub fn value(&self) -> Arc<Vec<Record>> {
        Arc::clone(&self.shared.state.lock().source)
    }

    /// The visible subset the rows were last filled with.
    pub fn visible(&self) -> Arc<Vec<AnchoredRecord>> {
        Arc::clone(&self.shared.state.lock().visible)
    }

    pub fn schema(&self) -> &RowSchema {
        &self.shared.schema
    }

    pub fn signals(&self) -> &RepeaterSignals {
        &self.shared.signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sink() -> (Arc<Mutex<Vec<Vec<Record>>>>, impl Fn(Vec<Record>) + Send + Sync + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&calls);
        (calls, move |value| recorder.lock().push(value))
    }

    #[test]
    fn test_build_requires_change_handler() {
        let err = Repeater::builder().build().unwrap_err();
        assert!(matches!(err, Error::MissingChangeHandler));
    }

    #[test]
    fn test_build_fills_rows() {
        let (_, on_change) = sink();
        let repeater = Repeater::builder()
            .value(vec![json!(1), json!(2)])
            .on_change(on_change)
            .build()
            .unwrap();

        let rows = repeater.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].anchor, Some(1));
        assert_eq!(repeater.search_key(), None);
        assert!(!repeater.is_filtering());
    }

    #[tokio::test]
    async fn test_set_value_without_search_only_tracks() {
        let (calls, on_change) = sink();
        let repeater = Repeater::builder()
            .value(vec![json!(1)])
            .filter(|value, _| async move { Ok(value.to_vec()) })
            .on_change(on_change)
            .build()
            .unwrap();

        repeater.set_value(vec![json!(1), json!(2)]).await.unwrap();

        assert_eq!(repeater.value().len(), 2);
        assert_eq!(repeater.visible().len(), 2);
        assert_eq!(repeater.rows().len(), 1);
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_format_rejection_surfaces() {
        let (calls, on_change) = sink();
        let repeater = Repeater::builder()
            .value(vec![json!(1)])
            .format(|_| async { Err::<Vec<Record>, HandlerError>("bad shape".into()) })
            .on_change(on_change)
            .build()
            .unwrap();

        let err = repeater.sync().await.unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert!(err.to_string().contains("bad shape"));
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_format_applied_before_change() {
        let (calls, on_change) = sink();
        let repeater = Repeater::builder()
            .value(vec![json!(1), json!(2)])
            .format(|value| async move { Ok(value.into_iter().rev().collect()) })
            .on_change(on_change)
            .build()
            .unwrap();

        repeater.sync_and_update().await.unwrap();

        assert_eq!(*calls.lock(), vec![vec![json!(2), json!(1)]]);
    }

    #[test]
    fn test_clone_shares_engine() {
        let (_, on_change) = sink();
        let repeater = Repeater::builder().on_change(on_change).build().unwrap();
        let clone = repeater.clone();
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        clone.signals().refresh_requested.connect(move |_| *counter.lock() += 1);

        repeater.refresh();

        assert_eq!(*count.lock(), 1);
    }
}
