//! Search handling.
//!
//! A search narrows the rows shown by the repeater through the host filter.
//! The filter receives the anchored canonical collection and the search key,
//! and resolves to the visible subset. Its result is normalized so that it is
//! always an ordered sub-sequence of the canonical collection.
//!
//! Searches may overlap. Every filter run takes a [`Ticket`], and only the
//! most recently issued one is allowed to change the visible rows.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing::Instrument;

use super::anchor::into_visible_subset;
use super::record::AnchoredRecord;
use super::repeater::{Repeater, Shared};
use super::rows::RowCollection;
use crate::error::{Error, HandlerError, Result};
use lattice_repeater_core::logging::{span_names, targets};
use lattice_repeater_core::{PerfSpan, Ticket};

/// Future returned by a [`FilterFn`].
pub type FilterFuture = BoxFuture<'static, std::result::Result<Vec<AnchoredRecord>, HandlerError>>;

/// Host filter: `(anchored canonical collection, key) -> visible subset`.
pub type FilterFn = Arc<dyn Fn(Arc<Vec<AnchoredRecord>>, String) -> FilterFuture + Send + Sync>;

/// Wrap a closure returning a future into a [`FilterFn`].
pub fn filter_fn<F, Fut>(filter: F) -> FilterFn
where
    F: Fn(Arc<Vec<AnchoredRecord>>, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Vec<AnchoredRecord>, HandlerError>> + Send + 'static,
{
    Arc::new(move |value, key| filter(value, key).boxed())
}

/// Input to [`Repeater::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchInput {
    /// Run the stored key again (the empty key if none was ever entered).
    Reapply,
    /// Store and run a new key.
    Key(String),
}

impl From<&str> for SearchInput {
    fn from(key: &str) -> Self {
        SearchInput::Key(key.to_string())
    }
}

impl From<String> for SearchInput {
    fn from(key: String) -> Self {
        SearchInput::Key(key)
    }
}

impl From<Option<String>> for SearchInput {
    fn from(key: Option<String>) -> Self {
        key.map_or(SearchInput::Reapply, SearchInput::Key)
    }
}

impl From<Option<&str>> for SearchInput {
    fn from(key: Option<&str>) -> Self {
        key.map_or(SearchInput::Reapply, SearchInput::from)
    }
}

impl<C: RowCollection> Repeater<C> {
    /// Narrow the visible rows with `input`.
    ///
    /// With a filter configured and a non-empty key, the filter decides the
    /// visible rows; otherwise every row of the canonical collection is
    /// shown. The result replaces the rows of the row collection and a
    /// refresh is requested.
    ///
    /// If a newer search or refilter was started while this one awaited the
    /// filter, this one is dropped, including a filter rejection.
    pub async fn search(&self, input: impl Into<SearchInput>) -> Result<()> {
        let (key, changed, canonical, ticket) = {
            let mut state = self.shared.state.lock();
            let (key, changed) = match input.into() {
                SearchInput::Reapply => (state.key.clone().unwrap_or_default(), false),
                SearchInput::Key(key) => {
                    let changed = state.key.as_deref() != Some(key.as_str());
                    state.key = Some(key.clone());
                    (key, changed)
                }
            };
            (key, changed, Arc::clone(&state.canonical), self.shared.searches.issue())
        };
        tracing::debug!(target: targets::SEARCH, %key, %ticket, "search");

        if changed {
            self.shared.signals.search_changed.emit(key.clone());
        }

        let (visible, filtered) = match self.shared.filter.as_ref() {
            Some(filter) if !key.is_empty() => {
                match self.shared.run_filter(filter, Arc::clone(&canonical), &key).await {
                    Ok(visible) => (Arc::new(visible), true),
                    Err(_) if !self.shared.searches.is_current(ticket) => {
                        tracing::debug!(target: targets::SEARCH, %ticket, "discarding superseded filter rejection");
                        return Ok(());
                    }
                    Err(err) => return Err(err),
                }
            }
            _ => (canonical, false),
        };

        self.show(ticket, visible, filtered).await;
        Ok(())
    }

    /// Replace the visible rows if `ticket` is still the latest search.
    /// `filtered` tells whether `visible` is a filter result.
    ///
    /// Returns `false` when the resolution was superseded.
    pub(super) async fn show(
        &self,
        ticket: Ticket,
        visible: Arc<Vec<AnchoredRecord>>,
        filtered: bool,
    ) -> bool {
        let mut rows = self.rows.lock().await;
        if !self.shared.searches.is_current(ticket) {
            tracing::debug!(target: targets::SEARCH, %ticket, "discarding superseded filter result");
            return false;
        }

        {
            let mut state = self.shared.state.lock();
            state.visible = Arc::clone(&visible);
            state.filtered = filtered;
        }
        rows.update_value(visible.to_vec());
        self.shared.publish(rows.rows());
        drop(rows);

        tracing::debug!(target: targets::SEARCH, %ticket, visible = visible.len(), "visible rows replaced");
        self.refresh();
        true
    }
}

impl Shared {
    /// Run the host filter and normalize its result.
    pub(super) async fn run_filter(
        &self,
        filter: &FilterFn,
        canonical: Arc<Vec<AnchoredRecord>>,
        key: &str,
    ) -> Result<Vec<AnchoredRecord>> {
        let len = canonical.len();
        let result = filter(canonical, key.to_string())
            .instrument(PerfSpan::span(span_names::FILTER))
            .await;

        let view = result.map_err(|source| {
            tracing::warn!(target: targets::SEARCH, key, error = %source, "filter rejected search");
            Error::filter(key, source)
        })?;

        let (visible, normalized) = into_visible_subset(view, len);
        if normalized {
            tracing::warn!(
                target: targets::SEARCH,
                key,
                visible = visible.len(),
                "filter result was not an ordered subset of the collection; normalized"
            );
        }
        Ok(visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_input_conversions() {
        assert_eq!(SearchInput::from("a"), SearchInput::Key("a".into()));
        assert_eq!(SearchInput::from(String::new()), SearchInput::Key(String::new()));
        assert_eq!(SearchInput::from(None::<String>), SearchInput::Reapply);
        assert_eq!(SearchInput::from(Some("b")), SearchInput::Key("b".into()));
        assert_eq!(SearchInput::from(None::<&str>), SearchInput::Reapply);
    }
}
