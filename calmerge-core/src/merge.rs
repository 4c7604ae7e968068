//! Merge orchestration: retrieve, parse, dedupe and sort across sources.
//!
//! Failures are source-scoped. A source whose retrieval or parse fails
//! contributes no events and shows up in [`MergeResult::failures`]; the
//! other sources are merged regardless. Nothing here returns `Err`.

use std::future::Future;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use tokio::task::JoinSet;

use crate::conflict::{ConflictPair, detect_conflicts};
use crate::dedupe::dedupe;
use crate::error::{FeedError, FeedResult};
use crate::event::BookingEvent;
use crate::ics::{ExportOptions, export_calendar, parse_feed};
use crate::identity::UidGenerator;
use crate::source::{Source, SourceId};

/// Retrieval collaborator: turns a locator into raw calendar text.
///
/// Transport, proxying, retries and timeouts are the implementor's business.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, locator: &str) -> impl Future<Output = FeedResult<String>> + Send;
}

/// What the orchestrator gets for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedInput {
    /// Fetch the document from this locator.
    Locator(String),
    /// Already-retrieved text, e.g. an uploaded file.
    Text(String),
}

/// A source that contributed nothing to the merge, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source_id: SourceId,
    pub source_name: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: FeedError,
}

impl std::fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source_name, self.error)
    }
}

fn serialize_display<S: Serializer>(error: &FeedError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Deduplicated events in ascending start order, plus per-source failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeResult {
    pub events: Vec<BookingEvent>,
    pub failures: Vec<SourceFailure>,
}

impl MergeResult {
    /// True when every source contributed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Candidate double-bookings among the merged events.
    pub fn conflicts(&self) -> Vec<ConflictPair<'_>> {
        detect_conflicts(&self.events)
    }

    /// Fold a freshly parsed standalone sequence (an upload) into this result.
    pub fn with_upload(mut self, fresh: Vec<BookingEvent>) -> Self {
        self.events = merge_incremental(self.events, fresh);
        self
    }

    /// Render the merged events as a calendar document.
    pub fn export(&self, options: &ExportOptions, uids: &mut dyn UidGenerator) -> String {
        export_calendar(&self.events, options, uids)
    }
}

/// Merge every source: fetch locators concurrently, then parse, dedupe and
/// sort in input order.
///
/// Fetch completion order has no effect on the result. A fetch task that
/// panics is recorded as a network failure for its source.
pub async fn merge<F: Fetcher>(
    inputs: Vec<(Source, FeedInput)>,
    fetcher: Arc<F>,
    uids: &mut dyn UidGenerator,
) -> MergeResult {
    let mut outcomes: Vec<Option<FeedResult<String>>> = Vec::with_capacity(inputs.len());
    let mut sources = Vec::with_capacity(inputs.len());
    let mut fetches = JoinSet::new();

    for (index, (source, input)) in inputs.into_iter().enumerate() {
        match input {
            FeedInput::Text(text) => outcomes.push(Some(Ok(text))),
            FeedInput::Locator(locator) => {
                outcomes.push(None);
                let fetcher = Arc::clone(&fetcher);
                fetches.spawn(async move { (index, fetcher.fetch(&locator).await) });
            }
        }
        sources.push(source);
    }

    while let Some(joined) = fetches.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = Some(outcome),
            Err(e) => tracing::warn!(error = %e, "fetch task did not complete"),
        }
    }

    let fetched = sources
        .into_iter()
        .zip(outcomes)
        .map(|(source, outcome)| {
            let outcome = outcome.unwrap_or_else(|| {
                Err(FeedError::Network("retrieval was abandoned".into()))
            });
            (source, outcome)
        })
        .collect();

    merge_fetched(fetched, uids)
}

/// Merge already-retrieved outcomes. The synchronous half of [`merge`].
pub fn merge_fetched(
    outcomes: Vec<(Source, FeedResult<String>)>,
    uids: &mut dyn UidGenerator,
) -> MergeResult {
    let mut combined = Vec::new();
    let mut failures = Vec::new();

    for (source, outcome) in outcomes {
        match outcome.and_then(|text| parse_feed(&text, &source, uids)) {
            Ok(events) => combined.extend(events),
            Err(error) => {
                tracing::warn!(source = %source.id, name = %source.name, %error, "source skipped");
                failures.push(SourceFailure {
                    source_id: source.id,
                    source_name: source.name,
                    error,
                });
            }
        }
    }

    let mut events = dedupe(combined);
    sort_events(&mut events);

    tracing::debug!(
        events = events.len(),
        failures = failures.len(),
        "merge finished"
    );

    MergeResult { events, failures }
}

/// Re-deduplicate a previous merge together with a fresh sequence.
///
/// Previously merged events come first, so an already known booking keeps
/// its existing attributes.
pub fn merge_incremental(previous: Vec<BookingEvent>, fresh: Vec<BookingEvent>) -> Vec<BookingEvent> {
    let mut combined = previous;
    combined.extend(fresh);

    let mut events = dedupe(combined);
    sort_events(&mut events);
    events
}

/// Ascending start; ties by UID (events without one first), then title.
pub fn sort_events(events: &mut [BookingEvent]) {
    events.sort_by(|a, b| {
        a.start()
            .cmp(&b.start())
            .then_with(|| a.uid().cmp(&b.uid()))
            .then_with(|| a.title().cmp(b.title()))
    });
}
