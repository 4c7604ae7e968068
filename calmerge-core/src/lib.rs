//! Merge engine for booking calendar feeds.
//!
//! Takes N independently hosted iCalendar feeds and produces one
//! deduplicated, time-ordered event set, the overlapping pairs within it,
//! and a re-exportable calendar document:
//! - `ics` parses feeds into [`BookingEvent`]s and exports the merged set
//! - `dedupe` collapses events that describe the same booking
//! - `conflict` finds candidate double-bookings
//! - `merge` runs the whole pipeline over many sources, isolating failures
//!
//! Everything except the retrieval fan-out in [`merge::merge`] is a pure,
//! synchronous function of its inputs.

pub mod conflict;
pub mod dedupe;
pub mod error;
pub mod event;
pub mod ics;
pub mod identity;
pub mod merge;
pub mod source;

pub use conflict::{ConflictPair, detect_conflicts};
pub use dedupe::{DedupKey, dedupe};
pub use error::{FeedError, FeedResult};
pub use event::{BookingEvent, EventTime, RawEventFields};
pub use ics::{ExportOptions, export_calendar, parse_calendar_name, parse_feed};
pub use identity::{RandomUidGenerator, SequentialUidGenerator, UidGenerator};
pub use merge::{FeedInput, Fetcher, MergeResult, SourceFailure, merge, merge_fetched, merge_incremental};
pub use source::{Source, SourceId, SourceKind};
