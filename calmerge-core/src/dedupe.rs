//! Identity resolution: collapse events that describe the same booking.

use std::collections::HashSet;

use crate::event::BookingEvent;

/// Identity an event is deduplicated under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// Feed-supplied UID.
    Uid(String),
    /// Title, start and end, for events without a usable UID.
    Fallback(String),
}

impl DedupKey {
    pub fn of(event: &BookingEvent) -> Self {
        match event.uid().filter(|uid| !uid.is_empty()) {
            Some(uid) => DedupKey::Uid(uid.to_string()),
            None => DedupKey::Fallback(event.fallback_key()),
        }
    }
}

/// Keep the first event seen for each [`DedupKey`], in input order.
///
/// Later duplicates are dropped whole; their attributes are never merged into
/// the survivor. Stateless: callers that append events (an upload, say) must
/// pass the full combined set again.
pub fn dedupe(events: Vec<BookingEvent>) -> Vec<BookingEvent> {
    let total = events.len();
    let mut seen = HashSet::with_capacity(total);

    let unique: Vec<BookingEvent> = events
        .into_iter()
        .filter(|event| seen.insert(DedupKey::of(event)))
        .collect();

    tracing::debug!(total, unique = unique.len(), "deduplicated events");
    unique
}
