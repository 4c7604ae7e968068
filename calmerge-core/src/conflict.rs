//! Interval conflict detection: candidate double-bookings.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::BookingEvent;

/// Two events whose time ranges overlap.
///
/// Both sides borrow from the deduplicated event set, so a pair can never
/// drift from the events it refers to. `earlier` never starts after `later`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConflictPair<'a> {
    pub earlier: &'a BookingEvent,
    pub later: &'a BookingEvent,
}

impl ConflictPair<'_> {
    /// The shared time range.
    pub fn overlap(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.later.start(), self.earlier.end().min(self.later.end()))
    }

    pub fn is_cross_source(&self) -> bool {
        self.earlier.source_id() != self.later.source_id()
    }
}

/// Find every overlapping pair of events, regardless of source.
///
/// Sweep over a start-sorted copy: for each event, scan forward while the
/// next event starts before this one ends, then stop. The stop condition is
/// evaluated afresh for every event, since each has its own end. Intervals are
/// half-open, so back-to-back bookings (checkout 11:00, checkin 11:00) are not
/// conflicts, and a zero-length event only conflicts when it falls strictly
/// inside another event.
///
/// Worst case O(n²) when everything overlaps everything.
pub fn detect_conflicts(events: &[BookingEvent]) -> Vec<ConflictPair<'_>> {
    let mut sorted: Vec<&BookingEvent> = events.iter().collect();
    sorted.sort_by_key(|event| event.start());

    let mut pairs = Vec::new();
    for (i, &earlier) in sorted.iter().enumerate() {
        for &later in &sorted[i + 1..] {
            if later.start() >= earlier.end() {
                break;
            }
            if earlier.overlaps(later) {
                pairs.push(ConflictPair { earlier, later });
            }
        }
    }

    tracing::debug!(events = events.len(), conflicts = pairs.len(), "detected conflicts");
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Source, SourceId, SourceKind};
    use chrono::{TimeDelta, TimeZone};

    fn source(id: &str) -> Source {
        Source::new(SourceId::new(id), id, SourceKind::Other)
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    fn booking(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> BookingEvent {
        BookingEvent::new(title, title, start, end, &source("s"))
    }

    fn titles<'a>(pairs: &[ConflictPair<'a>]) -> Vec<(&'a str, &'a str)> {
        pairs
            .iter()
            .map(|p| (p.earlier.title(), p.later.title()))
            .collect()
    }

    #[test]
    fn test_guest_a_guest_b_scenario() {
        let guest_a = BookingEvent::new("a", "Guest A", at(1, 14), at(3, 10), &source("feed-a"));
        let guest_b = BookingEvent::new("b", "Guest B", at(2, 14), at(5, 10), &source("feed-b"));
        let events = vec![guest_b, guest_a];

        let pairs = detect_conflicts(&events);
        assert_eq!(titles(&pairs), vec![("Guest A", "Guest B")]);
        assert!(pairs[0].is_cross_source());
        assert_eq!(pairs[0].overlap(), (at(2, 14), at(3, 10)));
    }

    #[test]
    fn test_back_to_back_is_not_a_conflict() {
        let events = vec![booking("Morning", at(1, 9), at(1, 11)), booking("Noon", at(1, 11), at(1, 13))];

        assert!(detect_conflicts(&events).is_empty());
    }

    #[test]
    fn test_zero_duration_event_conflicts_only_strictly_inside() {
        let events = vec![
            booking("Stay", at(1, 9), at(3, 11)),
            booking("Instant", at(2, 9), at(2, 9)),
            booking("Instant at start", at(1, 9), at(1, 9)),
            booking("Instant at end", at(3, 11), at(3, 11)),
        ];

        let pairs = detect_conflicts(&events);
        assert_eq!(titles(&pairs), vec![("Stay", "Instant")]);
    }

    #[test]
    fn test_long_event_conflicts_past_short_neighbors() {
        // The short event ending early must not stop the long event's scan
        let events = vec![
            booking("Long", at(1, 0), at(10, 0)),
            booking("Short", at(2, 0), at(2, 1)),
            booking("Late", at(5, 0), at(6, 0)),
        ];

        let pairs = detect_conflicts(&events);
        assert_eq!(titles(&pairs), vec![("Long", "Short"), ("Long", "Late")]);
    }

    #[test]
    fn test_same_source_overlaps_are_reported() {
        let events = vec![booking("One", at(1, 0), at(3, 0)), booking("Two", at(2, 0), at(4, 0))];

        let pairs = detect_conflicts(&events);
        assert_eq!(pairs.len(), 1);
        assert!(!pairs[0].is_cross_source());
    }

    #[test]
    fn test_matches_pairwise_oracle() {
        // Deterministic pseudo-random intervals, including zero-length and shared starts
        let mut events = Vec::new();
        let mut seed: u64 = 42;
        for n in 0..60 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let start = at(1, 0) + TimeDelta::hours((seed >> 33) as i64 % 200);
            let length = TimeDelta::hours((seed >> 17) as i64 % 30);
            events.push(booking(&format!("e{n}"), start, start + length));
        }

        let pairs = detect_conflicts(&events);

        let mut expected = 0;
        for (i, a) in events.iter().enumerate() {
            for b in &events[i + 1..] {
                if a.start() < b.end() && b.start() < a.end() {
                    expected += 1;
                    let found = pairs
                        .iter()
                        .filter(|p| {
                            (std::ptr::eq(p.earlier, a) && std::ptr::eq(p.later, b))
                                || (std::ptr::eq(p.earlier, b) && std::ptr::eq(p.later, a))
                        })
                        .count();
                    assert_eq!(found, 1, "{} / {} should appear exactly once", a.title(), b.title());
                }
            }
        }
        assert_eq!(pairs.len(), expected, "no non-overlapping pair may be reported");
        assert!(pairs.iter().all(|p| p.earlier.start() <= p.later.start()));
    }

    #[test]
    fn test_output_follows_start_order() {
        let events = vec![
            booking("C", at(5, 0), at(7, 0)),
            booking("A", at(1, 0), at(3, 0)),
            booking("D", at(6, 0), at(8, 0)),
            booking("B", at(2, 0), at(4, 0)),
        ];

        let pairs = detect_conflicts(&events);
        assert_eq!(titles(&pairs), vec![("A", "B"), ("C", "D")]);
    }
}
