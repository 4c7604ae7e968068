//! iCalendar feed parsing and merged document generation (RFC 5545).

mod generate;
mod parse;

pub use generate::{ExportOptions, export_calendar};
pub use parse::{parse_calendar_name, parse_feed};

/// Suffix appended to exported feed UIDs. Stripped again on parse, so an
/// exported document re-imported as an upload dedupes against live feeds.
pub const UID_DOMAIN_SUFFIX: &str = "@calmerge";

/// Suffix of UIDs the exporter made up for events that had none. Such a UID
/// reads back as absent, so the event dedupes by title and times again.
pub const GENERATED_UID_SUFFIX: &str = "@generated.calmerge";

/// Media type of exported documents.
pub const ICS_MEDIA_TYPE: &str = "text/calendar";

/// File extension of exported documents.
pub const ICS_FILE_EXTENSION: &str = "ics";

/// Line break required between content lines.
pub(crate) const CRLF: &str = "\r\n";

/// Compact UTC timestamp form, e.g. `20240601T140000Z`.
pub(crate) const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedupe::dedupe;
    use crate::identity::SequentialUidGenerator;
    use crate::source::{Source, SourceId, SourceKind};
    use chrono::{TimeZone, Utc};

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Airbnb Inc//Hosting Calendar 1.0//EN\r\n\
BEGIN:VEVENT\r\n\
UID:1418fb94e984-8c2b@airbnb.com\r\n\
DTSTART;VALUE=DATE:20240601\r\n\
DTEND;VALUE=DATE:20240604\r\n\
SUMMARY:Reserved\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:1418fb94e984-8c2b@airbnb.com\r\n\
DTSTART;VALUE=DATE:20240601\r\n\
DTEND;VALUE=DATE:20240604\r\n\
SUMMARY:Reserved (refetched)\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20240610T150000Z\r\n\
DTEND:20240612T100000Z\r\n\
SUMMARY:Owner stay\\, family\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20240610T150000Z\r\n\
DTEND:20240612T100000Z\r\n\
SUMMARY:Owner stay\\, family\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:blocked-2\r\n\
DTSTART;TZID=America/New_York:20240620T100000\r\n\
DURATION:PT4H\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn source() -> Source {
        Source::new(SourceId::new("airbnb-1"), "Airbnb", SourceKind::Airbnb)
    }

    /// (uid, start, end, title) for every event
    fn fingerprint(events: &[crate::BookingEvent]) -> Vec<(Option<String>, String, String, String)> {
        events
            .iter()
            .map(|e| {
                (
                    e.uid().map(str::to_string),
                    e.start().to_rfc3339(),
                    e.end().to_rfc3339(),
                    e.title().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_export_then_parse_roundtrip() {
        let mut uids = SequentialUidGenerator::new("parse");
        let merged = dedupe(parse_feed(FEED, &source(), &mut uids).unwrap());
        assert_eq!(merged.len(), 3, "duplicate UID and duplicate fallback key should collapse");

        let options = ExportOptions::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let mut export_uids = SequentialUidGenerator::new("export");
        let document = export_calendar(&merged, &options, &mut export_uids);

        let reparsed = parse_feed(&document, &source(), &mut uids).unwrap();
        assert_eq!(reparsed.len(), merged.len());

        let expected = fingerprint(&merged);
        let actual = fingerprint(&reparsed);
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_roundtrip_preserves_escaped_title() {
        let mut uids = SequentialUidGenerator::new("parse");
        let merged = dedupe(parse_feed(FEED, &source(), &mut uids).unwrap());
        let options = ExportOptions::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let document = export_calendar(&merged, &options, &mut uids);

        let reparsed = parse_feed(&document, &source(), &mut uids).unwrap();
        assert!(
            reparsed.iter().any(|e| e.title() == "Owner stay, family"),
            "Escaped comma should survive export and re-parse. Document:\n{}",
            document
        );
    }

    #[test]
    fn test_roundtrip_preserves_backslash_in_title() {
        let event = crate::BookingEvent::new(
            "b",
            r"back\slash C:\Notes",
            Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap(),
            &source(),
        )
        .with_uid(Some(r"id\1".to_string()));

        let options = ExportOptions::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let mut uids = SequentialUidGenerator::new("rt");
        let document = export_calendar(std::slice::from_ref(&event), &options, &mut uids);
        let reparsed = parse_feed(&document, &source(), &mut uids).unwrap();

        assert_eq!(reparsed[0].title(), r"back\slash C:\Notes", "Document:\n{}", document);
        assert_eq!(reparsed[0].uid(), Some(r"id\1"));
    }
}
