//! Feed parsing using the icalendar crate's parser.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use icalendar::parser::{Component, Property, read_calendar, unfold};

use super::{GENERATED_UID_SUFFIX, UID_DOMAIN_SUFFIX};
use crate::error::{FeedError, FeedResult};
use crate::event::{BookingEvent, EventTime, RawEventFields};
use crate::identity::UidGenerator;
use crate::source::Source;

/// Parse one raw feed into booking events stamped with `source`.
///
/// A document with no VEVENT blocks yields an empty list. Any malformed
/// structure, malformed date/time, or event without DTSTART rejects the
/// whole document. `uids` is only consulted for events without a UID.
pub fn parse_feed(
    content: &str,
    source: &Source,
    uids: &mut dyn UidGenerator,
) -> FeedResult<Vec<BookingEvent>> {
    let body = check_envelope(content)?;
    let unfolded = unfold(body);
    let calendar = read_calendar(&unfolded).map_err(|e| FeedError::Parse(e.to_string()))?;

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    let mut events = Vec::with_capacity(vevents.len());
    let mut cancelled = 0;
    for vevent in vevents {
        let fields = read_fields(vevent)?;
        if fields.cancelled {
            cancelled += 1;
            continue;
        }
        let instance_id = match &fields.uid {
            Some(uid) if !uid.trim().is_empty() => uid.clone(),
            _ => uids.next_uid(),
        };
        events.push(fields.resolve(instance_id, source)?);
    }

    tracing::debug!(
        source = %source.id,
        events = events.len(),
        cancelled,
        "parsed feed"
    );

    Ok(events)
}

/// Read the calendar-level `X-WR-CALNAME`, if the document has one.
pub fn parse_calendar_name(content: &str) -> Option<String> {
    let body = check_envelope(content).ok()?;
    let unfolded = unfold(body);
    let calendar = read_calendar(&unfolded).ok()?;

    calendar
        .properties
        .iter()
        .find(|p| p.name.as_ref().eq_ignore_ascii_case("X-WR-CALNAME"))
        .map(|p| p.val.as_ref().trim().to_string())
        .filter(|name| !name.is_empty())
}

/// The document must be wrapped in BEGIN:VCALENDAR / END:VCALENDAR.
/// Returns the body with any byte-order mark and outer whitespace removed.
fn check_envelope(content: &str) -> FeedResult<&str> {
    let body = content.trim_start_matches('\u{feff}').trim();

    let first = body.lines().next().unwrap_or_default().trim_end();
    if !first.eq_ignore_ascii_case("BEGIN:VCALENDAR") {
        return Err(FeedError::Parse(
            "document does not start with BEGIN:VCALENDAR".into(),
        ));
    }

    let last = body.lines().last().unwrap_or_default().trim_end();
    if !last.eq_ignore_ascii_case("END:VCALENDAR") {
        return Err(FeedError::Parse(
            "document is truncated, missing END:VCALENDAR".into(),
        ));
    }

    Ok(body)
}

/// Gather VEVENT components, looking through a VCALENDAR wrapper if the
/// parser kept one.
fn collect_vevents<'c, 'a>(components: &'c [Component<'a>], out: &mut Vec<&'c Component<'a>>) {
    for component in components {
        let name = component.name.as_ref();
        if name.eq_ignore_ascii_case("VEVENT") {
            out.push(component);
        } else if name.eq_ignore_ascii_case("VCALENDAR") {
            collect_vevents(&component.components, out);
        }
    }
}

fn read_fields(vevent: &Component) -> FeedResult<RawEventFields> {
    // TEXT values arrive unescaped from the icalendar parser
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.as_ref().trim())
        .filter(|uid| !uid.ends_with(GENERATED_UID_SUFFIX))
        .map(|uid| uid.strip_suffix(UID_DOMAIN_SUFFIX).unwrap_or(uid).to_string());

    let summary = vevent.find_prop("SUMMARY").map(|p| p.val.to_string());

    let start = vevent.find_prop("DTSTART").map(parse_date_time).transpose()?;
    let end = vevent.find_prop("DTEND").map(parse_date_time).transpose()?;
    let duration = vevent
        .find_prop("DURATION")
        .and_then(|p| parse_duration(p.val.as_ref()));

    let cancelled = vevent
        .find_prop("STATUS")
        .is_some_and(|p| p.val.as_ref().trim().eq_ignore_ascii_case("CANCELLED"));

    Ok(RawEventFields {
        uid,
        summary,
        start,
        end,
        duration,
        cancelled,
    })
}

fn param_value(prop: &Property, key: &str) -> Option<String> {
    prop.params
        .iter()
        .find(|p| p.key.as_ref().eq_ignore_ascii_case(key))
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()))
}

/// Parse a DTSTART/DTEND property.
///
/// Handles:
/// - VALUE=DATE, or a bare 8-digit value: `DTSTART;VALUE=DATE:20240601`
/// - UTC: `DTSTART:20240601T140000Z`
/// - TZID parameter: `DTSTART;TZID=Europe/Paris:20240601T160000`
/// - Floating: `DTSTART:20240601T140000`
///
/// Decoded by hand rather than through `DatePerhapsTime::try_from`, so a
/// malformed value rejects the document with its own message instead of
/// reading as a missing one, and unknown TZIDs are kept for a UTC fallback.
fn parse_date_time(prop: &Property) -> FeedResult<EventTime> {
    let value = prop.val.as_ref().trim();
    let malformed = || {
        FeedError::Parse(format!(
            "malformed {} value '{}'",
            prop.name.as_ref(),
            value
        ))
    };

    let is_date = param_value(prop, "VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
        || (value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()));

    if is_date {
        return NaiveDate::parse_from_str(value, "%Y%m%d")
            .map(EventTime::Date)
            .map_err(|_| malformed());
    }

    if let Some(utc) = value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        return parse_naive(utc)
            .map(|dt| EventTime::DateTimeUtc(dt.and_utc()))
            .ok_or_else(malformed);
    }

    let datetime = parse_naive(value).ok_or_else(malformed)?;
    match param_value(prop, "TZID") {
        Some(tzid) => Ok(EventTime::DateTimeZoned { datetime, tzid }),
        None => Ok(EventTime::DateTimeFloating(datetime)),
    }
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()
}

/// Parse a DURATION value (`PT4H`, `P2D`, ...). Negative or unparsable
/// durations are ignored, leaving the end to default to the start.
fn parse_duration(value: &str) -> Option<TimeDelta> {
    let value = value.trim();
    if value.starts_with('-') {
        tracing::warn!(duration = value, "ignoring negative DURATION");
        return None;
    }

    match iso8601::duration(value.trim_start_matches('+')) {
        Ok(duration) => {
            let std_duration: std::time::Duration = duration.into();
            TimeDelta::from_std(std_duration).ok()
        }
        Err(e) => {
            tracing::warn!(duration = value, error = %e, "ignoring unparsable DURATION");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DEFAULT_TITLE;
    use crate::identity::SequentialUidGenerator;
    use crate::source::{SourceId, SourceKind};
    use chrono::{TimeZone, Utc};

    fn source() -> Source {
        Source::new(SourceId::new("vrbo-7"), "Vrbo - Cabin", SourceKind::Vrbo)
    }

    fn parse(ics: &str) -> FeedResult<Vec<BookingEvent>> {
        parse_feed(ics, &source(), &mut SequentialUidGenerator::new("gen"))
    }

    #[test]
    fn test_parse_timed_event() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:booking-1
SUMMARY:Guest A
DTSTART:20240601T140000Z
DTEND:20240603T100000Z
END:VEVENT
END:VCALENDAR"#;

        let events = parse(ics).expect("Should parse");
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.uid(), Some("booking-1"));
        assert_eq!(event.instance_id(), "booking-1");
        assert_eq!(event.title(), "Guest A");
        assert_eq!(event.start(), Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap());
        assert_eq!(event.end(), Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap());
        assert!(!event.is_all_day());
        assert_eq!(event.source_id().as_str(), "vrbo-7");
        assert_eq!(event.source_name(), "Vrbo - Cabin");
    }

    #[test]
    fn test_parse_empty_calendar_is_not_an_error() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:TEST\r\nEND:VCALENDAR\r\n";

        let events = parse(ics).expect("Empty calendar should parse");
        assert!(events.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_calendar_text() {
        let err = parse("<html><body>502 Bad Gateway</body></html>").unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)), "got {:?}", err);
    }

    #[test]
    fn test_parse_rejects_truncated_document() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:x\r\nDTSTART:20240601T140000Z\r\n";

        let err = parse(ics).unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)), "got {:?}", err);
    }

    #[test]
    fn test_missing_dtstart_rejects_whole_document() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:good
DTSTART:20240601T140000Z
DTEND:20240603T100000Z
END:VEVENT
BEGIN:VEVENT
UID:bad
SUMMARY:No start
END:VEVENT
END:VCALENDAR"#;

        let err = parse(ics).unwrap_err();
        match err {
            FeedError::Parse(msg) => assert!(msg.contains("bad"), "message should name the event: {}", msg),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_date_rejects_document() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:x
DTSTART:2024-06-01 14:00
END:VEVENT
END:VCALENDAR"#;

        let err = parse(ics).unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)), "got {:?}", err);
    }

    #[test]
    fn test_parse_all_day_event() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:stay
DTSTART;VALUE=DATE:20240601
DTEND;VALUE=DATE:20240605
SUMMARY:Reserved
END:VEVENT
END:VCALENDAR"#;

        let events = parse(ics).unwrap();
        assert!(events[0].is_all_day());
        assert_eq!(events[0].start(), Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(events[0].end(), Utc.with_ymd_and_hms(2024, 6, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_bare_eight_digit_value_is_a_date() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:stay
DTSTART:20240601
DTEND:20240602
END:VEVENT
END:VCALENDAR"#;

        let events = parse(ics).unwrap();
        assert!(events[0].is_all_day());
    }

    #[test]
    fn test_missing_uid_and_title_get_defaults() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
DTSTART:20240601T140000Z
DTEND:20240603T100000Z
END:VEVENT
BEGIN:VEVENT
DTSTART:20240601T140000Z
DTEND:20240603T100000Z
SUMMARY:   
END:VEVENT
END:VCALENDAR"#;

        let events = parse(ics).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.uid().is_none()));
        assert!(events.iter().all(|e| e.title() == DEFAULT_TITLE));
        assert_eq!(events[0].instance_id(), "gen-1");
        assert_eq!(events[1].instance_id(), "gen-2");
    }

    #[test]
    fn test_missing_end_defaults_to_start() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:point
DTSTART:20240601T140000Z
END:VEVENT
END:VCALENDAR"#;

        let events = parse(ics).unwrap();
        assert_eq!(events[0].start(), events[0].end());
    }

    #[test]
    fn test_duration_fills_missing_end() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:d
DTSTART:20240601T140000Z
DURATION:P2DT2H
END:VEVENT
END:VCALENDAR"#;

        let events = parse(ics).unwrap();
        assert_eq!(events[0].end(), Utc.with_ymd_and_hms(2024, 6, 3, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_tzid_value_is_normalized_to_utc() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:ny
DTSTART;TZID=America/New_York:20240601T100000
DTEND;TZID=America/New_York:20240601T120000
END:VEVENT
END:VCALENDAR"#;

        let events = parse(ics).unwrap();
        assert_eq!(events[0].start(), Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap());
        assert_eq!(events[0].end(), Utc.with_ymd_and_hms(2024, 6, 1, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_cancelled_events_are_skipped() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:kept
DTSTART:20240601T140000Z
DTEND:20240603T100000Z
END:VEVENT
BEGIN:VEVENT
UID:gone
STATUS:CANCELLED
DTSTART:20240601T140000Z
DTEND:20240603T100000Z
END:VEVENT
END:VCALENDAR"#;

        let events = parse(ics).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid(), Some("kept"));
    }

    #[test]
    fn test_parse_line_folding_and_escapes() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:folded\r\n\
SUMMARY:Smith\\, John \r\n (2 guests)\\; late arrival\r\n\
DTSTART:20240101T100000Z\r\n\
DTEND:20240101T110000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR";

        let events = parse(ics).unwrap();
        assert_eq!(events[0].title(), "Smith, John (2 guests); late arrival");
    }

    #[test]
    fn test_export_suffix_is_stripped_from_uid() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:booking-1@calmerge
DTSTART:20240601T140000Z
DTEND:20240603T100000Z
END:VEVENT
END:VCALENDAR"#;

        let events = parse(ics).unwrap();
        assert_eq!(events[0].uid(), Some("booking-1"));
    }

    #[test]
    fn test_parse_calendar_name() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nX-WR-CALNAME:Lake House\\, bookings\r\nEND:VCALENDAR\r\n";
        assert_eq!(parse_calendar_name(ics).as_deref(), Some("Lake House, bookings"));

        let unnamed = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n";
        assert_eq!(parse_calendar_name(unnamed), None);
    }

    #[test]
    fn test_backslash_in_title_is_unescaped_once() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:notes\\\\1\r\n\
SUMMARY:Path C:\\\\Notes\r\n\
DTSTART:20240101T100000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse(ics).unwrap();
        assert_eq!(events[0].title(), r"Path C:\Notes");
        assert_eq!(events[0].uid(), Some(r"notes\1"));
    }

    #[test]
    fn test_generated_export_uid_reads_as_absent() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:gen-1@generated.calmerge
SUMMARY:Blocked
DTSTART:20240601T140000Z
DTEND:20240603T100000Z
END:VEVENT
END:VCALENDAR"#;

        let events = parse(ics).unwrap();
        assert_eq!(events[0].uid(), None);
    }

    #[test]
    fn test_out_of_range_duration_is_ignored() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:forever
DTSTART:20240601T140000Z
DURATION:P300000Y
END:VEVENT
END:VCALENDAR"#;

        let events = parse(ics).expect("Huge DURATION must not reject or panic");
        assert_eq!(events[0].end(), events[0].start());
    }
}
