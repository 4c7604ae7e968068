//! Merged document generation.

use chrono::{DateTime, Utc};
use icalendar::{Calendar, Component, EventLike, Property, ValueType};

use super::{CRLF, GENERATED_UID_SUFFIX, UID_DOMAIN_SUFFIX, UTC_FORMAT};
use crate::event::BookingEvent;
use crate::identity::UidGenerator;

const PRODID_LINE: &str = "PRODID:-//calmerge//Merged bookings//EN";

/// Settings for one export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Written as `X-WR-CALNAME` when set.
    pub calendar_name: Option<String>,
    /// DTSTAMP of every event. Fixed per export so output is deterministic.
    pub generated_at: DateTime<Utc>,
    /// Emit whole-day events as `VALUE=DATE` instead of UTC timestamps.
    pub all_day_as_date: bool,
}

impl ExportOptions {
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        ExportOptions {
            calendar_name: None,
            generated_at,
            all_day_as_date: false,
        }
    }

    pub fn with_calendar_name(mut self, name: impl Into<String>) -> Self {
        self.calendar_name = Some(name.into());
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions::new(Utc::now())
    }
}

/// Serialize events into one calendar document, one VEVENT per event, in
/// input order.
///
/// Feed UIDs carry [`UID_DOMAIN_SUFFIX`]. Events without one get a fresh UID
/// from `uids` marked with [`GENERATED_UID_SUFFIX`]. Lines end with CRLF.
pub fn export_calendar(
    events: &[BookingEvent],
    options: &ExportOptions,
    uids: &mut dyn UidGenerator,
) -> String {
    let mut cal = Calendar::new();

    if let Some(ref name) = options.calendar_name {
        cal.append_property(Property::new("X-WR-CALNAME", single_line(name)));
    }

    let dtstamp = options.generated_at.format(UTC_FORMAT).to_string();

    for event in events {
        let uid = match event.uid() {
            Some(uid) => format!("{uid}{UID_DOMAIN_SUFFIX}"),
            None => format!("{}{GENERATED_UID_SUFFIX}", uids.next_uid()),
        };

        let mut ics_event = icalendar::Event::new();
        ics_event.uid(&uid);
        ics_event.add_property("DTSTAMP", &dtstamp);

        let as_date = options.all_day_as_date && event.is_all_day();
        add_instant_property(&mut ics_event, "DTSTART", event.start(), as_date);
        add_instant_property(&mut ics_event, "DTEND", event.end(), as_date);

        ics_event.summary(&single_line(event.title()));
        ics_event.description(&format!("Source: {}", single_line(event.source_name())));

        cal.push(ics_event.done());
    }

    let cal = cal.done();
    tracing::debug!(events = events.len(), "exported merged calendar");

    normalize_lines(&cal.to_string())
}

/// Write a start/end instant: compact UTC form, or a bare date.
fn add_instant_property(
    ics_event: &mut icalendar::Event,
    name: &str,
    instant: DateTime<Utc>,
    as_date: bool,
) {
    if as_date {
        let mut prop = Property::new(name, instant.format("%Y%m%d").to_string());
        prop.append_parameter(ValueType::Date);
        ics_event.append_property(prop);
    } else {
        ics_event.add_property(name, instant.format(UTC_FORMAT).to_string());
    }
}

/// Collapse embedded line breaks into spaces.
fn single_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Clean up output from the icalendar crate
/// - Replace PRODID with our own
/// - Remove CALSCALE:GREGORIAN (it's the default)
/// - Terminate every line, folded continuations included, with CRLF
fn normalize_lines(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.is_empty() {
            continue;
        }

        if line.starts_with("PRODID:") {
            result.push_str(PRODID_LINE);
            result.push_str(CRLF);
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        result.push_str(line);
        result.push_str(CRLF);
    }

    result
}
