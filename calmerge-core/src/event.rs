//! Booking event types.
//!
//! Feed entries are first read into [`RawEventFields`], where every field is
//! optional, and then resolved into a canonical [`BookingEvent`] by explicit
//! default-filling rules. A `BookingEvent` is a value object: it is never
//! mutated after creation and always satisfies `start <= end`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FeedError, FeedResult};
use crate::source::{Source, SourceId};

/// Title used when a feed entry has no (or an empty) SUMMARY.
pub const DEFAULT_TITLE: &str = "Reserved";

/// Separator for fallback identity keys. A control character, so it never
/// shows up in a title.
const FALLBACK_KEY_SEPARATOR: char = '\u{1f}';

/// A date/time value as it appears in a feed, before UTC normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTime {
    /// Date-only value (`VALUE=DATE`), a whole-day record.
    Date(NaiveDate),
    /// UTC datetime (`...Z`).
    DateTimeUtc(DateTime<Utc>),
    /// Floating datetime without zone; read as UTC.
    DateTimeFloating(NaiveDateTime),
    /// Datetime qualified by a `TZID` parameter.
    DateTimeZoned {
        datetime: NaiveDateTime,
        tzid: String,
    },
}

impl EventTime {
    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Normalize to an absolute UTC instant.
    ///
    /// Dates become midnight UTC. Zoned values are resolved when the TZID
    /// names an IANA zone; anything else is read as UTC wall-clock time.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::Date(d) => d.and_time(NaiveTime::MIN).and_utc(),
            EventTime::DateTimeUtc(dt) => *dt,
            EventTime::DateTimeFloating(dt) => dt.and_utc(),
            EventTime::DateTimeZoned { datetime, tzid } => {
                let name = tzid.trim_matches('"').trim_start_matches('/');
                match name.parse::<chrono_tz::Tz>() {
                    Ok(tz) => match tz.from_local_datetime(datetime).earliest() {
                        Some(local) => local.with_timezone(&Utc),
                        None => {
                            tracing::warn!(%tzid, %datetime, "local time does not exist in zone, reading as UTC");
                            datetime.and_utc()
                        }
                    },
                    Err(_) => {
                        tracing::warn!(%tzid, "unknown TZID, reading as UTC");
                        datetime.and_utc()
                    }
                }
            }
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}

/// The fields of one feed entry, exactly as found. Nothing is defaulted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEventFields {
    pub uid: Option<String>,
    pub summary: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    /// DURATION, used only when DTEND is absent.
    pub duration: Option<TimeDelta>,
    pub cancelled: bool,
}

impl RawEventFields {
    /// Resolve into a canonical event for `source`.
    ///
    /// - a missing start is a parse error
    /// - a missing or empty title becomes [`DEFAULT_TITLE`]
    /// - a missing end becomes `start + duration`, else `start`; a duration
    ///   past the representable range is ignored
    /// - date-only starts mark the event all-day, both ends on day boundaries
    /// - an end before the start is clamped to the start
    pub fn resolve(self, instance_id: String, source: &Source) -> FeedResult<BookingEvent> {
        let start_time = self.start.ok_or_else(|| {
            FeedError::Parse(format!(
                "event {} has no DTSTART",
                self.uid.as_deref().unwrap_or("(without UID)")
            ))
        })?;

        let is_all_day = start_time.is_date();
        let start = start_time.to_utc();

        let mut end = match (self.end, self.duration) {
            (Some(end), _) => end.to_utc(),
            (None, Some(duration)) => start.checked_add_signed(duration).unwrap_or_else(|| {
                tracing::warn!(source = %source.id, %start, "DURATION out of range, ignoring it");
                start
            }),
            (None, None) => start,
        };
        if is_all_day {
            end = end.date_naive().and_time(NaiveTime::MIN).and_utc();
        }
        if end < start {
            tracing::warn!(
                source = %source.id,
                uid = self.uid.as_deref().unwrap_or(""),
                %start,
                %end,
                "event ends before it starts, clamping end to start"
            );
            end = start;
        }

        let title = self
            .summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let uid = self.uid.filter(|u| !u.trim().is_empty());

        Ok(BookingEvent::new(instance_id, title, start, end, source)
            .with_uid(uid)
            .all_day(is_all_day))
    }
}

/// The canonical booking: one occupied time range from one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingEvent {
    uid: Option<String>,
    instance_id: String,
    title: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    is_all_day: bool,
    source_id: SourceId,
    source_name: String,
    color: String,
}

impl BookingEvent {
    /// Create an event stamped with `source`'s id, name and color.
    ///
    /// `instance_id` addresses the event within one merge cycle; it is not
    /// used for deduplication. An `end` before `start` is clamped to `start`.
    pub fn new(
        instance_id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source: &Source,
    ) -> Self {
        BookingEvent {
            uid: None,
            instance_id: instance_id.into(),
            title: title.into(),
            start,
            end: end.max(start),
            is_all_day: false,
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            color: source.color_tag().to_string(),
        }
    }

    pub fn with_uid(mut self, uid: Option<String>) -> Self {
        self.uid = uid;
        self
    }

    pub fn all_day(mut self, is_all_day: bool) -> Self {
        self.is_all_day = is_all_day;
        self
    }

    /// Feed-supplied identity token, if any.
    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn is_all_day(&self) -> bool {
        self.is_all_day
    }

    pub fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Identity used when the feed supplied no usable UID:
    /// title, start and end joined by a reserved separator.
    pub fn fallback_key(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.title,
            self.start.to_rfc3339(),
            self.end.to_rfc3339(),
            sep = FALLBACK_KEY_SEPARATOR
        )
    }

    /// Half-open interval overlap: `[a.start, a.end)` meets `[b.start, b.end)`.
    pub fn overlaps(&self, other: &BookingEvent) -> bool {
        other.start < self.end && self.start < other.end
    }

    /// Human-readable time range, dates only for all-day events.
    pub fn render_time_range(&self) -> String {
        if self.is_all_day {
            format!(
                "{} → {}",
                self.start.format("%Y-%m-%d"),
                self.end.format("%Y-%m-%d")
            )
        } else {
            format!(
                "{} → {}",
                self.start.format("%Y-%m-%d %H:%M"),
                self.end.format("%Y-%m-%d %H:%M")
            )
        }
    }
}

impl fmt::Display for BookingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}
