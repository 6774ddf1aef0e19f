use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::sync::LazyLock;

static SPANISH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d{1,2}) de (\w+) de (\d{4}), (\d{1,2}):(\d{2}):(\d{2}) ([ap])\.\s?m\. UTC([+-]\d+)",
    )
    .expect("spanish timestamp pattern is valid")
});

static ISO_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2})").expect("iso prefix pattern is valid")
});

static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}:\d{2}:\d{2})").expect("clock time pattern is valid")
});

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Timestamp of a log record as it arrives from the backend.
///
/// The backend mixes several encodings, each variant keeps one of them
/// verbatim so normalization can dispatch per shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Timestamp {
    /// Firestore style `{_seconds, _nanoseconds}` object.
    EpochSeconds { seconds: i64, nanoseconds: i64 },
    /// Any textual encoding: ISO, RFC 2822, localized Spanish, ...
    Text(String),
    /// Plain number, read as milliseconds since the epoch.
    EpochMillis(f64),
    /// Already a point in time (records produced locally).
    DateTime(DateTime<Utc>),
    #[default]
    Unknown,
}

/// Result of normalizing a [`Timestamp`].
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Instant(DateTime<Utc>),
    /// Only a bare `H:MM:SS` could be recovered. Good for display, useless for bucketing.
    ClockTime(String),
    Unparsable,
}

impl Normalized {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Normalized::Instant(instant) => Some(*instant),
            _ => None,
        }
    }
}

impl Timestamp {
    pub fn normalize(&self) -> Normalized {
        match self {
            Timestamp::EpochSeconds {
                seconds,
                nanoseconds,
            } => seconds
                .checked_mul(1000)
                .and_then(|millis| millis.checked_add(nanoseconds.div_euclid(1_000_000)))
                .and_then(from_millis)
                .map_or(Normalized::Unparsable, Normalized::Instant),
            Timestamp::DateTime(instant) => Normalized::Instant(*instant),
            Timestamp::Text(text) => normalize_text(text),
            Timestamp::EpochMillis(millis) if millis.is_finite() => from_millis(millis.trunc() as i64)
                .map_or(Normalized::Unparsable, Normalized::Instant),
            Timestamp::EpochMillis(_) | Timestamp::Unknown => Normalized::Unparsable,
        }
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.normalize().instant()
    }
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

fn normalize_text(text: &str) -> Normalized {
    let text = text.trim();

    if let Some(instant) = parse_direct(text) {
        return Normalized::Instant(instant);
    }
    if let Some(instant) = SpanishTimestamp::parse(text).and_then(|spanish| spanish.instant()) {
        return Normalized::Instant(instant);
    }
    if let Some(instant) = parse_iso_prefix(text) {
        return Normalized::Instant(instant);
    }
    match CLOCK_TIME.captures(text) {
        Some(caps) => Normalized::ClockTime(caps[1].to_string()),
        None => Normalized::Unparsable,
    }
}

/// Formats a date parser would accept as-is. Zoneless date-times are local time,
/// a bare date is UTC midnight.
fn parse_direct(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(instant) = DateTime::parse_from_rfc2822(text) {
        return Some(instant.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|local| local.with_timezone(&Utc));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_iso_prefix(text: &str) -> Option<DateTime<Utc>> {
    let caps = ISO_PREFIX.captures(text)?;
    NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// A localized timestamp such as `2 de abril de 2025, 11:01:28 p.m. UTC-6`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanishTimestamp {
    /// The six clock fields taken as a UTC instant, before the offset is applied.
    pub wall_clock: DateTime<Utc>,
    pub offset_hours: i64,
}

impl SpanishTimestamp {
    pub fn parse(text: &str) -> Option<Self> {
        let caps = SPANISH_PATTERN.captures(text)?;

        let day: u32 = caps[1].parse().ok()?;
        let month = month_index(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        let mut hour: u32 = caps[4].parse().ok()?;
        let minute: u32 = caps[5].parse().ok()?;
        let second: u32 = caps[6].parse().ok()?;
        let offset_hours: i64 = caps[8].parse().ok()?;

        match &caps[7] {
            "p" if hour < 12 => hour += 12,
            "a" if hour == 12 => hour = 0,
            _ => {}
        }

        let wall_clock = NaiveDate::from_ymd_opt(year, month + 1, day)?
            .and_hms_opt(hour, minute, second)
            .map(|naive| Utc.from_utc_datetime(&naive))?;

        Some(Self {
            wall_clock,
            offset_hours,
        })
    }

    /// Shifts the wall clock by the offset. The offset is added, not subtracted,
    /// which keeps parity with the data the backend has been producing.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        let shift = Duration::try_minutes(self.offset_hours.checked_mul(60)?)?;
        self.wall_clock.checked_add_signed(shift)
    }
}

fn month_index(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    SPANISH_MONTHS
        .iter()
        .position(|month| *month == name)
        .map(|index| index as u32)
}

/// Renders the time of day shown in the log table.
pub fn display_time<Tz>(timestamp: &Timestamp, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match timestamp.normalize() {
        Normalized::Instant(instant) => instant.with_timezone(tz).format("%H:%M:%S").to_string(),
        Normalized::ClockTime(clock) => clock,
        Normalized::Unparsable => "N/A".to_string(),
    }
}

impl From<Value> for Timestamp {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Timestamp::Text(text),
            Value::Number(number) => number
                .as_f64()
                .map_or(Timestamp::Unknown, Timestamp::EpochMillis),
            Value::Object(fields) => epoch_seconds(&fields, "_seconds", "_nanoseconds")
                .or_else(|| epoch_seconds(&fields, "seconds", "nanoseconds"))
                .unwrap_or(Timestamp::Unknown),
            _ => Timestamp::Unknown,
        }
    }
}

fn epoch_seconds(fields: &Map<String, Value>, seconds_key: &str, nanos_key: &str) -> Option<Timestamp> {
    let seconds = whole_number(fields.get(seconds_key)?)?;
    let nanoseconds = fields.get(nanos_key).and_then(whole_number).unwrap_or(0);
    Some(Timestamp::EpochSeconds {
        seconds,
        nanoseconds,
    })
}

fn whole_number(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
}

impl From<Timestamp> for Value {
    fn from(timestamp: Timestamp) -> Self {
        match timestamp {
            Timestamp::EpochSeconds {
                seconds,
                nanoseconds,
            } => serde_json::json!({ "_seconds": seconds, "_nanoseconds": nanoseconds }),
            Timestamp::Text(text) => Value::String(text),
            Timestamp::EpochMillis(millis) => {
                serde_json::Number::from_f64(millis).map_or(Value::Null, Value::Number)
            }
            Timestamp::DateTime(instant) => Value::String(instant.to_rfc3339()),
            Timestamp::Unknown => Value::Null,
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Timestamp::from)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::from(self.clone()).serialize(serializer)
    }
}
