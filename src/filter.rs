use crate::record::LogRecord;
use chrono::{DateTime, Duration, Utc};
use derive_more::derive::{Display, Error};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    LastHour,
    LastSixHours,
    #[default]
    LastDay,
    LastWeek,
    All,
}

#[derive(Debug, Display, Error, PartialEq, Eq)]
#[display("unknown time range '{input}', expected one of 1h, 6h, 24h, 7d, all")]
pub struct ParseTimeRangeError {
    pub input: String,
}

impl TimeRange {
    pub const ALL: [TimeRange; 5] = [
        TimeRange::LastHour,
        TimeRange::LastSixHours,
        TimeRange::LastDay,
        TimeRange::LastWeek,
        TimeRange::All,
    ];

    /// Width of the window ending now, `None` for `All`.
    pub fn window(&self) -> Option<Duration> {
        match self {
            TimeRange::LastHour => Some(Duration::hours(1)),
            TimeRange::LastSixHours => Some(Duration::hours(6)),
            TimeRange::LastDay => Some(Duration::hours(24)),
            TimeRange::LastWeek => Some(Duration::days(7)),
            TimeRange::All => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::LastHour => "1h",
            TimeRange::LastSixHours => "6h",
            TimeRange::LastDay => "24h",
            TimeRange::LastWeek => "7d",
            TimeRange::All => "all",
        }
    }

    pub fn next(self) -> Self {
        match self {
            TimeRange::LastHour => TimeRange::LastSixHours,
            TimeRange::LastSixHours => TimeRange::LastDay,
            TimeRange::LastDay => TimeRange::LastWeek,
            TimeRange::LastWeek => TimeRange::All,
            TimeRange::All => TimeRange::LastHour,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = ParseTimeRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TimeRange::ALL
            .into_iter()
            .find(|range| range.as_str() == wanted)
            .ok_or_else(|| ParseTimeRangeError {
                input: s.to_string(),
            })
    }
}

/// User controlled narrowing of the record set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search_term: String,
    pub time_range: TimeRange,
}

impl FilterState {
    pub fn new(search_term: impl Into<String>, time_range: TimeRange) -> Self {
        Self {
            search_term: search_term.into(),
            time_range,
        }
    }

    /// Applies the text filter, then the time filter. Input order is kept.
    pub fn apply<'a>(&self, records: &'a [LogRecord], now: DateTime<Utc>) -> Vec<&'a LogRecord> {
        let term = self.search_term.to_lowercase();
        let limit = self.time_range.window().map(|window| now - window);

        records
            .iter()
            .filter(|record| matches_search(record, &term))
            .filter(|record| limit.is_none_or(|limit| within_limit(record, limit)))
            .collect()
    }
}

/// Case-insensitive substring match over path, method, level and status.
/// `term` must already be lowercase. An empty term matches everything.
/// A zero status counts as unset.
pub fn matches_search(record: &LogRecord, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }

    let text_match = [&record.path, &record.method, &record.log_level]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(term));

    text_match
        || record
            .status
            .filter(|status| *status != 0)
            .is_some_and(|status| status.to_string().contains(term))
}

/// Records without a usable instant always pass.
fn within_limit(record: &LogRecord, limit: DateTime<Utc>) -> bool {
    record
        .timestamp
        .instant()
        .is_none_or(|instant| instant >= limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::Timestamp;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-04-02T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn at(minutes_ago: i64) -> Timestamp {
        Timestamp::DateTime(now() - Duration::minutes(minutes_ago))
    }

    fn record(path: &str, method: &str, status: i64, timestamp: Timestamp) -> LogRecord {
        LogRecord {
            path: Some(path.into()),
            method: Some(method.into()),
            status: Some(status),
            timestamp,
            ..Default::default()
        }
    }

    #[test]
    fn time_range_round_trips_through_strings() {
        for range in TimeRange::ALL {
            assert_eq!(range.as_str().parse::<TimeRange>(), Ok(range));
        }
        assert_eq!(" 7D ".parse::<TimeRange>(), Ok(TimeRange::LastWeek));
        let err = "2w".parse::<TimeRange>().unwrap_err();
        assert!(err.to_string().contains("'2w'"));
    }

    #[test]
    fn next_cycles_through_every_range() {
        let mut range = TimeRange::LastHour;
        let mut seen = Vec::new();
        for _ in 0..TimeRange::ALL.len() {
            seen.push(range);
            range = range.next();
        }
        assert_eq!(seen, TimeRange::ALL);
        assert_eq!(range, TimeRange::LastHour);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let records = vec![
            record("/api/Users", "GET", 200, at(1)),
            record("/api/orders", "POST", 404, at(1)),
            LogRecord {
                log_level: Some("ERROR".into()),
                ..Default::default()
            },
        ];

        let by_path = FilterState::new("users", TimeRange::All).apply(&records, now());
        assert_eq!(by_path.len(), 1);

        let by_method = FilterState::new("post", TimeRange::All).apply(&records, now());
        assert_eq!(by_method[0].path.as_deref(), Some("/api/orders"));

        let by_status = FilterState::new("40", TimeRange::All).apply(&records, now());
        assert_eq!(by_status.len(), 1);

        let by_level = FilterState::new("err", TimeRange::All).apply(&records, now());
        assert_eq!(by_level.len(), 1);
        assert_eq!(by_level[0].log_level.as_deref(), Some("ERROR"));
    }

    #[test]
    fn unset_fields_never_match() {
        let records = vec![LogRecord::default()];
        assert!(FilterState::new("a", TimeRange::All).apply(&records, now()).is_empty());
        assert_eq!(FilterState::new("", TimeRange::All).apply(&records, now()).len(), 1);
    }

    #[test]
    fn zero_status_is_not_searchable() {
        let records = vec![
            LogRecord {
                status: Some(0),
                ..Default::default()
            },
            LogRecord {
                status: Some(500),
                ..Default::default()
            },
        ];

        let hits = FilterState::new("0", TimeRange::All).apply(&records, now());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].status, Some(500));
    }

    #[test]
    fn time_window_is_inclusive_and_keeps_unparsable() {
        let records = vec![
            record("/in", "GET", 200, at(30)),
            record("/edge", "GET", 200, at(60)),
            record("/out", "GET", 200, at(61)),
            record("/nodate", "GET", 200, Timestamp::Unknown),
            record("/clock", "GET", 200, Timestamp::Text("11:02:03".into())),
        ];

        let kept: Vec<_> = FilterState::new("", TimeRange::LastHour)
            .apply(&records, now())
            .into_iter()
            .filter_map(|r| r.path.as_deref())
            .collect();
        assert_eq!(kept, ["/in", "/edge", "/nodate", "/clock"]);

        assert_eq!(FilterState::new("", TimeRange::All).apply(&records, now()).len(), 5);
    }

    #[test]
    fn filtering_is_idempotent() {
        let records = vec![
            record("/api/users", "GET", 200, at(10)),
            record("/api/users", "DELETE", 500, at(60 * 30)),
            record("/api/auth", "GET", 401, at(5)),
        ];
        let filter = FilterState::new("api", TimeRange::LastDay);

        let once: Vec<LogRecord> = filter.apply(&records, now()).into_iter().cloned().collect();
        let twice: Vec<LogRecord> = filter.apply(&once, now()).into_iter().cloned().collect();
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }
}
