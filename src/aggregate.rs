//! Chart views derived from a filtered record set.
//!
//! Every function here is pure: it reads the records, never mutates them,
//! and splits counts between the two servers through [`Server::of`].

use crate::record::{LogRecord, Server};
use chrono::{TimeZone, Timelike};
use indexmap::IndexMap;
use serde::Serialize;
use std::borrow::Borrow;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const TOP_PATHS: usize = 5;

/// A value per server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ServerPair<T> {
    pub server1: T,
    pub server2: T,
}

impl<T> ServerPair<T> {
    pub fn get(&self, server: Server) -> &T {
        match server {
            Server::One => &self.server1,
            Server::Two => &self.server2,
        }
    }

    pub fn get_mut(&mut self, server: Server) -> &mut T {
        match server {
            Server::One => &mut self.server1,
            Server::Two => &mut self.server2,
        }
    }
}

impl ServerPair<usize> {
    pub fn combined(&self) -> usize {
        self.server1 + self.server2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyTraffic {
    pub hour: String,
    #[serde(flatten)]
    pub counts: ServerPair<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBucket {
    pub name: &'static str,
    pub range: &'static str,
    #[serde(flatten)]
    pub counts: ServerPair<usize>,
}

/// Counts for a dynamic key (method, path, status code) or a fixed range label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedCounts {
    pub name: String,
    #[serde(flatten)]
    pub counts: ServerPair<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelCounts {
    pub name: &'static str,
    #[serde(flatten)]
    pub counts: ServerPair<usize>,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub name: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryRow {
    pub name: String,
    /// Megabytes.
    #[serde(flatten)]
    pub usage: ServerPair<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TotalRequests {
    pub server1: usize,
    pub server2: usize,
    pub total: usize,
}

/// Log level buckets. Unknown or missing levels count as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Other,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
        Level::Other,
    ];

    pub fn classify(raw: Option<&str>) -> Self {
        match raw.unwrap_or_default().to_lowercase().as_str() {
            "error" => Level::Error,
            "warn" => Level::Warn,
            "info" => Level::Info,
            "debug" => Level::Debug,
            "trace" => Level::Trace,
            _ => Level::Other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Level::Error => "Error",
            Level::Warn => "Warning",
            Level::Info => "Info",
            Level::Debug => "Debug",
            Level::Trace => "Trace",
            Level::Other => "Other",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Level::Error => "#EF4444",
            Level::Warn => "#F59E0B",
            Level::Info => "#3B82F6",
            Level::Debug => "#8B5CF6",
            Level::Trace => "#10B981",
            Level::Other => "#6B7280",
        }
    }
}

const STATUS_GROUPS: [(&str, &str, i64); 4] = [
    ("Success 200-299", "200-299", 200),
    ("Redirect 300-399", "300-399", 300),
    ("Client error 400-499", "400-499", 400),
    ("Server error 500-599", "500-599", 500),
];

const RESPONSE_TIME_RANGES: [(&str, f64, f64); 4] = [
    ("0-100ms", 0.0, 100.0),
    ("100-300ms", 100.0, 300.0),
    ("300-500ms", 300.0, 500.0),
    ("500ms+", 500.0, f64::INFINITY),
];

/// Requests per hour of day, 24 rows, hour taken in `tz`.
/// Records without an instant are left out.
pub fn hourly_traffic<R, Tz>(records: &[R], tz: &Tz) -> Vec<HourlyTraffic>
where
    R: Borrow<LogRecord>,
    Tz: TimeZone,
{
    let mut hours: Vec<HourlyTraffic> = (0..24)
        .map(|hour| HourlyTraffic {
            hour: format!("{}:00", hour),
            counts: ServerPair::default(),
        })
        .collect();

    for record in records.iter().map(Borrow::borrow) {
        if let Some(instant) = record.timestamp.instant() {
            let hour = instant.with_timezone(tz).hour() as usize;
            *hours[hour].counts.get_mut(record.server()) += 1;
        }
    }

    hours
}

pub fn status_distribution<R: Borrow<LogRecord>>(records: &[R]) -> Vec<StatusBucket> {
    STATUS_GROUPS
        .iter()
        .map(|&(name, range, base)| {
            let mut counts = ServerPair::default();
            for record in records.iter().map(Borrow::borrow) {
                if record.status.is_some_and(|status| (base..base + 100).contains(&status)) {
                    *counts.get_mut(record.server()) += 1;
                }
            }
            StatusBucket {
                name,
                range,
                counts,
            }
        })
        .collect()
}

/// One row per distinct method, in order of first appearance. Records with
/// a missing or empty method are skipped.
pub fn method_counts<R: Borrow<LogRecord>>(records: &[R]) -> Vec<NamedCounts> {
    count_by_key(records, |record| record.method.clone().filter(|method| !method.is_empty()))
}

/// Per level counts. Levels nobody logged are dropped.
pub fn log_level_counts<R: Borrow<LogRecord>>(records: &[R]) -> Vec<LevelCounts> {
    let mut levels: IndexMap<Level, ServerPair<usize>> =
        Level::ALL.iter().map(|level| (*level, ServerPair::default())).collect();

    for record in records.iter().map(Borrow::borrow) {
        let level = Level::classify(record.log_level.as_deref());
        if let Some(counts) = levels.get_mut(&level) {
            *counts.get_mut(record.server()) += 1;
        }
    }

    levels
        .into_iter()
        .filter(|(_, counts)| counts.combined() > 0)
        .map(|(level, counts)| LevelCounts {
            name: level.name(),
            counts,
            color: level.color(),
        })
        .collect()
}

/// Level breakdown for a single server. Keys are the raw lowercased level,
/// `unknown` when missing.
pub fn log_level_pie<R: Borrow<LogRecord>>(records: &[R], server: Server) -> Vec<PieSlice> {
    let mut slices: IndexMap<String, usize> = IndexMap::new();

    for record in records.iter().map(Borrow::borrow) {
        if record.server() != server {
            continue;
        }
        let level = match record.log_level.as_deref() {
            Some(level) if !level.is_empty() => level.to_lowercase(),
            _ => "unknown".to_string(),
        };
        *slices.entry(level).or_default() += 1;
    }

    slices
        .into_iter()
        .map(|(level, value)| PieSlice {
            name: capitalize(&level),
            value,
        })
        .collect()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Histogram of response times. Records without a response time are not counted.
pub fn response_time_histogram<R: Borrow<LogRecord>>(records: &[R]) -> Vec<NamedCounts> {
    RESPONSE_TIME_RANGES
        .iter()
        .map(|&(name, min, max)| {
            let mut counts = ServerPair::default();
            for record in records.iter().map(Borrow::borrow) {
                if record.response_time.is_some_and(|ms| ms >= min && ms < max) {
                    *counts.get_mut(record.server()) += 1;
                }
            }
            NamedCounts {
                name: name.to_string(),
                counts,
            }
        })
        .collect()
}

/// Mean response time per server, missing values count as 0.
pub fn average_response_time<R: Borrow<LogRecord>>(records: &[R]) -> ServerPair<i64> {
    let mut sums = ServerPair::<f64>::default();
    let mut counts = ServerPair::<usize>::default();

    for record in records.iter().map(Borrow::borrow) {
        let server = record.server();
        *sums.get_mut(server) += record.response_time.unwrap_or(0.0);
        *counts.get_mut(server) += 1;
    }

    let mean = |server: Server| match *counts.get(server) {
        0 => 0,
        n => (sums.get(server) / n as f64 + 0.5).floor() as i64,
    };

    ServerPair {
        server1: mean(Server::One),
        server2: mean(Server::Two),
    }
}

/// Latest memory snapshot of each server, side by side in megabytes.
///
/// Rows follow server 1's regions. Records without a server id are ignored.
pub fn memory_usage<R: Borrow<LogRecord>>(records: &[R]) -> Vec<MemoryRow> {
    let mut latest: ServerPair<Option<&IndexMap<String, f64>>> = ServerPair::default();

    for record in records.iter().map(Borrow::borrow) {
        if record.server_id.is_none_or(|id| id == 0) {
            continue;
        }
        if let Some(snapshot) = record.memory_usage() {
            *latest.get_mut(record.server()) = Some(snapshot);
        }
    }

    match (latest.server1, latest.server2) {
        (None, None) => vec![MemoryRow {
            name: "No Data".to_string(),
            usage: ServerPair::default(),
        }],
        (server1, server2) => server1
            .into_iter()
            .flatten()
            .map(|(region, bytes)| MemoryRow {
                name: region.clone(),
                usage: ServerPair {
                    server1: bytes / BYTES_PER_MB,
                    server2: server2.and_then(|s| s.get(region)).copied().unwrap_or(0.0) / BYTES_PER_MB,
                },
            })
            .collect(),
    }
}

/// Five busiest paths, `unknown` for records with a missing or empty one.
pub fn top_paths<R: Borrow<LogRecord>>(records: &[R]) -> Vec<NamedCounts> {
    let mut paths = count_by_key(records, |record| match record.path.as_deref() {
        Some(path) if !path.is_empty() => Some(path.to_string()),
        _ => Some("unknown".to_string()),
    });
    // stable, so ties keep first-seen order
    paths.sort_by(|a, b| b.counts.combined().cmp(&a.counts.combined()));
    paths.truncate(TOP_PATHS);
    paths
}

/// Share of records with status >= 400 among those carrying a status, in percent.
pub fn error_rate<R: Borrow<LogRecord>>(records: &[R]) -> ServerPair<f64> {
    rate_per_server(records, |record| record.status.is_some(), |status| status >= 400)
}

/// Share of all records with status < 400, in percent. A missing status is not a success.
pub fn success_rate<R: Borrow<LogRecord>>(records: &[R]) -> ServerPair<f64> {
    rate_per_server(records, |_| true, |status| status < 400)
}

fn rate_per_server<R, D, H>(records: &[R], counted: D, hit: H) -> ServerPair<f64>
where
    R: Borrow<LogRecord>,
    D: Fn(&LogRecord) -> bool,
    H: Fn(i64) -> bool,
{
    let mut totals = ServerPair::<usize>::default();
    let mut hits = ServerPair::<usize>::default();

    for record in records.iter().map(Borrow::borrow) {
        if !counted(record) {
            continue;
        }
        let server = record.server();
        *totals.get_mut(server) += 1;
        if record.status.is_some_and(&hit) {
            *hits.get_mut(server) += 1;
        }
    }

    let percent = |server: Server| match *totals.get(server) {
        0 => 0.0,
        total => *hits.get(server) as f64 / total as f64 * 100.0,
    };

    ServerPair {
        server1: percent(Server::One),
        server2: percent(Server::Two),
    }
}

/// Error responses grouped by exact status code, ordered by code string.
pub fn errors_by_status<R: Borrow<LogRecord>>(records: &[R]) -> Vec<NamedCounts> {
    let mut codes = count_by_key(records, |record| {
        record
            .status
            .filter(|status| *status >= 400)
            .map(|status| status.to_string())
    });
    codes.sort_by(|a, b| a.name.cmp(&b.name));
    codes
}

pub fn total_requests<R: Borrow<LogRecord>>(records: &[R]) -> TotalRequests {
    let mut counts = ServerPair::<usize>::default();
    for record in records.iter().map(Borrow::borrow) {
        *counts.get_mut(record.server()) += 1;
    }
    TotalRequests {
        server1: counts.server1,
        server2: counts.server2,
        total: counts.combined(),
    }
}

/// Counts records per key in first-seen order. Records mapped to `None` are skipped.
fn count_by_key<R, F>(records: &[R], key: F) -> Vec<NamedCounts>
where
    R: Borrow<LogRecord>,
    F: Fn(&LogRecord) -> Option<String>,
{
    let mut groups: IndexMap<String, ServerPair<usize>> = IndexMap::new();

    for record in records.iter().map(Borrow::borrow) {
        if let Some(name) = key(record) {
            *groups.entry(name).or_default().get_mut(record.server()) += 1;
        }
    }

    groups
        .into_iter()
        .map(|(name, counts)| NamedCounts { name, counts })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SystemInfo;
    use crate::timestamp::Timestamp;
    use chrono::{DateTime, FixedOffset, Utc};

    fn rec(server_id: Option<i64>) -> LogRecord {
        LogRecord {
            server_id,
            ..Default::default()
        }
    }

    fn with_status(server_id: i64, status: i64) -> LogRecord {
        LogRecord {
            status: Some(status),
            ..rec(Some(server_id))
        }
    }

    fn with_memory(server_id: Option<i64>, regions: &[(&str, f64)]) -> LogRecord {
        LogRecord {
            system: Some(SystemInfo {
                memory_usage: Some(regions.iter().map(|(k, v)| (k.to_string(), *v)).collect()),
                ..Default::default()
            }),
            ..rec(server_id)
        }
    }

    fn utc(text: &str) -> Timestamp {
        Timestamp::DateTime(DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc))
    }

    #[test]
    fn scenario_totals_and_error_rate() {
        let records = vec![with_status(1, 200), with_status(1, 500), with_status(2, 404)];

        assert_eq!(
            total_requests(&records),
            TotalRequests {
                server1: 2,
                server2: 1,
                total: 3
            }
        );
        assert_eq!(
            error_rate(&records),
            ServerPair {
                server1: 50.0,
                server2: 100.0
            }
        );
        assert_eq!(
            success_rate(&records),
            ServerPair {
                server1: 50.0,
                server2: 0.0
            }
        );
    }

    #[test]
    fn hourly_traffic_buckets_by_zone_hour() {
        let records = vec![
            LogRecord {
                timestamp: utc("2025-04-02T23:10:00Z"),
                ..rec(Some(1))
            },
            LogRecord {
                timestamp: utc("2025-04-02T23:50:00Z"),
                ..rec(Some(2))
            },
            LogRecord {
                timestamp: Timestamp::Text("2 de abril de 2025, 11:01:28 p.m. UTC+0".into()),
                ..rec(None)
            },
            LogRecord {
                timestamp: Timestamp::Text("no time here".into()),
                ..rec(Some(1))
            },
        ];

        let hours = hourly_traffic(&records, &Utc);
        assert_eq!(hours.len(), 24);
        assert_eq!(hours[23].hour, "23:00");
        assert_eq!(hours[23].counts, ServerPair { server1: 2, server2: 1 });
        let counted: usize = hours.iter().map(|h| h.counts.combined()).sum();
        assert_eq!(counted, 3);

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let shifted = hourly_traffic(&records, &plus_two);
        assert_eq!(shifted[1].counts.combined(), 3);
    }

    #[test]
    fn status_buckets_never_exceed_records_with_status() {
        let records = vec![
            with_status(1, 200),
            with_status(1, 302),
            with_status(2, 404),
            with_status(2, 503),
            with_status(1, 99),
            with_status(1, 600),
            rec(Some(2)),
        ];

        let buckets = status_distribution(&records);
        let names: Vec<&str> = buckets.iter().map(|b| b.name).collect();
        assert_eq!(
            names,
            ["Success 200-299", "Redirect 300-399", "Client error 400-499", "Server error 500-599"]
        );
        let sum: usize = buckets.iter().map(|b| b.counts.combined()).sum();
        assert_eq!(sum, 4);
        assert!(sum <= records.iter().filter(|r| r.status.is_some()).count());
        assert_eq!(buckets[2].counts, ServerPair { server1: 0, server2: 1 });
    }

    #[test]
    fn methods_skip_missing_and_keep_first_seen_order() {
        let records = vec![
            LogRecord { method: Some("POST".into()), ..rec(Some(2)) },
            LogRecord { method: Some("GET".into()), ..rec(Some(1)) },
            LogRecord { method: Some("POST".into()), ..rec(None) },
            rec(Some(1)),
        ];

        let methods = method_counts(&records);
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].name, "POST");
        assert_eq!(methods[0].counts, ServerPair { server1: 1, server2: 1 });
        assert_eq!(methods[1].name, "GET");
    }

    #[test]
    fn log_levels_fold_unknown_into_other_and_drop_empty() {
        let records = vec![
            LogRecord { log_level: Some("ERROR".into()), ..rec(Some(1)) },
            LogRecord { log_level: Some("warn".into()), ..rec(Some(2)) },
            LogRecord { log_level: Some("warning".into()), ..rec(Some(2)) },
            rec(Some(1)),
        ];

        let levels = log_level_counts(&records);
        let names: Vec<&str> = levels.iter().map(|l| l.name).collect();
        assert_eq!(names, ["Error", "Warning", "Other"]);
        assert_eq!(levels[2].counts, ServerPair { server1: 1, server2: 1 });
        assert_eq!(levels[0].color, "#EF4444");
    }

    #[test]
    fn pie_is_per_server() {
        let records = vec![
            LogRecord { log_level: Some("Info".into()), ..rec(Some(1)) },
            LogRecord { log_level: Some("info".into()), ..rec(None) },
            LogRecord { log_level: Some("error".into()), ..rec(Some(2)) },
            rec(Some(1)),
        ];

        let server1 = log_level_pie(&records, Server::One);
        assert_eq!(
            server1,
            vec![
                PieSlice { name: "Info".into(), value: 2 },
                PieSlice { name: "Unknown".into(), value: 1 },
            ]
        );
        let server2 = log_level_pie(&records, Server::Two);
        assert_eq!(server2, vec![PieSlice { name: "Error".into(), value: 1 }]);
    }

    #[test]
    fn response_time_histogram_ranges() {
        let times = [0.0, 99.9, 100.0, 450.0, 500.0, 5000.0];
        let mut records: Vec<LogRecord> = times
            .iter()
            .map(|ms| LogRecord { response_time: Some(*ms), ..rec(Some(1)) })
            .collect();
        records.push(rec(Some(2)));

        let histogram = response_time_histogram(&records);
        let counts: Vec<usize> = histogram.iter().map(|b| b.counts.server1).collect();
        assert_eq!(counts, [2, 1, 1, 2]);
        assert_eq!(histogram[3].name, "500ms+");
        assert!(histogram.iter().all(|b| b.counts.server2 == 0));
    }

    #[test]
    fn average_response_time_rounds_and_handles_empty() {
        assert_eq!(
            average_response_time::<LogRecord>(&[]),
            ServerPair { server1: 0, server2: 0 }
        );

        let records = vec![
            LogRecord { response_time: Some(100.0), ..rec(Some(1)) },
            LogRecord { response_time: Some(201.0), ..rec(None) },
            rec(Some(1)),
            LogRecord { response_time: Some(2.5), ..rec(Some(2)) },
        ];
        // (100 + 201 + 0) / 3 = 100.33, 2.5 rounds up
        assert_eq!(
            average_response_time(&records),
            ServerPair { server1: 100, server2: 3 }
        );
    }

    #[test]
    fn memory_uses_latest_snapshot_per_server() {
        let mb = BYTES_PER_MB;
        let records = vec![
            with_memory(Some(1), &[("rss", 1.0 * mb)]),
            with_memory(Some(1), &[("rss", 10.0 * mb), ("heapUsed", 4.0 * mb)]),
            with_memory(Some(2), &[("rss", 20.0 * mb)]),
            with_memory(None, &[("rss", 99.0 * mb)]),
        ];

        let rows = memory_usage(&records);
        assert_eq!(
            rows,
            vec![
                MemoryRow { name: "rss".into(), usage: ServerPair { server1: 10.0, server2: 20.0 } },
                MemoryRow { name: "heapUsed".into(), usage: ServerPair { server1: 4.0, server2: 0.0 } },
            ]
        );
    }

    #[test]
    fn memory_without_data_yields_sentinel_row() {
        let rows = memory_usage(&[rec(Some(1)), with_memory(None, &[("rss", 1.0)])]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "No Data");
        assert_eq!(rows[0].usage, ServerPair { server1: 0.0, server2: 0.0 });

        let only_second = memory_usage(&[with_memory(Some(2), &[("rss", 1.0)])]);
        assert!(only_second.is_empty());
    }

    #[test]
    fn top_paths_are_limited_sorted_and_stable() {
        let paths = ["/a", "/b", "/b", "/c", "/d", "/e", "/f", "/f", "/g"];
        let mut records: Vec<LogRecord> = paths
            .iter()
            .map(|p| LogRecord { path: Some(p.to_string()), ..rec(Some(1)) })
            .collect();
        records.push(rec(Some(2)));

        let top = top_paths(&records);
        let names: Vec<&str> = top.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["/b", "/f", "/a", "/c", "/d"]);
        assert!(top.windows(2).all(|w| w[0].counts.combined() >= w[1].counts.combined()));

        let unknown = top_paths(&[rec(Some(2))]);
        assert_eq!(unknown[0].name, "unknown");
    }

    #[test]
    fn empty_method_and_path_count_as_missing() {
        let records = vec![
            LogRecord {
                method: Some(String::new()),
                path: Some(String::new()),
                ..rec(Some(1))
            },
            LogRecord {
                method: Some("GET".into()),
                path: Some("/a".into()),
                ..rec(Some(1))
            },
        ];

        let methods: Vec<String> = method_counts(&records).into_iter().map(|m| m.name).collect();
        assert_eq!(methods, ["GET"]);

        let paths: Vec<String> = top_paths(&records).into_iter().map(|p| p.name).collect();
        assert_eq!(paths, ["unknown", "/a"]);
    }

    #[test]
    fn errors_by_status_sorted_by_code_string() {
        let records = vec![
            with_status(1, 503),
            with_status(2, 404),
            with_status(1, 200),
            with_status(2, 1000),
            with_status(1, 404),
        ];
        let errors = errors_by_status(&records);
        let names: Vec<&str> = errors.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["1000", "404", "503"]);
        assert_eq!(errors[1].counts, ServerPair { server1: 1, server2: 1 });
    }

    #[test]
    fn rates_of_empty_sets_are_zero_and_sum_to_at_most_hundred() {
        assert_eq!(error_rate::<LogRecord>(&[]), ServerPair::default());
        assert_eq!(success_rate::<LogRecord>(&[]), ServerPair::default());

        let partial = vec![with_status(1, 200), with_status(1, 502), rec(Some(1))];
        let sum = error_rate(&partial).server1 + success_rate(&partial).server1;
        assert!(sum <= 100.0);

        let full = vec![with_status(1, 200), with_status(1, 502), with_status(1, 301)];
        let sum = error_rate(&full).server1 + success_rate(&full).server1;
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn views_serialize_flat_for_charting() {
        let row = NamedCounts {
            name: "GET".into(),
            counts: ServerPair { server1: 1, server2: 2 },
        };
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            serde_json::json!({ "name": "GET", "server1": 1, "server2": 2 })
        );
    }
}
