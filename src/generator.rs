use crate::record::{LogRecord, RecordId, SystemInfo};
use crate::timestamp::Timestamp;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use rand::prelude::*;

const METHODS: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];
const PATHS: [&str; 5] = [
    "/api/users",
    "/api/products",
    "/api/orders",
    "/api/auth",
    "/api/logs",
];
const LOG_LEVELS: [&str; 5] = ["info", "error", "warn", "debug", "trace"];
const STATUS_CODES: [i64; 8] = [200, 201, 301, 400, 401, 403, 404, 500];
const ERROR_STATUS_CODES: [i64; 7] = [400, 401, 403, 404, 500, 502, 503];

const TRAFFIC_COUNT: usize = 50;
const ERROR_COUNT: usize = 20;

/// Produces demo records so empty charts have something to show.
///
/// All records fall within the 24 hours before `now`. Output is random and
/// unseeded on purpose.
pub struct RecordGenerator {
    now: DateTime<Utc>,
    rng: rand::rngs::ThreadRng,
}

impl RecordGenerator {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            rng: rand::rng(),
        }
    }

    /// Mixed traffic with levels and memory snapshots.
    pub fn traffic(&mut self) -> Vec<LogRecord> {
        (0..TRAFFIC_COUNT)
            .map(|i| {
                let mut record = self.base_record(format!("test-{}", i));
                record.method = Some(self.pick(&METHODS).to_string());
                record.log_level = Some(self.pick(&LOG_LEVELS).to_string());
                record.status = Some(*self.pick(&STATUS_CODES));
                record.system = Some(self.system_info());
                record
            })
            .collect()
    }

    /// Successful requests only, for the hourly chart.
    pub fn hourly_traffic(&mut self) -> Vec<LogRecord> {
        (0..TRAFFIC_COUNT)
            .map(|i| {
                let mut record = self.base_record(format!("traffic-{}", i));
                record.method = Some(self.pick(&METHODS).to_string());
                record.status = Some(200);
                record
            })
            .collect()
    }

    pub fn errors(&mut self) -> Vec<LogRecord> {
        (0..ERROR_COUNT)
            .map(|i| {
                let mut record = self.base_record(format!("error-{}", i));
                record.method = Some("GET".to_string());
                record.status = Some(*self.pick(&ERROR_STATUS_CODES));
                record.log_level = Some("error".to_string());
                record
            })
            .collect()
    }

    fn base_record(&mut self, id: String) -> LogRecord {
        let server_id = if self.rng.random_bool(0.5) { 2 } else { 1 };
        let millis_back = self.rng.random_range(0..24 * 60 * 60 * 1000);

        LogRecord {
            id: Some(RecordId::Text(id)),
            server_id: Some(server_id),
            path: Some(self.pick(&PATHS).to_string()),
            response_time: Some(self.rng.random_range(0..1000) as f64),
            timestamp: Timestamp::DateTime(self.now - Duration::milliseconds(millis_back)),
            ..Default::default()
        }
    }

    fn system_info(&mut self) -> SystemInfo {
        let regions: [(&str, u64, u64); 5] = [
            ("heapTotal", 50_000_000, 10_000_000),
            ("heapUsed", 30_000_000, 10_000_000),
            ("external", 2_000_000, 1_000_000),
            ("rss", 80_000_000, 20_000_000),
            ("arrayBuffers", 200_000, 100_000),
        ];
        let memory_usage: IndexMap<String, f64> = regions
            .iter()
            .map(|&(name, base, spread)| {
                (name.to_string(), (base + self.rng.random_range(0..spread)) as f64)
            })
            .collect();

        SystemInfo {
            memory_usage: Some(memory_usage),
            environment: Some("development".to_string()),
            node_version: Some("v22.14.0".to_string()),
            pid: Some(12345),
        }
    }

    fn pick<'a, T>(&mut self, choices: &'a [T]) -> &'a T {
        &choices[self.rng.random_range(0..choices.len())]
    }
}
