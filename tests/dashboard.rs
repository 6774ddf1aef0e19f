use chrono::{DateTime, Duration, Timelike, Utc};
use log_dashboard::aggregate::ServerPair;
use log_dashboard::dashboard::{derive, Dashboard};
use log_dashboard::filter::{FilterState, TimeRange};
use log_dashboard::record::LogRecord;
use log_dashboard::timestamp::{Normalized, SpanishTimestamp, Timestamp};
use serde_json::json;

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-04-03T06:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn backend_payload() -> Vec<LogRecord> {
    serde_json::from_value(json!([
        {
            "id": 1, "serverId": 1, "method": "GET", "path": "/api/users",
            "status": 200, "responseTime": 120, "logLevel": "info",
            "timestamp": "2025-04-03T05:30:00Z",
            "system": { "memoryUsage": { "rss": 104857600, "heapUsed": 52428800 } }
        },
        {
            "id": 2, "serverId": 1, "method": "POST", "path": "/api/orders",
            "status": 500, "responseTime": 640, "logLevel": "error",
            "timestamp": { "_seconds": 1743652800, "_nanoseconds": 0 }
        },
        {
            "id": 3, "serverId": 2, "method": "GET", "path": "/api/users",
            "status": 404, "responseTime": 35, "logLevel": "WARN",
            "timestamp": "2 de abril de 2025, 11:01:28 p.m. UTC-6",
            "system": { "memoryUsage": { "rss": 209715200 } }
        },
        {
            "id": "legacy", "method": "DELETE", "path": "/api/auth",
            "status": 429, "logLevel": "notice",
            "timestamp": "garbled"
        },
        {
            "id": 5, "serverId": 2, "method": "GET", "path": "/api/users",
            "status": 200, "responseTime": 80,
            "timestamp": 1743000000000_i64
        }
    ]))
    .unwrap()
}

#[test]
fn scenario_from_three_records() {
    let records: Vec<LogRecord> = serde_json::from_value(json!([
        { "serverId": 1, "status": 200 },
        { "serverId": 1, "status": 500 },
        { "serverId": 2, "status": 404 }
    ]))
    .unwrap();

    let views = derive(&records, &FilterState::new("", TimeRange::All), now(), &Utc);
    assert_eq!(views.total_requests.server1, 2);
    assert_eq!(views.total_requests.server2, 1);
    assert_eq!(views.total_requests.total, 3);
    assert_eq!(views.error_rate, ServerPair { server1: 50.0, server2: 100.0 });
}

#[test]
fn spanish_timestamp_scenario() {
    let text = "2 de abril de 2025, 11:01:28 p.m. UTC-6";
    let parsed = SpanishTimestamp::parse(text).unwrap();
    assert_eq!(parsed.wall_clock.hour(), 23);

    let normalized = Timestamp::Text(text.to_string()).normalize();
    let instant = normalized.instant().unwrap();
    assert_eq!(instant, parsed.wall_clock - Duration::hours(6));
    assert!(matches!(normalized, Normalized::Instant(_)));
}

#[test]
fn time_window_keeps_unparsable_records() {
    let records = backend_payload();
    let views = derive(&records, &FilterState::new("", TimeRange::LastHour), now(), &Utc);

    let ids: Vec<String> = views
        .filtered
        .iter()
        .filter_map(|r| r.id.as_ref().map(|id| id.to_string()))
        .collect();
    assert_eq!(ids, ["1", "legacy"]);
}

#[test]
fn full_payload_views() {
    let records = backend_payload();
    let views = derive(&records, &FilterState::new("", TimeRange::All), now(), &Utc);

    assert_eq!(views.total_requests.total, 5);
    assert_eq!(views.total_requests.server1, 3);

    // 05:30Z, 04:00Z, 17:01:28Z, 14:40Z on 2025-03-26; "garbled" has no hour
    let hourly: usize = views.hourly_traffic.iter().map(|h| h.counts.server1 + h.counts.server2).sum();
    assert_eq!(hourly, 4);
    assert_eq!(views.hourly_traffic[17].counts.server2, 1);
    assert_eq!(views.hourly_traffic[5].counts.server1, 1);

    let status_total: usize = views
        .status_distribution
        .iter()
        .map(|b| b.counts.server1 + b.counts.server2)
        .sum();
    assert_eq!(status_total, 5);

    assert_eq!(views.methods.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(), ["GET", "POST", "DELETE"]);
    assert_eq!(views.top_paths[0].name, "/api/users");
    assert_eq!(views.top_paths[0].counts, ServerPair { server1: 1, server2: 2 });

    let levels: Vec<&str> = views.log_levels.iter().map(|l| l.name).collect();
    assert_eq!(levels, ["Error", "Warning", "Info", "Other"]);

    // server 1: (120 + 640 + 0) / 3 = 253.3, server 2: (35 + 80) / 2 = 57.5
    assert_eq!(views.average_response_time, ServerPair { server1: 253, server2: 58 });

    let codes: Vec<&str> = views.errors_by_status.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(codes, ["404", "429", "500"]);

    assert_eq!(views.memory_usage.len(), 2);
    assert_eq!(views.memory_usage[0].name, "rss");
    assert_eq!(views.memory_usage[0].usage, ServerPair { server1: 100.0, server2: 200.0 });
    assert_eq!(views.memory_usage[1].usage, ServerPair { server1: 50.0, server2: 0.0 });

    for server in [views.error_rate.server1 + views.success_rate.server1, views.error_rate.server2 + views.success_rate.server2] {
        assert!((server - 100.0).abs() < 1e-9);
    }
}

#[test]
fn session_paginates_and_resets() {
    let records: Vec<LogRecord> = (0..25)
        .map(|i| LogRecord {
            server_id: Some(1 + (i % 2)),
            status: Some(200),
            ..Default::default()
        })
        .collect();

    let mut dashboard = Dashboard::new(TimeRange::All);
    dashboard.replace_records(records);
    assert_eq!(dashboard.total_pages(), 3);

    assert!(dashboard.paginate(2));
    assert!(!dashboard.paginate(4));
    assert_eq!(dashboard.current_page(), 2);

    dashboard.set_search_term("200");
    assert_eq!(dashboard.current_page(), 1);
    assert_eq!(dashboard.filtered().len(), 25);

    dashboard.set_search_term("404");
    assert_eq!(dashboard.total_pages(), 0);
    assert!(dashboard.page().is_empty());
}

#[test]
fn views_serialize_for_charting() {
    let views = derive(&backend_payload(), &FilterState::new("", TimeRange::All), now(), &Utc);
    let json = serde_json::to_value(&views).unwrap();

    assert_eq!(json["totalRequests"], json!({ "server1": 3, "server2": 2, "total": 5 }));
    assert_eq!(json["hourlyTraffic"][0]["hour"], "0:00");
    assert_eq!(json["statusDistribution"][0]["name"], "Success 200-299");
    assert_eq!(json["logLevels"][0]["color"], "#EF4444");
}
