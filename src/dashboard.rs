use crate::aggregate::{
    self, HourlyTraffic, LevelCounts, MemoryRow, NamedCounts, PieSlice, ServerPair, StatusBucket,
    TotalRequests,
};
use crate::filter::{FilterState, TimeRange};
use crate::pagination::Pagination;
use crate::record::{LogRecord, Server};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;

/// Everything the view layer renders, derived from one `(records, filter)` pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedViews {
    pub filtered: Vec<LogRecord>,
    pub hourly_traffic: Vec<HourlyTraffic>,
    pub status_distribution: Vec<StatusBucket>,
    pub methods: Vec<NamedCounts>,
    pub log_levels: Vec<LevelCounts>,
    pub log_level_pie: ServerPair<Vec<PieSlice>>,
    pub response_times: Vec<NamedCounts>,
    pub average_response_time: ServerPair<i64>,
    pub memory_usage: Vec<MemoryRow>,
    pub top_paths: Vec<NamedCounts>,
    pub error_rate: ServerPair<f64>,
    pub errors_by_status: Vec<NamedCounts>,
    pub total_requests: TotalRequests,
    pub success_rate: ServerPair<f64>,
}

/// Filters `records` and computes every view. Pure: same inputs, same output.
pub fn derive<Tz: TimeZone>(
    records: &[LogRecord],
    filter: &FilterState,
    now: DateTime<Utc>,
    tz: &Tz,
) -> DerivedViews {
    let filtered = filter.apply(records, now);

    DerivedViews {
        hourly_traffic: aggregate::hourly_traffic(&filtered, tz),
        status_distribution: aggregate::status_distribution(&filtered),
        methods: aggregate::method_counts(&filtered),
        log_levels: aggregate::log_level_counts(&filtered),
        log_level_pie: ServerPair {
            server1: aggregate::log_level_pie(&filtered, Server::One),
            server2: aggregate::log_level_pie(&filtered, Server::Two),
        },
        response_times: aggregate::response_time_histogram(&filtered),
        average_response_time: aggregate::average_response_time(&filtered),
        memory_usage: aggregate::memory_usage(&filtered),
        top_paths: aggregate::top_paths(&filtered),
        error_rate: aggregate::error_rate(&filtered),
        errors_by_status: aggregate::errors_by_status(&filtered),
        total_requests: aggregate::total_requests(&filtered),
        success_rate: aggregate::success_rate(&filtered),
        filtered: filtered.into_iter().cloned().collect(),
    }
}

/// Session state of the dashboard: raw records, filter, page and the cached views.
///
/// Views are recomputed only when records or the filter change, and every such
/// change sends the page back to 1.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    records: Vec<LogRecord>,
    filter: FilterState,
    pagination: Pagination,
    views: DerivedViews,
}

impl Dashboard {
    pub fn new(time_range: TimeRange) -> Self {
        let mut dashboard = Self {
            filter: FilterState::new("", time_range),
            ..Default::default()
        };
        dashboard.recompute();
        dashboard
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn views(&self) -> &DerivedViews {
        &self.views
    }

    pub fn filtered(&self) -> &[LogRecord] {
        &self.views.filtered
    }

    /// Replaces the raw records, as after a refresh.
    pub fn replace_records(&mut self, records: Vec<LogRecord>) {
        self.records = records;
        self.recompute();
    }

    pub fn append_records(&mut self, records: Vec<LogRecord>) {
        self.records.extend(records);
        self.recompute();
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.filter.search_term = term.into();
        self.recompute();
    }

    pub fn set_time_range(&mut self, time_range: TimeRange) {
        self.filter.time_range = time_range;
        self.recompute();
    }

    pub fn recompute(&mut self) {
        self.recompute_at(Utc::now(), &Local);
    }

    /// Re-derives the views against an explicit clock and zone.
    pub fn recompute_at<Tz: TimeZone>(&mut self, now: DateTime<Utc>, tz: &Tz) {
        self.views = derive(&self.records, &self.filter, now, tz);
        self.pagination.reset();
        log::debug!(
            "derived views: {} of {} records pass filter (search '{}', range {})",
            self.views.filtered.len(),
            self.records.len(),
            self.filter.search_term,
            self.filter.time_range
        );
    }

    pub fn current_page(&self) -> usize {
        self.pagination.current_page()
    }

    pub fn total_pages(&self) -> usize {
        self.pagination.total_pages(self.views.filtered.len())
    }

    pub fn page(&self) -> &[LogRecord] {
        self.pagination.slice(&self.views.filtered)
    }

    /// Jumps to `page`; ignored when out of range.
    pub fn paginate(&mut self, page: usize) -> bool {
        self.pagination.paginate(page, self.views.filtered.len())
    }

    pub fn next_page(&mut self) -> bool {
        self.pagination.next(self.views.filtered.len())
    }

    pub fn previous_page(&mut self) -> bool {
        self.pagination.previous(self.views.filtered.len())
    }
}
