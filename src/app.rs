use crate::aggregate::Level;
use crate::api::{ApiClient, ServerInfo};
use crate::dashboard::Dashboard;
use crate::filter::TimeRange;
use crate::generator::RecordGenerator;
use crate::record::LogRecord;
use chrono::{DateTime, Local, Utc};
use ratatui::style::Color;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Normal,
    Search,
    Details,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tab {
    Overview,
    Traffic,
    Errors,
    Logs,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Overview, Tab::Traffic, Tab::Errors, Tab::Logs];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Traffic => "Traffic",
            Tab::Errors => "Errors",
            Tab::Logs => "Logs",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Overview => 0,
            Tab::Traffic => 1,
            Tab::Errors => 2,
            Tab::Logs => 3,
        }
    }

    fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    fn previous(self) -> Self {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

/// Which demo data set to append.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DemoData {
    Traffic,
    HourlyTraffic,
    Errors,
}

pub struct App {
    pub dashboard: Dashboard,
    pub api_client: ApiClient,
    pub server_info: Option<ServerInfo>,
    pub mode: Mode,
    pub tab: Tab,
    /// Row selected within the current page.
    pub selected_index: usize,
    pub input_buffer: String,
    pub loading: bool,
    pub error_message: Option<String>,
    pub last_update: Option<DateTime<Local>>,
}

impl App {
    pub fn new(api_client: ApiClient, time_range: TimeRange) -> Self {
        Self {
            dashboard: Dashboard::new(time_range),
            api_client,
            server_info: None,
            mode: Mode::Normal,
            tab: Tab::Overview,
            selected_index: 0,
            input_buffer: String::new(),
            loading: false,
            error_message: None,
            last_update: None,
        }
    }

    /// Full reload of logs and server info. On failure nothing is kept and the
    /// error screen takes over until the next successful refresh.
    pub async fn refresh(&mut self) {
        self.loading = true;

        match self.api_client.fetch_snapshot().await {
            Ok(snapshot) => {
                log::info!(
                    "loaded {} records from {}",
                    snapshot.logs.len(),
                    self.api_client.base_url()
                );
                self.dashboard.replace_records(snapshot.logs);
                self.server_info = Some(snapshot.info);
                self.error_message = None;
                self.last_update = Some(Local::now());
                self.selected_index = 0;
            }
            Err(e) => {
                log::error!("refresh failed: {:#}", e);
                self.error_message = Some(format!("Failed to fetch data: {:#}", e));
            }
        }

        self.loading = false;
    }

    pub fn add_demo_data(&mut self, kind: DemoData) {
        let mut generator = RecordGenerator::new(Utc::now());
        let records = match kind {
            DemoData::Traffic => generator.traffic(),
            DemoData::HourlyTraffic => generator.hourly_traffic(),
            DemoData::Errors => generator.errors(),
        };
        log::info!("appending {} demo records ({:?})", records.len(), kind);
        self.dashboard.append_records(records);
        self.selected_index = 0;
    }

    pub fn next_tab(&mut self) {
        self.tab = self.tab.next();
    }

    pub fn previous_tab(&mut self) {
        self.tab = self.tab.previous();
    }

    pub fn cycle_time_range(&mut self) {
        let next = self.dashboard.filter().time_range.next();
        self.dashboard.set_time_range(next);
        self.selected_index = 0;
    }

    pub fn next_page(&mut self) {
        if self.dashboard.next_page() {
            self.selected_index = 0;
        }
    }

    pub fn previous_page(&mut self) {
        if self.dashboard.previous_page() {
            self.selected_index = 0;
        }
    }

    pub fn move_selection_up(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    pub fn move_selection_down(&mut self) {
        if self.selected_index + 1 < self.dashboard.page().len() {
            self.selected_index += 1;
        }
    }

    pub fn enter_search_mode(&mut self) {
        self.mode = Mode::Search;
        self.input_buffer = self.dashboard.filter().search_term.clone();
    }

    pub fn enter_details_mode(&mut self) {
        if self.tab == Tab::Logs && self.selected_record().is_some() {
            self.mode = Mode::Details;
        }
    }

    pub fn exit_mode(&mut self) {
        self.mode = Mode::Normal;
        self.input_buffer.clear();
    }

    pub fn handle_input_char(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    pub fn handle_backspace(&mut self) {
        self.input_buffer.pop();
    }

    pub fn execute_search(&mut self) {
        let term = std::mem::take(&mut self.input_buffer);
        self.dashboard.set_search_term(term);
        self.mode = Mode::Normal;
        self.selected_index = 0;
    }

    pub fn clear_search(&mut self) {
        self.dashboard.set_search_term("");
        self.mode = Mode::Normal;
        self.selected_index = 0;
    }

    pub fn selected_record(&self) -> Option<&LogRecord> {
        self.dashboard.page().get(self.selected_index)
    }

    pub fn get_log_level_color(&self, level: Option<&str>) -> Color {
        hex_color(Level::classify(level).color())
    }
}

/// Parses `#RRGGBB`, falling back to gray.
pub fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        digits
            .get(range)
            .and_then(|part| u8::from_str_radix(part, 16).ok())
    };
    match (digits.len(), channel(0..2), channel(2..4), channel(4..6)) {
        (6, Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Gray,
    }
}
