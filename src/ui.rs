use crate::aggregate::{NamedCounts, ServerPair};
use crate::app::{hex_color, App, Mode, Tab};
use crate::timestamp::display_time;
use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};

const SERVER1_COLOR: Color = Color::Rgb(0x63, 0x66, 0xF1);
const SERVER2_COLOR: Color = Color::Rgb(0x10, 0xB9, 0x81);
const BAR_WIDTH: usize = 30;

pub fn draw(f: &mut Frame, app: &mut App) {
    if let Some(ref error) = app.error_message {
        draw_error(f, error);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(f.size());

    draw_header(f, chunks[0], app);
    draw_tabs(f, chunks[1], app);
    match app.tab {
        Tab::Overview => draw_overview(f, chunks[2], app),
        Tab::Traffic => draw_traffic(f, chunks[2], app),
        Tab::Errors => draw_errors(f, chunks[2], app),
        Tab::Logs => draw_logs(f, chunks[2], app),
    }
    draw_footer(f, chunks[3], app);

    if app.mode == Mode::Search {
        draw_input_popup(f, app);
    } else if app.mode == Mode::Details {
        draw_detail_popup(f, app);
    }
}

fn draw_error(f: &mut Frame, error: &str) {
    let area = centered_rect(60, 30, f.size());
    let text = Text::from(vec![
        Line::from(Span::styled(
            "Error",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(error.to_string()),
        Line::from(""),
        Line::from("r: Retry | q: Quit"),
    ]);
    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let status_text = if app.loading {
        " [Loading...] ".to_string()
    } else if let Some(ref updated) = app.last_update {
        format!(" [Updated {}] ", updated.format("%H:%M:%S"))
    } else {
        String::new()
    };

    let info = match app.server_info {
        Some(ref info) => format!(
            "Node {} | {} ({})",
            info.node_version, info.student.full_name, info.student.group
        ),
        None => "No server info".to_string(),
    };

    let filter = app.dashboard.filter();
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "Server Comparison",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(info, Style::default().fg(Color::Gray)),
        Span::raw(" | "),
        Span::styled(
            format!("Range: {}", filter.time_range),
            Style::default().fg(Color::Magenta),
        ),
        Span::raw(" | "),
        Span::styled(
            format!(
                "{}/{} logs",
                app.dashboard.filtered().len(),
                app.dashboard.records().len()
            ),
            Style::default().fg(Color::Green),
        ),
        Span::styled(status_text, Style::default().fg(Color::Yellow)),
    ]))
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Left);

    f.render_widget(header, area);
}

fn draw_tabs(f: &mut Frame, area: Rect, app: &App) {
    let titles: Vec<Line> = Tab::ALL.iter().map(|tab| Line::from(tab.title())).collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL))
        .select(app.tab.index())
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, area);
}

fn draw_overview(f: &mut Frame, area: Rect, app: &App) {
    let views = app.dashboard.views();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(4)])
        .split(chunks[0]);

    let totals = &views.total_requests;
    let stats = Text::from(vec![
        stat_line("Total requests", totals.server1.to_string(), totals.server2.to_string()),
        stat_line(
            "Avg response",
            format!("{} ms", views.average_response_time.server1),
            format!("{} ms", views.average_response_time.server2),
        ),
        stat_line(
            "Error rate",
            format!("{:.1}%", views.error_rate.server1),
            format!("{:.1}%", views.error_rate.server2),
        ),
        stat_line(
            "Success rate",
            format!("{:.1}%", views.success_rate.server1),
            format!("{:.1}%", views.success_rate.server2),
        ),
        Line::from(format!("All servers: {} requests", totals.total)),
    ]);
    f.render_widget(
        Paragraph::new(stats).block(titled("Summary  (server 1 / server 2)")),
        left[0],
    );

    let memory: Vec<Line> = views
        .memory_usage
        .iter()
        .map(|row| {
            Line::from(vec![
                Span::raw(format!("{:<14}", row.name)),
                Span::styled(format!("{:>9.1} MB", row.usage.server1), Style::default().fg(SERVER1_COLOR)),
                Span::raw(" / "),
                Span::styled(format!("{:>9.1} MB", row.usage.server2), Style::default().fg(SERVER2_COLOR)),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(memory).block(titled("Memory usage")), left[1]);

    let hourly: Vec<(String, ServerPair<usize>)> = views
        .hourly_traffic
        .iter()
        .map(|hour| (hour.hour.clone(), hour.counts))
        .collect();
    f.render_widget(
        Paragraph::new(bar_lines(&hourly)).block(titled("Hourly traffic")),
        chunks[1],
    );
}

fn draw_traffic(f: &mut Frame, area: Rect, app: &App) {
    let views = app.dashboard.views();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let top = halves(rows[0]);
    let bottom = halves(rows[1]);

    let status: Vec<(String, ServerPair<usize>)> = views
        .status_distribution
        .iter()
        .map(|bucket| (bucket.name.to_string(), bucket.counts))
        .collect();
    f.render_widget(
        Paragraph::new(bar_lines(&status)).block(titled("Status codes")),
        top[0],
    );
    f.render_widget(
        Paragraph::new(bar_lines(&named(&views.methods))).block(titled("HTTP methods")),
        top[1],
    );
    f.render_widget(
        Paragraph::new(bar_lines(&named(&views.response_times))).block(titled("Response times")),
        bottom[0],
    );
    f.render_widget(
        Paragraph::new(bar_lines(&named(&views.top_paths))).block(titled("Top paths")),
        bottom[1],
    );
}

fn draw_errors(f: &mut Frame, area: Rect, app: &App) {
    let views = app.dashboard.views();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let top = halves(rows[0]);
    let bottom = halves(rows[1]);

    let errors = if views.errors_by_status.is_empty() {
        vec![Line::from("No error data available")]
    } else {
        bar_lines(&named(&views.errors_by_status))
    };
    f.render_widget(Paragraph::new(errors).block(titled("Errors by status code")), top[0]);

    let levels: Vec<Line> = views
        .log_levels
        .iter()
        .map(|level| {
            Line::from(vec![
                Span::styled(format!("{:<10}", level.name), Style::default().fg(hex_color(level.color))),
                Span::styled(format!("{:>6}", level.counts.server1), Style::default().fg(SERVER1_COLOR)),
                Span::raw(" / "),
                Span::styled(format!("{:<6}", level.counts.server2), Style::default().fg(SERVER2_COLOR)),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(levels).block(titled("Log levels")), top[1]);

    for (slot, (title, slices)) in [
        ("Server 1 levels", &views.log_level_pie.server1),
        ("Server 2 levels", &views.log_level_pie.server2),
    ]
    .into_iter()
    .enumerate()
    {
        let total: usize = slices.iter().map(|slice| slice.value).sum();
        let lines: Vec<Line> = if total == 0 {
            vec![Line::from("No data")]
        } else {
            slices
                .iter()
                .map(|slice| {
                    Line::from(format!(
                        "{:<10} {:>5}  {:>5.1}%",
                        slice.name,
                        slice.value,
                        slice.value as f64 / total as f64 * 100.0
                    ))
                })
                .collect()
        };
        f.render_widget(Paragraph::new(lines).block(titled(title)), bottom[slot]);
    }
}

fn draw_logs(f: &mut Frame, area: Rect, app: &mut App) {
    let page = app.dashboard.page();

    if page.is_empty() {
        let empty_msg = if app.loading {
            "Loading logs..."
        } else {
            "No logs found. Press 'r' to refresh or 1/2/3 for demo data."
        };
        let paragraph = Paragraph::new(empty_msg)
            .block(titled("Logs"))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = page
        .iter()
        .enumerate()
        .map(|(i, log)| {
            let level = log.log_level.as_deref().unwrap_or("-");
            let status = log.status.map_or("-".to_string(), |s| s.to_string());
            let content = Line::from(vec![
                Span::styled(
                    format!("{:<9}", display_time(&log.timestamp, &Local)),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw(" "),
                Span::styled(
                    format!("{:<9}", log.server().label()),
                    Style::default().fg(if log.server_id == Some(2) { SERVER2_COLOR } else { SERVER1_COLOR }),
                ),
                Span::raw(" "),
                Span::styled(
                    format!("{:<7}", log.method.as_deref().unwrap_or("-")),
                    Style::default().fg(Color::Magenta),
                ),
                Span::raw(format!("{:<24} ", log.path.as_deref().unwrap_or("-"))),
                Span::styled(format!("{:<4}", status), Style::default().fg(status_color(log.status))),
                Span::raw(" "),
                Span::styled(
                    format!("{:<6}", level),
                    Style::default()
                        .fg(app.get_log_level_color(log.log_level.as_deref()))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(
                    " {}",
                    log.response_time.map_or("-".to_string(), |ms| format!("{} ms", ms))
                )),
            ]);

            let style = if i == app.selected_index {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(content).style(style)
        })
        .collect();

    let filter = app.dashboard.filter();
    let mut title = format!(
        "Logs - page {} of {} - showing {} of {}",
        app.dashboard.current_page(),
        app.dashboard.total_pages(),
        page.len(),
        app.dashboard.filtered().len()
    );
    if !filter.search_term.is_empty() {
        title.push_str(&format!(" (Search: '{}')", filter.search_term));
    }

    let logs_list = List::new(items)
        .block(titled(title))
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut list_state = ListState::default();
    list_state.select(Some(app.selected_index));

    f.render_stateful_widget(logs_list, area, &mut list_state);
}

fn draw_footer(f: &mut Frame, area: Rect, app: &App) {
    let help_text = match app.mode {
        Mode::Normal => {
            "Tab/←/→: Switch tab | ↑/↓: Navigate | n/p: Page | Enter: Details | /: Search | c: Clear | t: Time range | r: Refresh | 1/2/3: Demo data | q: Quit"
        }
        Mode::Search => "Type search term | Enter: Apply | Esc: Cancel",
        Mode::Details => "Enter/Esc: Close details",
    };

    let footer = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(footer, area);
}

fn draw_input_popup(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 20, f.size());
    f.render_widget(Clear, area);

    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(titled("Search path, method, level or status"));

    f.render_widget(input, area);

    let (x, y) = input_cursor(area, &app.input_buffer);
    f.set_cursor(x, y);
}

/// Cursor cell just past the typed text, inside the popup border.
fn input_cursor(area: Rect, input: &str) -> (u16, u16) {
    (area.x + input.chars().count() as u16 + 1, area.y + 1)
}

fn draw_detail_popup(f: &mut Frame, app: &App) {
    if let Some(log) = app.selected_record() {
        let area = centered_rect(80, 50, f.size());
        f.render_widget(Clear, area);

        let field = |name: &str, value: String| {
            Line::from(vec![
                Span::styled(format!("{}: ", name), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(value),
            ])
        };
        let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

        let mut lines = vec![
            field("Id", or_dash(log.id.as_ref().map(|id| id.to_string()))),
            field("Server", log.server().label().to_string()),
            field("Time", display_time(&log.timestamp, &Local)),
            field("Method", or_dash(log.method.clone())),
            field("Path", or_dash(log.path.clone())),
            field("Status", or_dash(log.status.map(|s| s.to_string()))),
            field("Response time", or_dash(log.response_time.map(|ms| format!("{} ms", ms)))),
            field("Level", or_dash(log.log_level.clone())),
        ];
        if let Some(ref system) = log.system {
            lines.push(field("Environment", or_dash(system.environment.clone())));
            lines.push(field("Node", or_dash(system.node_version.clone())));
            if let Some(ref memory) = system.memory_usage {
                for (region, bytes) in memory {
                    lines.push(field(region, format!("{:.1} MB", bytes / 1024.0 / 1024.0)));
                }
            }
        }

        let detail = Paragraph::new(Text::from(lines))
            .block(titled("Log Details"))
            .wrap(Wrap { trim: true });

        f.render_widget(detail, area);
    }
}

fn status_color(status: Option<i64>) -> Color {
    match status {
        Some(s) if s >= 500 => Color::Red,
        Some(s) if s >= 400 => Color::Yellow,
        Some(_) => Color::Green,
        None => Color::Gray,
    }
}

fn stat_line(label: &str, server1: String, server2: String) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!("{:<15}", label)),
        Span::styled(format!("{:>10}", server1), Style::default().fg(SERVER1_COLOR)),
        Span::raw(" / "),
        Span::styled(server2, Style::default().fg(SERVER2_COLOR)),
    ])
}

fn named(rows: &[NamedCounts]) -> Vec<(String, ServerPair<usize>)> {
    rows.iter().map(|row| (row.name.clone(), row.counts)).collect()
}

/// One line per row with a bar per server, scaled to the largest count.
fn bar_lines(rows: &[(String, ServerPair<usize>)]) -> Vec<Line<'static>> {
    let max = rows
        .iter()
        .map(|(_, counts)| counts.server1.max(counts.server2))
        .max()
        .unwrap_or(0)
        .max(1);
    let scaled = |count: usize| "█".repeat((count * BAR_WIDTH).div_ceil(max));

    rows.iter()
        .map(|(label, counts)| {
            Line::from(vec![
                Span::raw(format!("{:<22}", label)),
                Span::styled(scaled(counts.server1), Style::default().fg(SERVER1_COLOR)),
                Span::raw(format!(" {} ", counts.server1)),
                Span::styled(scaled(counts.server2), Style::default().fg(SERVER2_COLOR)),
                Span::raw(format!(" {}", counts.server2)),
            ])
        })
        .collect()
}

fn titled<'a>(title: impl Into<Line<'a>>) -> Block<'a> {
    Block::default().borders(Borders::ALL).title(title)
}

fn halves(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area)
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
