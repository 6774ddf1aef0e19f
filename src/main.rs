use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log_dashboard::{
    api::ApiClient,
    app::{App, DemoData, Mode},
    config::Config,
    filter::TimeRange,
    ui,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{fs::File, io, time::Duration};

/// Command-line arguments. Anything given here wins over the config file.
#[derive(Parser)]
#[command(name = "log-dashboard")]
#[command(about = "Compare request logs of a rate-limited and an unlimited server")]
struct Args {
    /// Path to configuration file (.env format)
    #[arg(short, long, default_value = "config.env")]
    config: String,
    /// Backend base URL, e.g. http://localhost:3002
    #[arg(short, long)]
    api_url: Option<String>,
    /// Initial time range: 1h, 6h, 24h, 7d or all
    #[arg(short, long)]
    time_range: Option<TimeRange>,
    /// Write logs to this file
    #[arg(short, long)]
    log_file: Option<String>,
    /// Start with generated demo data instead of fetching
    #[arg(short, long, default_value_t = false)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }
    if let Some(time_range) = args.time_range {
        config.time_range = time_range;
    }
    if let Some(log_file) = args.log_file {
        config.log_file = Some(log_file.into());
    }

    init_logging(&config)?;
    log::info!("Starting dashboard against {}", config.api_url);

    let api_client = ApiClient::new(config.api_url.clone())?;
    let mut app = App::new(api_client, config.time_range);

    if args.demo {
        app.add_demo_data(DemoData::Traffic);
        app.add_demo_data(DemoData::HourlyTraffic);
        app.add_demo_data(DemoData::Errors);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    if !args.demo {
        app.loading = true;
        terminal.draw(|f| ui::draw(f, &mut app))?;
        app.refresh().await;
    }

    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("terminal failure: {}", err);
        println!("{:?}", err)
    }

    log::info!("Dashboard stopped");
    Ok(())
}

/// Sends `log` output to the configured file. Without one logging is off
/// unless RUST_LOG asks for it, since the terminal belongs to the UI.
fn init_logging(config: &Config) -> Result<()> {
    let default_filter = if config.log_file.is_some() { "info" } else { "off" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));

    if let Some(ref path) = config.log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

/// Runs the event loop of the dashboard.
///
/// Rendering happens every 250ms or after a key press. Refreshing is
/// awaited in place, so a newer refresh always lands after an older one.
///
/// # Keyboard Controls
///
/// **Error screen:**
/// - `r` - Retry the full load
/// - `q` - Quit application
///
/// **Normal Mode:**
/// - `q` - Quit application
/// - `Tab/Right`, `BackTab/Left` - Switch tab
/// - `Up/Down` - Navigate log entries on the current page
/// - `n/p` - Next / previous page
/// - `Enter` - View log details (Logs tab)
/// - `/` - Enter search mode
/// - `c` - Clear search
/// - `t` - Cycle time range
/// - `r` - Refresh from the backend
/// - `1/2/3` - Append demo traffic / hourly traffic / error records
///
/// **Search Mode:**
/// - `Enter` - Apply search
/// - `Esc` - Cancel input
/// - `Backspace` - Delete character
/// - Characters - Input text
///
/// **Details Mode:**
/// - `Esc/Enter` - Close details
async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if !event::poll(tick_rate)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if app.error_message.is_some() {
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Char('r') => {
                    app.loading = true;
                    terminal.draw(|f| ui::draw(f, app))?;
                    app.refresh().await;
                }
                _ => {}
            }
            continue;
        }

        match app.mode {
            Mode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Tab | KeyCode::Right => app.next_tab(),
                KeyCode::BackTab | KeyCode::Left => app.previous_tab(),
                KeyCode::Up => app.move_selection_up(),
                KeyCode::Down => app.move_selection_down(),
                KeyCode::Char('n') => app.next_page(),
                KeyCode::Char('p') => app.previous_page(),
                KeyCode::Char('/') => app.enter_search_mode(),
                KeyCode::Char('c') => app.clear_search(),
                KeyCode::Char('t') => app.cycle_time_range(),
                KeyCode::Char('r') => {
                    app.loading = true;
                    terminal.draw(|f| ui::draw(f, app))?;
                    app.refresh().await;
                }
                KeyCode::Char('1') => app.add_demo_data(DemoData::Traffic),
                KeyCode::Char('2') => app.add_demo_data(DemoData::HourlyTraffic),
                KeyCode::Char('3') => app.add_demo_data(DemoData::Errors),
                KeyCode::Enter => app.enter_details_mode(),
                _ => {}
            },
            Mode::Search => match key.code {
                KeyCode::Enter => app.execute_search(),
                KeyCode::Esc => app.exit_mode(),
                KeyCode::Char(c) => app.handle_input_char(c),
                KeyCode::Backspace => app.handle_backspace(),
                _ => {}
            },
            Mode::Details => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                    app.exit_mode();
                }
            }
        }
    }
}
