use anyhow::Result;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::time::Duration;
use transit_map::app::App;
use transit_map::config::AppConfig;
use transit_map::env::{Capabilities, Environment, TerminalCapabilities};
use transit_map::map::bounds::GeoPoint;
use transit_map::map::MapProps;
use transit_map::{history, logging, ui};

/// Terminal transit map.
#[derive(Parser)]
#[command(name = "transit-map", version, about)]
struct Args {
    /// Path to the config file (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory with overlay GeoJSON data.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Render a single frame without a terminal and exit.
    #[arg(long)]
    headless: bool,

    /// Initial center latitude (requires --lon).
    #[arg(long)]
    lat: Option<f64>,

    /// Initial center longitude (requires --lat).
    #[arg(long)]
    lon: Option<f64>,

    /// Initial zoom level.
    #[arg(long)]
    zoom: Option<f64>,

    /// Do not show the stop marker overlay.
    #[arg(long)]
    hide_stops: bool,

    /// Origin marker latitude (requires --origin-lon).
    #[arg(long)]
    origin_lat: Option<f64>,

    /// Origin marker longitude (requires --origin-lat).
    #[arg(long)]
    origin_lon: Option<f64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_tracing();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }

    // Environment is classified exactly once; so is the history backend.
    let caps = TerminalCapabilities::detect(args.headless);
    let environment = Environment::classify(&caps);
    let history =
        history::create_history(environment, &config.app_path, &config.history_state_file())?;

    let props = MapProps {
        lat: args.lat,
        lon: args.lon,
        zoom: args.zoom,
        show_stops: !args.hide_stops,
        show_scale_bar: true,
        ..Default::default()
    };

    let mut app = App::new(&config, &caps, history, props)?;
    if let (Some(lat), Some(lon)) = (args.origin_lat, args.origin_lon) {
        app.set_origin(Some(GeoPoint::new(lat, lon)));
    }

    if !caps.is_interactive() {
        return run_headless(app);
    }

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, app);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Single-pass render into an off-screen buffer; the map slot stays empty
/// and only the static wrapper appears.
fn run_headless(mut app: App) -> Result<()> {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    let mut terminal = Terminal::new(TestBackend::new(80, 24))?;
    app.resize(80, 24);
    app.update();
    terminal.draw(|frame| ui::render(frame, &app))?;
    tracing::info!("headless render complete");
    Ok(())
}

/// Handle mouse events for panning, zooming and row activation.
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        // Scroll wheel zooms towards the pointer.
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll pans (trackpad two-finger swipe).
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => {
            let rows_start = ui::rows_panel_start(app.terminal_size.1, app.rows.len());
            if mouse.row >= rows_start {
                app.activate_at(mouse.row);
            } else {
                app.last_mouse = Some((mouse.column, mouse.row));
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
    let size = terminal.size()?;
    app.resize(size.width, size.height);

    // Main loop
    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                            // Pan with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                            KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                            KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                            KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                            // Zoom
                            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                            // Row selection and navigation
                            KeyCode::Tab => app.select_next_row(),
                            KeyCode::BackTab => app.select_prev_row(),
                            KeyCode::Enter => app.activate_selected(),
                            KeyCode::Backspace => app.navigate_back(),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse(&mut app, mouse);
                }
                Event::Resize(width, height) => {
                    app.resize(width, height);
                }
                _ => {}
            }
        }

        // Drain lazy overlay loads and queued intents
        app.update();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
