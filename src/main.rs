use mindmap_rs::{actions, app, config, event, logging, parser, ui};

use anyhow::Result;
use app::AppState;
use clap::Parser;
use config::{load_config, CliArgs};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Instant;
use tracing::{error, info};

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let config = load_config(&args)?;

    if args.debug_config {
        println!("Configuration:");
        println!("{:#?}", config);
        return Ok(());
    }

    let log_path = logging::init(&config.logging)?;
    info!(log = ?log_path, "starting mindmap-rs");

    let mut app = AppState::new(config);

    // Startup file: load it, or remember it as the save target
    if let Some(path) = app.config.startup_file().cloned() {
        if path.exists() {
            let map = parser::load_file(&path)?;
            app.load_map(map, Some(path));
        } else {
            app.filename = Some(path);
        }
    }

    if let Some(topic) = &args.topic {
        app.request_generation(topic);
    }

    // Raw mode, alternate screen and mouse reporting
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.clear()?;

    let res = run_app(&mut terminal, &mut app);
    app.controller.teardown();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "main loop failed");
        eprintln!("Error: {}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
) -> Result<()> {
    while app.running {
        terminal.draw(|frame| ui::render(frame, app))?;

        if let Some(action) = event::handle_events(app)? {
            if let Err(e) = actions::execute_action(action, app) {
                app.set_message(format!("Error: {}", e));
            }
        }

        // Long presses and backend responses
        app.tick(Instant::now());
    }

    Ok(())
}
