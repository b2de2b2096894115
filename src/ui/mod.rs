use crate::app::{AppMode, AppState, STATUS_HEIGHT};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

pub mod canvas;
pub mod constants;
pub mod help;
pub mod mindmap;
pub mod status_line;
pub mod text;
pub mod theme;


use help::HelpRenderer;
use mindmap::MindMapRenderer;
use status_line::StatusLineRenderer;

pub fn render(frame: &mut Frame, app: &mut AppState) {
    // Keep the engine canvas in step with the terminal size
    let size = frame.area();
    if size.width != app.terminal_width || size.height != app.terminal_height {
        app.resize(size.width, size.height);
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(STATUS_HEIGHT)])
        .split(size);

    match &app.mode {
        AppMode::Help => HelpRenderer::render(frame, chunks[0]),
        _ => MindMapRenderer::new(app).render(frame, chunks[0]),
    }

    StatusLineRenderer::render(frame, app, chunks[1]);
}
