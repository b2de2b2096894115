use crate::app::{AppMode, AppState, EditTarget};
use crate::ui::constants::{
    CURSOR_INDICATOR, STATUS_EDIT_PREFIX, STATUS_NEW_PREFIX, STATUS_SEARCH_PREFIX,
    STATUS_TOPIC_PREFIX,
};
use crate::ui::theme::Palette;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Paragraph,
    Frame,
};

// Status line renderer
pub struct StatusLineRenderer;

impl StatusLineRenderer {
    pub fn render(frame: &mut Frame, app: &AppState, area: Rect) {
        let (content, style) = Self::content_and_style(app, area.width);
        frame.render_widget(Paragraph::new(content).style(style), area);
    }

    pub fn content_and_style(app: &AppState, width: u16) -> (String, Style) {
        let palette = Palette::from(&app.config.theme);
        let input_style = Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD);

        match &app.mode {
            AppMode::Normal => Self::render_normal_mode(app, &palette),
            AppMode::Editing {
                target,
                buffer,
                cursor_pos,
            } => {
                let prefix = match target {
                    EditTarget::Rename(_) => STATUS_EDIT_PREFIX,
                    EditTarget::NewChild(_) | EditTarget::NewSibling(_) => STATUS_NEW_PREFIX,
                    EditTarget::Topic => STATUS_TOPIC_PREFIX,
                };
                (
                    Self::render_input(prefix, buffer, *cursor_pos, width),
                    input_style,
                )
            }
            AppMode::Search { query } => (format!("{}{}", STATUS_SEARCH_PREFIX, query), input_style),
            AppMode::Help => ("Press ESC or q to close help".to_string(), input_style),
        }
    }

    fn render_normal_mode(app: &AppState, palette: &Palette) -> (String, Style) {
        if let Some(ref msg) = app.message {
            let style = Style::default()
                .fg(Color::Black)
                .bg(palette.status)
                .add_modifier(Modifier::BOLD);
            return (msg.clone(), style);
        }

        let controller = &app.controller;
        let map = controller.map();
        let shown = controller.view().visible_ids(map).len();
        let mut content = format!(
            "{} | {}/{} nodes | {:?} | {:.0}%",
            map.root_node().title,
            shown,
            map.len(),
            controller.layout_strategy(),
            controller.viewport().zoom() * 100.0,
        );
        if let Some(node) = controller.view().selected().and_then(|id| map.find_node(id)) {
            content.push_str(" | ");
            content.push_str(&node.title);
        }
        if app.requests.is_pending() {
            content.push_str(" | generating...");
        }
        if app.is_dirty {
            content.push_str(" *");
        }

        (content, Style::default().fg(Color::Gray).bg(Color::Black))
    }

    /// Prefix, then the part of the buffer around the cursor that fits.
    /// Works in characters so multi-byte input never splits.
    fn render_input(prefix: &str, buffer: &str, cursor_pos: usize, width: u16) -> String {
        let chars: Vec<char> = buffer.chars().collect();
        let available = (width as usize)
            .saturating_sub(prefix.chars().count() + 1)
            .max(1);
        let start = if cursor_pos > available.saturating_sub(1) {
            cursor_pos + 1 - available
        } else {
            0
        };
        let end = (start + available).min(chars.len());
        let cursor = cursor_pos.min(chars.len());

        let mut display = String::from(prefix);
        display.extend(&chars[start.min(cursor)..cursor]);
        display.push(CURSOR_INDICATOR);
        if cursor < end {
            display.extend(&chars[cursor..end]);
        }
        display
    }
}
