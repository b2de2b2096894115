use crate::actions::Action;
use crate::app::{AppMode, AppState};
use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use std::time::Duration;

/// Waits up to one tick for input and maps it to an action.
pub fn handle_events(app: &mut AppState) -> Result<Option<Action>> {
    let timeout = Duration::from_millis(app.config.terminal.tick_rate_ms);
    if event::poll(timeout)? {
        match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                return Ok(handle_key_event(app, key));
            }
            Event::Mouse(mouse) => return Ok(handle_mouse_event(app, mouse)),
            Event::Resize(width, height) => app.resize(width, height),
            _ => {}
        }
    }
    Ok(None)
}

pub fn handle_key_event(app: &AppState, key: KeyEvent) -> Option<Action> {
    match &app.mode {
        AppMode::Normal => handle_normal_mode(key),
        AppMode::Editing { .. } => handle_editing_mode(key),
        AppMode::Search { .. } => handle_search_mode(key),
        AppMode::Help => handle_help_mode(key),
    }
}

/// Mouse input only reaches the map in normal mode. Button releases always
/// get through so a drag that started before a mode switch still ends.
pub fn handle_mouse_event(app: &AppState, mouse: MouseEvent) -> Option<Action> {
    match mouse.kind {
        MouseEventKind::Up(MouseButton::Left) => return Some(Action::TouchUp),
        MouseEventKind::Up(MouseButton::Right) => return Some(Action::PointerUp),
        _ => {}
    }
    if app.mode != AppMode::Normal {
        return None;
    }
    let (column, row) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(Action::TouchDown { column, row }),
        MouseEventKind::Drag(MouseButton::Left) => Some(Action::TouchDrag { column, row }),
        MouseEventKind::Down(MouseButton::Right) => Some(Action::PointerDown { column, row }),
        MouseEventKind::Drag(MouseButton::Right) => Some(Action::PointerDrag { column, row }),
        MouseEventKind::ScrollUp => Some(Action::Scroll {
            column,
            row,
            notches: -1,
        }),
        MouseEventKind::ScrollDown => Some(Action::Scroll {
            column,
            row,
            notches: 1,
        }),
        _ => None,
    }
}

fn handle_normal_mode(key: KeyEvent) -> Option<Action> {
    use KeyCode::*;

    match (key.code, key.modifiers) {
        // Quit
        (Char('q'), KeyModifiers::NONE) => Some(Action::Quit),
        (Char('c'), KeyModifiers::CONTROL) => Some(Action::Quit),

        // Panning (must come before general arrow key handling)
        (Left, KeyModifiers::SHIFT) | (Char('H'), KeyModifiers::SHIFT) => {
            Some(Action::Pan { dx: 1, dy: 0 })
        }
        (Right, KeyModifiers::SHIFT) | (Char('L'), KeyModifiers::SHIFT) => {
            Some(Action::Pan { dx: -1, dy: 0 })
        }
        (Up, KeyModifiers::SHIFT) => Some(Action::Pan { dx: 0, dy: 1 }),
        (Down, KeyModifiers::SHIFT) => Some(Action::Pan { dx: 0, dy: -1 }),

        // Movement
        (Char('h'), KeyModifiers::NONE) | (Left, _) => Some(Action::GoLeft),
        (Char('j'), KeyModifiers::NONE) | (Down, _) => Some(Action::GoDown),
        (Char('k'), KeyModifiers::NONE) | (Up, _) => Some(Action::GoUp),
        (Char('l'), KeyModifiers::NONE) | (Right, _) => Some(Action::GoRight),
        (Tab, KeyModifiers::NONE) => Some(Action::SelectNext),
        (BackTab, _) => Some(Action::SelectPrevious),
        (Char('m'), KeyModifiers::NONE) | (Char('~'), KeyModifiers::NONE) => Some(Action::GoToRoot),

        // Node manipulation
        (Char('o'), KeyModifiers::NONE) | (Enter, KeyModifiers::NONE) => {
            Some(Action::InsertSibling)
        }
        (Char('O'), KeyModifiers::SHIFT) | (Char('a'), KeyModifiers::NONE) => {
            Some(Action::InsertChild)
        }
        (Char('d'), KeyModifiers::NONE) | (Delete, _) => Some(Action::DeleteNode),
        (Char('J'), KeyModifiers::SHIFT) => Some(Action::MoveNodeDown),
        (Char('K'), KeyModifiers::SHIFT) => Some(Action::MoveNodeUp),
        (Char('e'), KeyModifiers::NONE) | (Char('i'), KeyModifiers::NONE) => {
            Some(Action::EditNode)
        }

        // Collapsing
        (Char(' '), KeyModifiers::NONE) => Some(Action::ToggleCollapse),
        (Char('v'), KeyModifiers::NONE) => Some(Action::CollapseAll),
        (Char('b'), KeyModifiers::NONE) => Some(Action::ExpandAll),
        (Char('1'), KeyModifiers::NONE) => Some(Action::CollapseToLevel(1)),
        (Char('2'), KeyModifiers::NONE) => Some(Action::CollapseToLevel(2)),
        (Char('3'), KeyModifiers::NONE) => Some(Action::CollapseToLevel(3)),
        (Char('4'), KeyModifiers::NONE) => Some(Action::CollapseToLevel(4)),
        (Char('5'), KeyModifiers::NONE) => Some(Action::CollapseToLevel(5)),

        // Viewport
        (Char('+'), _) | (Char('='), KeyModifiers::NONE) => Some(Action::ZoomIn),
        (Char('-'), KeyModifiers::NONE) => Some(Action::ZoomOut),
        (Char('0'), KeyModifiers::NONE) => Some(Action::ResetView),
        (Char('f'), KeyModifiers::NONE) => Some(Action::FitToScreen),
        (Char('r'), KeyModifiers::NONE) => Some(Action::ToggleLayout),

        // Search
        (Char('/'), KeyModifiers::NONE) | (Char('f'), KeyModifiers::CONTROL) => {
            Some(Action::Search)
        }
        (Char('n'), KeyModifiers::NONE) => Some(Action::NextSearchResult),
        (Char('N'), KeyModifiers::SHIFT) => Some(Action::PreviousSearchResult),
        (Esc, _) => Some(Action::ClearSearch),

        // Generation
        (Char('g'), KeyModifiers::NONE) => Some(Action::Generate),

        // File operations
        (Char('s'), KeyModifiers::NONE) | (Char('s'), KeyModifiers::CONTROL) => Some(Action::Save),
        (Char('x'), KeyModifiers::NONE) => Some(Action::ExportJson),
        (Char('X'), KeyModifiers::SHIFT) => Some(Action::ExportOutline),

        // Help
        (Char('?'), _) => Some(Action::ShowHelp),

        _ => None,
    }
}

fn handle_editing_mode(key: KeyEvent) -> Option<Action> {
    use KeyCode::*;

    match (key.code, key.modifiers) {
        (Esc, _) => Some(Action::CancelEdit),
        (Enter, _) => Some(Action::ConfirmEdit),
        (Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => Some(Action::TypeChar(c)),

        // Deletion
        (Backspace, _) => Some(Action::Backspace),
        (Delete, _) => Some(Action::Delete),

        // Movement
        (Left, _) => Some(Action::MoveCursorLeft),
        (Right, _) => Some(Action::MoveCursorRight),
        (Home, _) | (Char('a'), KeyModifiers::CONTROL) => Some(Action::MoveCursorHome),
        (End, _) | (Char('e'), KeyModifiers::CONTROL) => Some(Action::MoveCursorEnd),

        _ => None,
    }
}

fn handle_search_mode(key: KeyEvent) -> Option<Action> {
    use KeyCode::*;

    match key.code {
        Esc => Some(Action::CancelSearch),
        Enter => Some(Action::ConfirmSearch),
        Char(c) => Some(Action::TypeSearchChar(c)),
        Backspace => Some(Action::BackspaceSearch),
        _ => None,
    }
}

fn handle_help_mode(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => Some(Action::CloseHelp),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::EditTarget;
    use crate::config::AppConfig;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_normal_mode_keys() {
        let app = AppState::new(AppConfig::default());
        let press = |code, modifiers| handle_key_event(&app, key(code, modifiers));

        assert_eq!(press(KeyCode::Char('q'), KeyModifiers::NONE), Some(Action::Quit));
        assert_eq!(press(KeyCode::Left, KeyModifiers::NONE), Some(Action::GoLeft));
        assert_eq!(
            press(KeyCode::Left, KeyModifiers::SHIFT),
            Some(Action::Pan { dx: 1, dy: 0 })
        );
        assert_eq!(
            press(KeyCode::Char('3'), KeyModifiers::NONE),
            Some(Action::CollapseToLevel(3))
        );
        assert_eq!(press(KeyCode::Char('+'), KeyModifiers::SHIFT), Some(Action::ZoomIn));
        assert_eq!(press(KeyCode::Char('z'), KeyModifiers::NONE), None);
    }

    #[test]
    fn test_editing_mode_captures_letters() {
        let mut app = AppState::new(AppConfig::default());
        app.start_editing(EditTarget::Topic);
        assert_eq!(
            handle_key_event(&app, key(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(Action::TypeChar('q'))
        );
        assert_eq!(
            handle_key_event(&app, key(KeyCode::Enter, KeyModifiers::NONE)),
            Some(Action::ConfirmEdit)
        );
    }

    #[test]
    fn test_mouse_mapping() {
        let app = AppState::new(AppConfig::default());
        assert_eq!(
            handle_mouse_event(&app, mouse(MouseEventKind::Down(MouseButton::Left), 3, 4)),
            Some(Action::TouchDown { column: 3, row: 4 })
        );
        assert_eq!(
            handle_mouse_event(&app, mouse(MouseEventKind::Drag(MouseButton::Right), 5, 6)),
            Some(Action::PointerDrag { column: 5, row: 6 })
        );
        assert_eq!(
            handle_mouse_event(&app, mouse(MouseEventKind::ScrollUp, 0, 0)),
            Some(Action::Scroll {
                column: 0,
                row: 0,
                notches: -1
            })
        );
    }

    #[test]
    fn test_mouse_ignored_outside_normal_mode() {
        let mut app = AppState::new(AppConfig::default());
        app.mode = AppMode::Help;
        assert_eq!(
            handle_mouse_event(&app, mouse(MouseEventKind::Down(MouseButton::Left), 1, 1)),
            None
        );
        assert_eq!(
            handle_mouse_event(&app, mouse(MouseEventKind::Up(MouseButton::Left), 1, 1)),
            Some(Action::TouchUp)
        );
        assert_eq!(
            handle_mouse_event(&app, mouse(MouseEventKind::Up(MouseButton::Right), 1, 1)),
            Some(Action::PointerUp)
        );
    }
}
