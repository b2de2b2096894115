use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use tracing::debug;

use crate::app::{AppMode, AppState, EditTarget};
use crate::layout::LayoutStrategy;
use crate::model::NodePatch;
use crate::parser;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Application control
    Quit,

    // Movement
    GoUp,
    GoDown,
    GoLeft,
    GoRight,
    GoToRoot,
    SelectNext,
    SelectPrevious,

    // Node manipulation
    InsertSibling,
    InsertChild,
    DeleteNode,
    MoveNodeUp,
    MoveNodeDown,

    // Editing
    EditNode,
    TypeChar(char),
    Backspace,
    Delete,
    MoveCursorLeft,
    MoveCursorRight,
    MoveCursorHome,
    MoveCursorEnd,
    ConfirmEdit,
    CancelEdit,

    // Tree view
    ToggleCollapse,
    CollapseAll,
    ExpandAll,
    CollapseToLevel(usize),

    // Viewport
    ZoomIn,
    ZoomOut,
    /// Pan by whole steps of `terminal.pan_step_px`.
    Pan { dx: i32, dy: i32 },
    ResetView,
    FitToScreen,
    ToggleLayout,

    // Search
    Search,
    TypeSearchChar(char),
    BackspaceSearch,
    ConfirmSearch,
    CancelSearch,
    ClearSearch,
    NextSearchResult,
    PreviousSearchResult,

    // Generation
    Generate,

    // File operations
    Save,
    ExportJson,
    ExportOutline,

    // Mouse. Left button goes through the touch path, right button pans.
    TouchDown { column: u16, row: u16 },
    TouchDrag { column: u16, row: u16 },
    TouchUp,
    PointerDown { column: u16, row: u16 },
    PointerDrag { column: u16, row: u16 },
    PointerUp,
    Scroll { column: u16, row: u16, notches: i32 },

    // Help
    ShowHelp,
    CloseHelp,
}

pub fn execute_action(action: Action, app: &mut AppState) -> Result<()> {
    debug!(?action, "execute");
    match action {
        Action::Quit => {
            app.controller.teardown();
            app.running = false;
        }

        // Movement actions
        Action::GoUp => go_sibling(app, -1),
        Action::GoDown => go_sibling(app, 1),
        Action::GoLeft => go_left(app),
        Action::GoRight => go_right(app),
        Action::GoToRoot => {
            let root = app.map().root_id().to_string();
            select(app, &root);
        }
        Action::SelectNext => step_visible(app, 1),
        Action::SelectPrevious => step_visible(app, -1),

        // Node manipulation
        Action::InsertSibling => {
            let active = app.active_id();
            app.start_editing(EditTarget::NewSibling(active));
        }
        Action::InsertChild => {
            let active = app.active_id();
            app.start_editing(EditTarget::NewChild(active));
        }
        Action::DeleteNode => delete_node(app),
        Action::MoveNodeUp => move_node(app, -1),
        Action::MoveNodeDown => move_node(app, 1),

        // Editing
        Action::EditNode => {
            let active = app.active_id();
            app.start_editing(EditTarget::Rename(active));
        }
        Action::TypeChar(c) => type_char(app, c),
        Action::Backspace => backspace(app),
        Action::Delete => delete_char(app),
        Action::MoveCursorLeft => move_cursor(app, |_, pos| pos.saturating_sub(1)),
        Action::MoveCursorRight => move_cursor(app, |len, pos| (pos + 1).min(len)),
        Action::MoveCursorHome => move_cursor(app, |_, _| 0),
        Action::MoveCursorEnd => move_cursor(app, |len, _| len),
        Action::ConfirmEdit => confirm_edit(app),
        Action::CancelEdit => app.mode = AppMode::Normal,

        // Tree view
        Action::ToggleCollapse => {
            let active = app.active_id();
            if app.map().has_children(&active) {
                app.controller.on_node_toggle(&active);
            }
        }
        Action::CollapseAll => {
            app.controller.collapse_all();
            let root = app.map().root_id().to_string();
            select(app, &root);
        }
        Action::ExpandAll => app.controller.expand_all(),
        Action::CollapseToLevel(level) => collapse_to_level(app, level),

        // Viewport
        Action::ZoomIn => app.controller.zoom_in(),
        Action::ZoomOut => app.controller.zoom_out(),
        Action::Pan { dx, dy } => {
            let step = app.config.terminal.pan_step_px;
            app.controller.pan_by(dx as f64 * step, dy as f64 * step);
        }
        Action::ResetView => app.controller.reset_view(),
        Action::FitToScreen => app.controller.fit_to_screen(),
        Action::ToggleLayout => toggle_layout(app),

        // Search
        Action::Search => {
            let query = app.controller.view().search_term().to_string();
            app.mode = AppMode::Search { query };
        }
        Action::TypeSearchChar(c) => update_search(app, |query| query.push(c)),
        Action::BackspaceSearch => update_search(app, |query| {
            query.pop();
        }),
        Action::ConfirmSearch => confirm_search(app),
        Action::CancelSearch | Action::ClearSearch => {
            app.controller.set_search("");
            app.search_results.clear();
            app.search_index = 0;
            app.mode = AppMode::Normal;
        }
        Action::NextSearchResult => step_search(app, 1),
        Action::PreviousSearchResult => step_search(app, -1),

        // Generation
        Action::Generate => app.start_editing(EditTarget::Topic),

        // File operations
        Action::Save => save(app)?,
        Action::ExportJson => export(app, "json")?,
        Action::ExportOutline => export(app, "txt")?,

        // Mouse
        Action::TouchDown { column, row } => {
            let point = app.cell_to_canvas(column, row);
            app.controller.on_touch_start(&[point], Instant::now());
        }
        Action::TouchDrag { column, row } => {
            let point = app.cell_to_canvas(column, row);
            app.controller.on_touch_move(&[point], Instant::now());
        }
        Action::TouchUp => app.controller.on_touch_end(&[], Instant::now()),
        Action::PointerDown { column, row } => {
            let point = app.cell_to_canvas(column, row);
            app.controller.on_pointer_down(point);
        }
        Action::PointerDrag { column, row } => {
            let point = app.cell_to_canvas(column, row);
            app.controller.on_pointer_move(point);
        }
        Action::PointerUp => app.controller.on_pointer_up(),
        Action::Scroll {
            column,
            row,
            notches,
        } => {
            let point = app.cell_to_canvas(column, row);
            let delta = notches as f64 * app.config.terminal.wheel_notch_delta;
            app.controller.on_wheel(delta, point);
        }

        // Help
        Action::ShowHelp => app.mode = AppMode::Help,
        Action::CloseHelp => app.mode = AppMode::Normal,
    }

    app.process_adapter_events();
    Ok(())
}

// Movement

fn select(app: &mut AppState, id: &str) {
    app.controller.reveal(id);
    app.controller.select(Some(id));
}

fn go_left(app: &mut AppState) {
    let active = app.active_id();
    if let Some(parent) = app.map().parent_id(&active).map(str::to_string) {
        select(app, &parent);
    }
}

fn go_right(app: &mut AppState) {
    let active = app.active_id();
    let first_child = app.map().children_of(&active).first().map(|c| c.to_string());
    if let Some(child) = first_child {
        if !app.controller.view().is_expanded(&active) {
            app.controller.on_node_toggle(&active);
        }
        select(app, &child);
    }
}

fn go_sibling(app: &mut AppState, step: isize) {
    let active = app.active_id();
    let Some(parent) = app.map().parent_id(&active) else {
        return;
    };
    let siblings = app.map().children_of(parent);
    let Some(index) = siblings.iter().position(|id| *id == active) else {
        return;
    };
    let target = index as isize + step;
    if target < 0 || target as usize >= siblings.len() {
        return;
    }
    let sibling = siblings[target as usize].to_string();
    select(app, &sibling);
}

/// Moves the selection through visible nodes in depth-first order, wrapping.
fn step_visible(app: &mut AppState, step: isize) {
    let visible = app.controller.view().visible_ids(app.map());
    if visible.is_empty() {
        return;
    }
    let next = match app.controller.view().selected() {
        Some(selected) => match visible.iter().position(|id| id == selected) {
            Some(index) => (index as isize + step).rem_euclid(visible.len() as isize) as usize,
            None => 0,
        },
        None => 0,
    };
    let id = visible[next].clone();
    select(app, &id);
}

fn collapse_to_level(app: &mut AppState, level: usize) {
    app.controller.collapse_to_level(level);
    // Keep the selection on screen.
    if let Some(selected) = app.controller.view().selected().map(str::to_string) {
        if !app.controller.view().is_visible(app.map(), &selected) {
            let ancestors = app.map().ancestors_of(&selected);
            let visible = ancestors
                .into_iter()
                .find(|id| app.controller.view().is_visible(app.map(), id));
            if let Some(id) = visible {
                app.controller.select(Some(&id));
            }
        }
    }
}

// Node manipulation

fn delete_node(app: &mut AppState) {
    let active = app.active_id();
    let parent = app.map().parent_id(&active).map(str::to_string);
    match app.controller.on_node_delete_request(&active) {
        Ok(removed) => {
            if let Some(parent) = parent {
                app.controller.select(Some(&parent));
            }
            app.search_results.retain(|id| !removed.contains(id));
            app.search_index = 0;
            app.set_message(format!("Deleted {} node(s)", removed.len()));
        }
        Err(e) => app.set_message(e.to_string()),
    }
}

fn move_node(app: &mut AppState, delta: isize) {
    let active = app.active_id();
    if let Err(e) = app.controller.move_node(&active, delta) {
        app.set_message(e.to_string());
    }
}

// Editing

fn byte_index(buffer: &str, char_pos: usize) -> usize {
    buffer
        .char_indices()
        .nth(char_pos)
        .map(|(i, _)| i)
        .unwrap_or(buffer.len())
}

fn type_char(app: &mut AppState, c: char) {
    if let AppMode::Editing {
        buffer, cursor_pos, ..
    } = &mut app.mode
    {
        let at = byte_index(buffer, *cursor_pos);
        buffer.insert(at, c);
        *cursor_pos += 1;
    }
}

fn backspace(app: &mut AppState) {
    if let AppMode::Editing {
        buffer, cursor_pos, ..
    } = &mut app.mode
    {
        if *cursor_pos > 0 {
            *cursor_pos -= 1;
            let at = byte_index(buffer, *cursor_pos);
            buffer.remove(at);
        }
    }
}

fn delete_char(app: &mut AppState) {
    if let AppMode::Editing {
        buffer, cursor_pos, ..
    } = &mut app.mode
    {
        if *cursor_pos < buffer.chars().count() {
            let at = byte_index(buffer, *cursor_pos);
            buffer.remove(at);
        }
    }
}

fn move_cursor(app: &mut AppState, to: impl Fn(usize, usize) -> usize) {
    if let AppMode::Editing {
        buffer, cursor_pos, ..
    } = &mut app.mode
    {
        *cursor_pos = to(buffer.chars().count(), *cursor_pos);
    }
}

fn confirm_edit(app: &mut AppState) {
    let AppMode::Editing { target, buffer, .. } = std::mem::replace(&mut app.mode, AppMode::Normal)
    else {
        return;
    };
    let text = buffer.trim();
    if text.is_empty() {
        return;
    }

    let result = match target {
        EditTarget::Topic => {
            app.request_generation(text);
            Ok(())
        }
        EditTarget::Rename(id) => app
            .controller
            .on_node_edit_request(&id, NodePatch::title(text)),
        EditTarget::NewChild(parent) => app
            .controller
            .on_node_add_request(&parent, text)
            .map(|id| select(app, &id)),
        EditTarget::NewSibling(anchor) => insert_sibling(app, &anchor, text),
    };
    if let Err(e) = result {
        app.set_message(e.to_string());
    }
}

/// Adds a node right after `anchor`; the root has no siblings, so there it
/// becomes a child instead.
fn insert_sibling(app: &mut AppState, anchor: &str, title: &str) -> Result<(), crate::errors::TreeError> {
    let Some(parent) = app.map().parent_id(anchor).map(str::to_string) else {
        let id = app.controller.on_node_add_request(anchor, title)?;
        select(app, &id);
        return Ok(());
    };

    let id = app.controller.on_node_add_request(&parent, title)?;
    let siblings = app.map().children_of(&parent);
    let anchor_index = siblings.iter().position(|s| *s == anchor).unwrap_or(0);
    let steps = siblings.len().saturating_sub(anchor_index + 2);
    for _ in 0..steps {
        app.controller.move_node(&id, -1)?;
    }
    select(app, &id);
    Ok(())
}

// Layout

fn toggle_layout(app: &mut AppState) {
    let next = match app.controller.layout_strategy() {
        LayoutStrategy::Radial => LayoutStrategy::Vertical,
        LayoutStrategy::Vertical => LayoutStrategy::Radial,
    };
    app.controller.set_layout_strategy(next);
    app.config.engine.layout.strategy = next;
    app.set_message(format!("Layout: {:?}", next).to_lowercase());
}

// Search

fn update_search(app: &mut AppState, edit: impl FnOnce(&mut String)) {
    if let AppMode::Search { query } = &mut app.mode {
        edit(query);
        let query = query.clone();
        app.controller.set_search(&query);
    }
}

fn confirm_search(app: &mut AppState) {
    app.mode = AppMode::Normal;
    let search = app.controller.view().search();
    app.search_results = search.ordered.clone();
    app.search_index = 0;

    if let Some(first) = app.search_results.first().cloned() {
        select(app, &first);
        app.set_message(format!("Found {} results", app.search_results.len()));
    } else {
        app.set_message("No results found");
    }
}

fn step_search(app: &mut AppState, step: isize) {
    if app.search_results.is_empty() {
        return;
    }
    let len = app.search_results.len() as isize;
    app.search_index = (app.search_index as isize + step).rem_euclid(len) as usize;
    let id = app.search_results[app.search_index].clone();
    select(app, &id);
    app.set_message(format!("Result {}/{}", app.search_index + 1, len));
}

// File operations

pub fn save(app: &mut AppState) -> Result<()> {
    if let Some(path) = app.filename.clone() {
        parser::save_file(app.map(), &path)?;
        app.is_dirty = false;
        app.set_message("File saved");
    } else {
        app.set_message("No filename set; export with x or X");
    }
    Ok(())
}

/// File next to the current one with the given extension, or a name derived
/// from the root title when the map has never been saved.
fn export_path(app: &AppState, extension: &str) -> PathBuf {
    match &app.filename {
        Some(path) => path.with_extension(extension),
        None => {
            let slug: String = app
                .map()
                .root_node()
                .title
                .chars()
                .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
                .collect();
            let slug = slug.trim_matches('-');
            let stem = if slug.is_empty() { "mindmap" } else { slug };
            PathBuf::from(format!("{}.{}", stem, extension))
        }
    }
}

fn export(app: &mut AppState, extension: &str) -> Result<()> {
    let path = export_path(app, extension);
    if app.filename.as_ref() == Some(&path) {
        return save(app);
    }
    parser::save_file(app.map(), &path)?;
    app.set_message(format!("Exported to {}", path.display()));
    Ok(())
}
