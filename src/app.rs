use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::backend::{
    spawn_generation, BackendError, GenerationResponse, HttpTreeSource, RequestTracker, TreeSource,
};
use crate::config::AppConfig;
use crate::controller::{MindMapController, RenderAdapter};
use crate::geometry::{Point, Size};
use crate::gesture::SwipeDirection;
use crate::tree::MindMap;

/// Rows reserved below the map for the status line.
pub const STATUS_HEIGHT: u16 = 1;

/// What a confirmed text edit is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Rename(String),
    NewChild(String),
    NewSibling(String),
    Topic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppMode {
    Normal,
    /// `cursor_pos` counts characters, not bytes.
    Editing {
        target: EditTarget,
        buffer: String,
        cursor_pos: usize,
    },
    Search {
        query: String,
    },
    Help,
}

/// Engine notifications queued for the next tick.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    SelectionChanged(Option<String>),
    Swipe(SwipeDirection),
    LongPress(Option<String>),
    MapChanged,
}

/// Render adapter for the terminal: records notifications so the app can
/// react to them outside the controller borrow.
#[derive(Debug, Default)]
pub struct TerminalAdapter {
    events: Vec<AdapterEvent>,
}

impl TerminalAdapter {
    pub fn drain(&mut self) -> Vec<AdapterEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending(&self) -> &[AdapterEvent] {
        &self.events
    }
}

impl RenderAdapter for TerminalAdapter {
    fn on_selection_changed(&mut self, selected: Option<&str>) {
        self.events
            .push(AdapterEvent::SelectionChanged(selected.map(str::to_string)));
    }

    fn on_swipe(&mut self, direction: SwipeDirection) {
        self.events.push(AdapterEvent::Swipe(direction));
    }

    fn on_long_press(&mut self, target: Option<&str>, _position: Point) {
        self.events
            .push(AdapterEvent::LongPress(target.map(str::to_string)));
    }

    fn on_map_changed(&mut self) {
        self.events.push(AdapterEvent::MapChanged);
    }
}

pub type SharedSource = Arc<dyn TreeSource + Send + Sync>;

pub struct AppState {
    pub running: bool,
    pub mode: AppMode,
    pub controller: MindMapController<TerminalAdapter>,
    pub config: AppConfig,
    pub filename: Option<PathBuf>,
    pub is_dirty: bool,

    pub terminal_width: u16,
    pub terminal_height: u16,

    // Message for status line
    pub message: Option<String>,

    // Search state
    pub search_results: Vec<String>,
    pub search_index: usize,

    // Generation requests
    pub requests: RequestTracker,
    source: Option<SharedSource>,
    responses_tx: Sender<GenerationResponse>,
    responses_rx: Receiver<GenerationResponse>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let (responses_tx, responses_rx) = mpsc::channel();
        let terminal_width = 80;
        let terminal_height = 24;
        let canvas = canvas_size(&config, terminal_width, terminal_height - STATUS_HEIGHT);
        let controller =
            MindMapController::new(config.engine.clone(), canvas, TerminalAdapter::default());

        Self {
            running: true,
            mode: AppMode::Normal,
            controller,
            filename: config.filename.clone(),
            config,
            is_dirty: false,
            terminal_width,
            terminal_height,
            message: None,
            search_results: Vec::new(),
            search_index: 0,
            requests: RequestTracker::new(),
            source: None,
            responses_tx,
            responses_rx,
        }
    }

    /// Replaces the generation backend, e.g. with a local stub.
    pub fn set_source(&mut self, source: SharedSource) {
        self.source = Some(source);
    }

    pub fn set_message(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    pub fn map(&self) -> &MindMap {
        self.controller.map()
    }

    /// Selected node, falling back to the root.
    pub fn active_id(&self) -> String {
        self.controller
            .view()
            .selected()
            .unwrap_or_else(|| self.controller.map().root_id())
            .to_string()
    }

    pub fn load_map(&mut self, map: MindMap, filename: Option<PathBuf>) {
        self.controller.replace_map(map);
        self.filename = filename;
        self.is_dirty = false;
        self.search_results.clear();
        self.search_index = 0;
        // Loading is not an edit.
        self.controller.adapter_mut().drain();
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.terminal_width = width;
        self.terminal_height = height;
        let canvas = canvas_size(&self.config, width, height.saturating_sub(STATUS_HEIGHT));
        self.controller.resize(canvas);
    }

    /// Canvas position of the centre of a terminal cell.
    pub fn cell_to_canvas(&self, column: u16, row: u16) -> Point {
        Point::new(
            (column as f64 + 0.5) * self.config.terminal.cell_width_px,
            (row as f64 + 0.5) * self.config.terminal.cell_height_px,
        )
    }

    /// Terminal cell containing a canvas position, if it is on the map area.
    pub fn canvas_to_cell(&self, point: Point) -> Option<(u16, u16)> {
        let column = (point.x / self.config.terminal.cell_width_px).floor();
        let row = (point.y / self.config.terminal.cell_height_px).floor();
        let rows = self.terminal_height.saturating_sub(STATUS_HEIGHT) as f64;
        if column < 0.0 || row < 0.0 || column >= self.terminal_width as f64 || row >= rows {
            return None;
        }
        Some((column as u16, row as u16))
    }

    /// Starts generating a map for `topic` in the background. Any earlier
    /// request still in flight becomes stale.
    pub fn request_generation(&mut self, topic: &str) {
        let topic = topic.trim();
        if topic.is_empty() {
            self.set_message(BackendError::EmptyTopic.to_string());
            return;
        }

        let source = match self.source.clone() {
            Some(source) => source,
            None => match HttpTreeSource::new(&self.config.backend) {
                Ok(source) => {
                    let source: SharedSource = Arc::new(source);
                    self.source = Some(source.clone());
                    source
                }
                Err(e) => {
                    self.set_message(format!("Generation failed: {}", e));
                    return;
                }
            },
        };

        let seq = self.requests.issue();
        info!(seq, topic, "generation requested");
        spawn_generation(source, seq, topic.to_string(), self.responses_tx.clone());
        self.set_message(format!("Generating \"{}\"...", topic));
    }

    /// Applies finished generation responses. Returns whether a new map was loaded.
    pub fn poll_generation(&mut self) -> bool {
        let mut loaded = false;
        while let Ok(response) = self.responses_rx.try_recv() {
            let GenerationResponse { seq, topic, result } = response;
            match self.requests.accept(seq, result) {
                Ok(payload) => match self.controller.load_payload(&payload) {
                    Ok(()) => {
                        self.filename = None;
                        self.is_dirty = true;
                        self.search_results.clear();
                        self.controller.adapter_mut().drain();
                        self.set_message(format!("Generated map for \"{}\"", topic));
                        loaded = true;
                    }
                    Err(e) => self.set_message(format!("Malformed tree: {}", e)),
                },
                Err(BackendError::Stale { .. }) => {}
                Err(e) => {
                    warn!(seq, error = %e, "generation failed");
                    self.set_message(format!("Generation failed: {}", e));
                }
            }
        }
        loaded
    }

    /// Periodic work: long-press timers, backend responses, adapter events.
    pub fn tick(&mut self, now: Instant) {
        self.controller.tick(now);
        self.poll_generation();
        self.process_adapter_events();
    }

    pub fn process_adapter_events(&mut self) {
        for event in self.controller.adapter_mut().drain() {
            debug!(?event, "adapter event");
            match event {
                AdapterEvent::MapChanged => self.is_dirty = true,
                AdapterEvent::SelectionChanged(Some(id)) => {
                    // Keep n/N stepping from wherever the user clicked.
                    if let Some(index) = self.search_results.iter().position(|r| *r == id) {
                        self.search_index = index;
                    }
                }
                AdapterEvent::SelectionChanged(None) => {}
                AdapterEvent::Swipe(direction) => self.set_message(format!("Swipe {}", direction)),
                AdapterEvent::LongPress(Some(id)) => {
                    if matches!(self.mode, AppMode::Normal) {
                        self.controller.select(Some(&id));
                        self.controller.adapter_mut().drain();
                        self.start_editing(EditTarget::Rename(id));
                    }
                }
                AdapterEvent::LongPress(None) => {}
            }
        }
    }

    /// Enters edit mode with the buffer prefilled for `target`.
    pub fn start_editing(&mut self, target: EditTarget) {
        let buffer = match &target {
            EditTarget::Rename(id) => self
                .controller
                .map()
                .find_node(id)
                .map(|node| node.title.clone())
                .unwrap_or_default(),
            _ => String::new(),
        };
        let cursor_pos = buffer.chars().count();
        self.mode = AppMode::Editing {
            target,
            buffer,
            cursor_pos,
        };
    }
}

fn canvas_size(config: &AppConfig, columns: u16, rows: u16) -> Size {
    Size::new(
        columns as f64 * config.terminal.cell_width_px,
        rows as f64 * config.terminal.cell_height_px,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TreeNode;
    use std::time::Duration;

    struct FixedSource;

    impl TreeSource for FixedSource {
        fn generate(&self, topic: &str) -> Result<TreeNode, BackendError> {
            Ok(TreeNode::new("root", topic).with_children(vec![TreeNode::new("a", "Detail")]))
        }
    }

    fn wait_for_generation(app: &mut AppState) -> bool {
        for _ in 0..100 {
            if app.poll_generation() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_cell_canvas_conversion() {
        let app = AppState::new(AppConfig::default());
        let point = app.cell_to_canvas(10, 5);
        assert_eq!(point, Point::new(84.0, 88.0));
        assert_eq!(app.canvas_to_cell(point), Some((10, 5)));
        assert_eq!(app.canvas_to_cell(Point::new(-1.0, 0.0)), None);
        assert_eq!(app.canvas_to_cell(Point::new(0.0, 23.0 * 16.0)), None);
    }

    #[test]
    fn test_resize_updates_canvas() {
        let mut app = AppState::new(AppConfig::default());
        app.resize(100, 41);
        assert_eq!(app.controller.viewport().canvas(), Size::new(800.0, 640.0));
    }

    #[test]
    fn test_generation_loads_map() {
        let mut app = AppState::new(AppConfig::default());
        app.set_source(Arc::new(FixedSource));
        app.request_generation("Volcanoes");
        assert!(wait_for_generation(&mut app));
        assert_eq!(app.map().root_node().title, "Volcanoes");
        assert!(app.is_dirty);
        assert!(!app.requests.is_pending());
    }

    #[test]
    fn test_empty_topic_is_not_sent() {
        let mut app = AppState::new(AppConfig::default());
        app.set_source(Arc::new(FixedSource));
        app.request_generation("  ");
        assert_eq!(app.requests.latest(), None);
        assert_eq!(app.message.as_deref(), Some("Topic is empty"));
    }

    #[test]
    fn test_long_press_starts_rename() {
        let mut app = AppState::new(AppConfig::default());
        let t0 = Instant::now();
        let root = app.controller.visible_layout().get("root").unwrap().point();
        app.controller.on_touch_start(&[root], t0);
        app.tick(t0 + Duration::from_millis(600));
        assert_eq!(
            app.mode,
            AppMode::Editing {
                target: EditTarget::Rename("root".to_string()),
                buffer: "New Mind Map".to_string(),
                cursor_pos: 12,
            }
        );
    }

    #[test]
    fn test_release_after_long_press_ends_drag() {
        use crossterm::event::{KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

        let mut app = AppState::new(AppConfig::default());
        let t0 = Instant::now();
        let root = app.controller.visible_layout().get("root").unwrap().point();
        let (column, row) = app.canvas_to_cell(root).unwrap();
        let press = app.cell_to_canvas(column, row);
        app.controller.on_touch_start(&[press], t0);
        app.tick(t0 + Duration::from_millis(700));
        assert!(matches!(app.mode, AppMode::Editing { .. }));
        assert!(app.controller.viewport().is_dragging());

        let release = MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        };
        let action = crate::event::handle_mouse_event(&app, release).unwrap();
        crate::actions::execute_action(action, &mut app).unwrap();

        assert!(!app.controller.viewport().is_dragging());
        assert!(matches!(app.mode, AppMode::Editing { .. }));
    }
}
