use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::TreeError;
use crate::geometry::{Point, Size};
use crate::gesture::{Gesture, GestureConfig, SwipeDirection, TapRecognizer};
use crate::layout::{self, Edge, LayoutConfig, LayoutResult, LayoutStrategy};
use crate::model::{NodePatch, TreeNode};
use crate::tree::MindMap;
use crate::view_state::ViewState;
use crate::viewport::{ViewportConfig, ViewportController};

/// Engine-level settings: everything except presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub gesture: GestureConfig,
}

/// Notifications the engine sends to whatever is drawing it.
///
/// All methods default to doing nothing, so an adapter only implements the
/// ones it cares about.
pub trait RenderAdapter {
    fn on_selection_changed(&mut self, _selected: Option<&str>) {}

    fn on_swipe(&mut self, _direction: SwipeDirection) {}

    /// `target` is the node under the press, if any.
    fn on_long_press(&mut self, _target: Option<&str>, _position: Point) {}

    /// The tree was replaced or mutated.
    fn on_map_changed(&mut self) {}
}

/// Adapter that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAdapter;

impl RenderAdapter for NullAdapter {}

/// Owns the tree, view state, viewport and gesture recognizer, and routes
/// raw input and node intents between them.
pub struct MindMapController<A: RenderAdapter> {
    config: EngineConfig,
    map: MindMap,
    view: ViewState,
    viewport: ViewportController,
    taps: TapRecognizer,
    adapter: A,
    load_error: Option<TreeError>,
}

impl<A: RenderAdapter> MindMapController<A> {
    pub fn new(config: EngineConfig, canvas: Size, adapter: A) -> Self {
        let map = MindMap::default();
        let view = ViewState::new(&map);
        Self {
            viewport: ViewportController::new(config.viewport.clone(), canvas),
            taps: TapRecognizer::new(config.gesture.clone()),
            config,
            map,
            view,
            adapter,
            load_error: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn map(&self) -> &MindMap {
        &self.map
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Error from the most recent rejected load, cleared by the next successful one.
    pub fn load_error(&self) -> Option<&TreeError> {
        self.load_error.as_ref()
    }

    /// Validates and installs a new tree. On failure the current map and view
    /// are kept and the error is remembered in `load_error`.
    pub fn load_payload(&mut self, payload: &TreeNode) -> Result<(), TreeError> {
        match MindMap::from_tree(payload) {
            Ok(map) => {
                self.replace_map(map);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "rejected malformed tree");
                self.load_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Installs an already validated map, resetting view and viewport.
    pub fn replace_map(&mut self, map: MindMap) {
        info!(root = %map.root_node().title, nodes = map.len(), "loaded mind map");
        let had_selection = self.view.selected().is_some();
        self.map = map;
        self.view = ViewState::new(&self.map);
        self.viewport.reset();
        self.taps.reset();
        self.load_error = None;
        if had_selection {
            self.adapter.on_selection_changed(None);
        }
        self.adapter.on_map_changed();
    }

    // Produced for the render adapter

    pub fn visible_layout(&self) -> LayoutResult {
        layout::visible_layout(
            &self.map,
            &self.view,
            &self.config.layout,
            self.viewport.canvas(),
        )
    }

    pub fn visible_edges(&self) -> Vec<Edge> {
        self.edges_for(&self.visible_layout())
    }

    /// Edges between the nodes of an already computed layout.
    pub fn edges_for(&self, layout: &LayoutResult) -> Vec<Edge> {
        layout::visible_edges(&self.map, &self.view, &self.config.layout, layout)
    }

    /// Id of the visible node drawn under a screen position.
    pub fn node_at(&self, screen: Point) -> Option<String> {
        let world = self.viewport.to_world(screen);
        self.visible_layout()
            .node_at(world, self.config.layout.node_radius)
            .map(str::to_string)
    }

    // Pointer input

    pub fn on_pointer_down(&mut self, position: Point) {
        self.viewport.pointer_down(position);
    }

    pub fn on_pointer_move(&mut self, position: Point) {
        self.viewport.pointer_move(position);
    }

    pub fn on_pointer_up(&mut self) {
        self.viewport.pointer_up();
    }

    pub fn on_pointer_leave(&mut self) {
        self.viewport.pointer_leave();
    }

    pub fn on_pointer_cancel(&mut self) {
        self.viewport.pointer_cancel();
    }

    pub fn on_wheel(&mut self, delta_y: f64, cursor: Point) {
        self.viewport.wheel(delta_y, cursor);
    }

    // Touch input. `touches` always lists every point currently down.

    pub fn on_touch_start(&mut self, touches: &[Point], now: Instant) {
        self.viewport.touch_start(touches);
        match touches {
            [single] => self.taps.start(*single, now),
            _ => self.taps.cancel(),
        }
    }

    pub fn on_touch_move(&mut self, touches: &[Point], now: Instant) {
        self.viewport.touch_move(touches);
        if let [single] = touches {
            if let Some(gesture) = self.taps.move_to(*single, now) {
                self.dispatch(gesture);
            }
        }
    }

    pub fn on_touch_end(&mut self, remaining: &[Point], now: Instant) {
        self.viewport.touch_end(remaining);
        if remaining.is_empty() {
            if let Some(gesture) = self.taps.end(now) {
                self.dispatch(gesture);
            }
        }
    }

    pub fn on_touch_cancel(&mut self) {
        self.viewport.touch_cancel();
        self.taps.cancel();
    }

    /// Lets time-based gestures (long press) fire without further input.
    pub fn tick(&mut self, now: Instant) {
        if let Some(gesture) = self.taps.tick(now) {
            self.dispatch(gesture);
        }
    }

    pub fn resize(&mut self, canvas: Size) {
        if canvas != self.viewport.canvas() {
            debug!(width = canvas.width, height = canvas.height, "canvas resized");
            self.viewport.resize(canvas);
        }
    }

    /// Drops pending gesture state; nothing fires after this.
    pub fn teardown(&mut self) {
        self.taps.reset();
        self.viewport.touch_cancel();
    }

    fn dispatch(&mut self, gesture: Gesture) {
        debug!(?gesture, "gesture");
        match gesture {
            Gesture::Tap(position) => {
                let target = self.node_at(position);
                self.select(target.as_deref());
            }
            Gesture::DoubleTap(position) => {
                let target = self
                    .node_at(position)
                    .or_else(|| self.view.selected().map(str::to_string));
                if let Some(id) = target {
                    self.on_node_toggle(&id);
                }
            }
            Gesture::LongPress(position) => {
                let target = self.node_at(position);
                self.adapter.on_long_press(target.as_deref(), position);
            }
            Gesture::Swipe(direction) => self.adapter.on_swipe(direction),
        }
    }

    // Node intents

    pub fn select(&mut self, id: Option<&str>) {
        let id = id.filter(|id| self.map.contains(id));
        if self.view.selected() != id {
            self.view.select(id);
            self.adapter.on_selection_changed(id);
        }
    }

    pub fn on_node_activate(&mut self, id: &str) {
        self.select(Some(id));
    }

    /// Returns the new expansion state, or `None` for an unknown id.
    pub fn on_node_toggle(&mut self, id: &str) -> Option<bool> {
        if !self.map.contains(id) {
            return None;
        }
        Some(self.view.toggle_expand(id))
    }

    /// Adds a new child with a generated id and expands the parent.
    pub fn on_node_add_request(&mut self, parent_id: &str, title: &str) -> Result<String, TreeError> {
        let id = self.map.fresh_id();
        self.add_subtree(parent_id, TreeNode::new(id, title))
    }

    /// Attaches a whole payload subtree below `parent_id`.
    pub fn add_subtree(&mut self, parent_id: &str, payload: TreeNode) -> Result<String, TreeError> {
        let id = self.map.add_child(parent_id, payload)?;
        self.view.set_expanded(parent_id, true);
        self.after_mutation();
        Ok(id)
    }

    pub fn on_node_edit_request(&mut self, id: &str, patch: NodePatch) -> Result<(), TreeError> {
        self.map.edit_node(id, patch)?;
        self.after_mutation();
        Ok(())
    }

    /// Deletes the node and its subtree, forgetting them in the view state.
    pub fn on_node_delete_request(&mut self, id: &str) -> Result<Vec<String>, TreeError> {
        let had_selection = self.view.selected().is_some();
        let removed = self.map.delete_node(id)?;
        self.view.remove_ids(&removed);
        self.after_mutation();
        if had_selection && self.view.selected().is_none() {
            self.adapter.on_selection_changed(None);
        }
        Ok(removed)
    }

    pub fn move_node(&mut self, id: &str, delta: isize) -> Result<bool, TreeError> {
        let moved = self.map.move_node(id, delta)?;
        if moved {
            self.after_mutation();
        }
        Ok(moved)
    }

    fn after_mutation(&mut self) {
        self.view.prune(&self.map);
        self.view.refresh_search(&self.map);
        self.adapter.on_map_changed();
    }

    // View operations

    pub fn set_search(&mut self, term: &str) {
        self.view.set_search(&self.map, term);
    }

    pub fn expand_all(&mut self) {
        self.view.expand_all(&self.map);
    }

    pub fn collapse_all(&mut self) {
        self.view.collapse_all(&self.map);
    }

    pub fn collapse_to_level(&mut self, level: usize) {
        self.view.collapse_to_level(&self.map, level);
    }

    pub fn reveal(&mut self, id: &str) {
        self.view.reveal(&self.map, id);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.viewport.pan_by(dx, dy);
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    /// Zooms and pans so that every visible node fits on the canvas.
    pub fn fit_to_screen(&mut self) {
        if let Some(bounds) = self.visible_layout().bounds() {
            self.viewport.fit(bounds);
        }
    }

    pub fn layout_strategy(&self) -> LayoutStrategy {
        self.config.layout.strategy
    }

    pub fn set_layout_strategy(&mut self, strategy: LayoutStrategy) {
        if self.config.layout.strategy != strategy {
            debug!(?strategy, "layout strategy changed");
            self.config.layout.strategy = strategy;
        }
    }
}
