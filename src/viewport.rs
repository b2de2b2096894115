use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{Bounds, Point, Size};

/// Which point stays fixed on screen during wheel zoom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomAnchor {
    /// Zoom around the canvas centre; pan is left unchanged.
    #[default]
    Center,
    /// Keep the world point under the cursor fixed.
    Cursor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub zoom_min: f64,
    pub zoom_max: f64,
    /// Wheel delta units per zoom step.
    pub wheel_divisor: f64,
    /// Zoom change per `wheel_divisor` units of wheel delta.
    pub wheel_step: f64,
    pub pinch_sensitivity: f64,
    /// Zoom change for one zoom-in / zoom-out command.
    pub button_step: f64,
    pub anchor: ZoomAnchor,
    /// Margin kept around the map by `fit`, in screen units.
    pub fit_padding: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            zoom_min: 0.2,
            zoom_max: 4.0,
            wheel_divisor: 1000.0,
            wheel_step: 0.1,
            pinch_sensitivity: 0.2,
            button_step: 0.1,
            anchor: ZoomAnchor::Center,
            fit_padding: 40.0,
        }
    }
}

impl ViewportConfig {
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return 1.0_f64.clamp(self.zoom_min, self.zoom_max);
        }
        zoom.clamp(self.zoom_min, self.zoom_max)
    }
}

/// Pan/zoom interaction state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanZoomState {
    Idle,
    /// `offset` is the pointer position minus the pan at session start.
    Panning { offset: Point },
    Pinching { distance: f64, midpoint: Point },
}

/// Owns zoom, pan and the Idle/Panning/Pinching machine.
///
/// Screen transform: `screen = c + (world - c) * zoom + pan`, `c` being the
/// canvas centre.
#[derive(Debug, Clone)]
pub struct ViewportController {
    config: ViewportConfig,
    zoom: f64,
    pan: Point,
    canvas: Size,
    state: PanZoomState,
}

impl ViewportController {
    pub fn new(config: ViewportConfig, canvas: Size) -> Self {
        Self {
            zoom: config.clamp_zoom(1.0),
            config,
            pan: Point::ORIGIN,
            canvas,
            state: PanZoomState::Idle,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    pub fn state(&self) -> PanZoomState {
        self.state
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, PanZoomState::Panning { .. })
    }

    pub fn resize(&mut self, canvas: Size) {
        self.canvas = canvas;
    }

    pub fn to_screen(&self, world: Point) -> Point {
        let c = self.canvas.center();
        Point::new(
            c.x + (world.x - c.x) * self.zoom + self.pan.x,
            c.y + (world.y - c.y) * self.zoom + self.pan.y,
        )
    }

    pub fn to_world(&self, screen: Point) -> Point {
        let c = self.canvas.center();
        Point::new(
            c.x + (screen.x - c.x - self.pan.x) / self.zoom,
            c.y + (screen.y - c.y - self.pan.y) / self.zoom,
        )
    }

    // Pointer (mouse) path

    pub fn pointer_down(&mut self, position: Point) {
        self.start_panning(position);
    }

    pub fn pointer_move(&mut self, position: Point) {
        if let PanZoomState::Panning { offset } = self.state {
            self.pan = position - offset;
        }
    }

    pub fn pointer_up(&mut self) {
        self.stop();
    }

    pub fn pointer_leave(&mut self) {
        self.stop();
    }

    pub fn pointer_cancel(&mut self) {
        self.stop();
    }

    // Touch path. Each call receives every touch point still on the surface.

    pub fn touch_start(&mut self, touches: &[Point]) {
        match touches {
            [] => {}
            [single] => {
                if !matches!(self.state, PanZoomState::Pinching { .. }) {
                    self.start_panning(*single);
                }
            }
            [first, second, ..] => self.start_pinching(*first, *second),
        }
    }

    pub fn touch_move(&mut self, touches: &[Point]) {
        match (self.state, touches) {
            (PanZoomState::Panning { offset }, [first, ..]) => {
                self.pan = *first - offset;
            }
            (PanZoomState::Pinching { distance, .. }, [first, second, ..]) => {
                let new_distance = first.distance(*second);
                if distance > f64::EPSILON {
                    let ratio = new_distance / distance;
                    self.zoom = self
                        .config
                        .clamp_zoom(self.zoom + (ratio - 1.0) * self.config.pinch_sensitivity);
                }
                self.state = PanZoomState::Pinching {
                    distance: new_distance,
                    midpoint: first.midpoint(*second),
                };
            }
            _ => {}
        }
    }

    /// `remaining` holds the touches still down after the lift.
    pub fn touch_end(&mut self, remaining: &[Point]) {
        match (self.state, remaining) {
            (PanZoomState::Pinching { .. }, [single]) => {
                self.stop();
                self.start_panning(*single);
            }
            (PanZoomState::Pinching { .. }, [first, second, ..]) => {
                self.start_pinching(*first, *second);
            }
            (_, []) => self.stop(),
            _ => {}
        }
    }

    pub fn touch_cancel(&mut self) {
        self.stop();
    }

    /// Wheel zoom, independent of the pan/pinch state.
    pub fn wheel(&mut self, delta_y: f64, cursor: Point) {
        let step = -delta_y / self.config.wheel_divisor * self.config.wheel_step;
        match self.config.anchor {
            ZoomAnchor::Center => self.zoom = self.config.clamp_zoom(self.zoom + step),
            ZoomAnchor::Cursor => self.zoom_around(self.zoom + step, cursor),
        }
    }

    /// Centre-anchored zoom step, for keys and buttons.
    pub fn zoom_by(&mut self, step: f64) {
        self.zoom = self.config.clamp_zoom(self.zoom + step);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(self.config.button_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(-self.config.button_step);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan = self.pan + Point::new(dx, dy);
    }

    pub fn reset(&mut self) {
        self.zoom = self.config.clamp_zoom(1.0);
        self.pan = Point::ORIGIN;
        self.state = PanZoomState::Idle;
    }

    /// Chooses zoom and pan so that `bounds` fills the canvas, centred.
    pub fn fit(&mut self, bounds: Bounds) {
        let padding = self.config.fit_padding * 2.0;
        let available = Size::new(
            (self.canvas.width - padding).max(1.0),
            (self.canvas.height - padding).max(1.0),
        );
        let zoom = match (bounds.width() > f64::EPSILON, bounds.height() > f64::EPSILON) {
            (true, true) => (available.width / bounds.width()).min(available.height / bounds.height()),
            (true, false) => available.width / bounds.width(),
            (false, true) => available.height / bounds.height(),
            (false, false) => 1.0,
        };
        self.zoom = self.config.clamp_zoom(zoom);
        let c = self.canvas.center();
        let focus = bounds.center();
        self.pan = Point::new(-(focus.x - c.x) * self.zoom, -(focus.y - c.y) * self.zoom);
        debug!(zoom = self.zoom, "fit viewport to bounds");
    }

    fn zoom_around(&mut self, zoom: f64, cursor: Point) {
        let world = self.to_world(cursor);
        self.zoom = self.config.clamp_zoom(zoom);
        let c = self.canvas.center();
        self.pan = Point::new(
            cursor.x - c.x - (world.x - c.x) * self.zoom,
            cursor.y - c.y - (world.y - c.y) * self.zoom,
        );
    }

    fn start_panning(&mut self, position: Point) {
        self.state = PanZoomState::Panning {
            offset: position - self.pan,
        };
        debug!(x = position.x, y = position.y, "viewport panning");
    }

    fn start_pinching(&mut self, first: Point, second: Point) {
        self.state = PanZoomState::Pinching {
            distance: first.distance(second),
            midpoint: first.midpoint(second),
        };
        debug!("viewport pinching");
    }

    fn stop(&mut self) {
        if self.state != PanZoomState::Idle {
            debug!("viewport idle");
        }
        self.state = PanZoomState::Idle;
    }
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ViewportConfig::default(), Size::default())
    }
}
