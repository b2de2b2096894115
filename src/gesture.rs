//! Tap / double-tap / long-press / swipe classification for single-touch input.
//!
//! Time is passed in by the caller, so the recognizer never reads a clock and
//! never schedules anything itself. The long-press deadline is observed either
//! through [`TapRecognizer::tick`] or when the touch is moved or lifted.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::Point;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Movement on either axis beyond which a touch becomes a swipe.
    pub swipe_threshold: f64,
    pub long_press_delay_ms: u64,
    /// A touch must lift within this time to count as a tap.
    pub tap_max_duration_ms: u64,
    pub double_tap_window_ms: u64,
    /// Maximum per-axis distance between the two taps of a double tap.
    pub double_tap_distance: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            swipe_threshold: 50.0,
            long_press_delay_ms: 500,
            tap_max_duration_ms: 300,
            double_tap_window_ms: 300,
            double_tap_distance: 30.0,
        }
    }
}

impl GestureConfig {
    pub fn long_press_delay(&self) -> Duration {
        Duration::from_millis(self.long_press_delay_ms)
    }

    pub fn tap_max_duration(&self) -> Duration {
        Duration::from_millis(self.tap_max_duration_ms)
    }

    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_window_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

impl SwipeDirection {
    /// Dominant-axis direction of a displacement. Ties go to the vertical axis.
    pub fn from_delta(dx: f64, dy: f64) -> Self {
        if dx.abs() > dy.abs() {
            if dx > 0.0 {
                SwipeDirection::Right
            } else {
                SwipeDirection::Left
            }
        } else if dy > 0.0 {
            SwipeDirection::Down
        } else {
            SwipeDirection::Up
        }
    }
}

impl std::fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SwipeDirection::Left => "left",
            SwipeDirection::Right => "right",
            SwipeDirection::Up => "up",
            SwipeDirection::Down => "down",
        };
        f.write_str(name)
    }
}

/// A classified gesture. Positions are where the touch started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Tap(Point),
    DoubleTap(Point),
    LongPress(Point),
    Swipe(SwipeDirection),
}

#[derive(Debug, Clone, Copy)]
struct TouchSession {
    origin: Point,
    started_at: Instant,
    /// Pending long-press deadline; `None` once disarmed.
    deadline: Option<Instant>,
    /// Set after a swipe or long press so the lift is not classified again.
    resolved: bool,
}

#[derive(Debug, Clone, Copy)]
struct LastTap {
    at: Instant,
    position: Point,
}

#[derive(Debug, Clone, Default)]
pub struct TapRecognizer {
    config: GestureConfig,
    session: Option<TouchSession>,
    last_tap: Option<LastTap>,
}

impl TapRecognizer {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            session: None,
            last_tap: None,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// True while a touch is down and has not been resolved as swipe or long press.
    pub fn is_tracking(&self) -> bool {
        self.session.is_some_and(|s| !s.resolved)
    }

    /// Pending long-press deadline, for callers that want to schedule a `tick`.
    pub fn deadline(&self) -> Option<Instant> {
        self.session.and_then(|s| s.deadline)
    }

    pub fn start(&mut self, position: Point, now: Instant) {
        self.session = Some(TouchSession {
            origin: position,
            started_at: now,
            deadline: Some(now + self.config.long_press_delay()),
            resolved: false,
        });
    }

    pub fn move_to(&mut self, position: Point, now: Instant) -> Option<Gesture> {
        if let Some(gesture) = self.tick(now) {
            return Some(gesture);
        }
        let threshold = self.config.swipe_threshold;
        let session = self.session.as_mut().filter(|s| !s.resolved)?;

        let dx = position.x - session.origin.x;
        let dy = position.y - session.origin.y;
        if dx.abs() > threshold || dy.abs() > threshold {
            session.deadline = None;
            session.resolved = true;
            let direction = SwipeDirection::from_delta(dx, dy);
            debug!(%direction, "swipe");
            return Some(Gesture::Swipe(direction));
        }
        None
    }

    pub fn end(&mut self, now: Instant) -> Option<Gesture> {
        if let Some(gesture) = self.tick(now) {
            self.session = None;
            return Some(gesture);
        }
        let session = self.session.take()?;
        if session.resolved {
            return None;
        }

        let duration = now.saturating_duration_since(session.started_at);
        if duration >= self.config.tap_max_duration() {
            return None;
        }

        let is_double = self.last_tap.is_some_and(|last| {
            now.saturating_duration_since(last.at) < self.config.double_tap_window()
                && (session.origin.x - last.position.x).abs() <= self.config.double_tap_distance
                && (session.origin.y - last.position.y).abs() <= self.config.double_tap_distance
        });

        if is_double {
            self.last_tap = None;
            debug!("double tap");
            Some(Gesture::DoubleTap(session.origin))
        } else {
            self.last_tap = Some(LastTap {
                at: now,
                position: session.origin,
            });
            Some(Gesture::Tap(session.origin))
        }
    }

    /// Fires the long press once its deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Option<Gesture> {
        let session = self.session.as_mut()?;
        let deadline = session.deadline?;
        if now < deadline {
            return None;
        }
        session.deadline = None;
        session.resolved = true;
        debug!("long press");
        Some(Gesture::LongPress(session.origin))
    }

    /// Drops the current touch without firing anything.
    pub fn cancel(&mut self) {
        self.session = None;
    }

    /// Drops the current touch and the double-tap memory.
    pub fn reset(&mut self) {
        self.session = None;
        self.last_tap = None;
    }
}
