use std::collections::HashMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Point, Size};
use crate::tree::MindMap;
use crate::view_state::ViewState;

/// Geometric algorithm used to place nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutStrategy {
    /// Children fanned out on circles around their parent.
    #[default]
    Radial,
    /// Root on the left, branches stacked in columns to the right.
    Vertical,
}

/// Column offset and row spacing for one band of the vertical layout.
/// Each spacing is viewport-relative and floored at a pixel minimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchSpacing {
    pub min_dx: f64,
    pub dx_fraction: f64,
    pub min_dy: f64,
    pub dy_fraction: f64,
}

impl BranchSpacing {
    fn dx(&self, viewport: Size) -> f64 {
        self.min_dx.max(viewport.width * self.dx_fraction)
    }

    fn dy(&self, viewport: Size) -> f64 {
        self.min_dy.max(viewport.height * self.dy_fraction)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub strategy: LayoutStrategy,
    /// Radius of the first ring around the root.
    pub base_radius: f64,
    /// Extra radius per depth level.
    pub radius_step: f64,
    pub root_min_x: f64,
    pub root_x_fraction: f64,
    /// Spacing between the root and its direct children.
    pub first_level: BranchSpacing,
    /// Spacing for every deeper level.
    pub deeper_levels: BranchSpacing,
    /// Perpendicular offset of edge control points.
    pub edge_curve_offset: f64,
    /// Hit-test radius around a node centre, in canvas units.
    pub node_radius: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            strategy: LayoutStrategy::Radial,
            base_radius: 150.0,
            radius_step: 100.0,
            root_min_x: 150.0,
            root_x_fraction: 0.25,
            first_level: BranchSpacing {
                min_dx: 180.0,
                dx_fraction: 0.30,
                min_dy: 80.0,
                dy_fraction: 1.0 / 8.0,
            },
            deeper_levels: BranchSpacing {
                min_dx: 150.0,
                dx_fraction: 0.25,
                min_dy: 120.0,
                dy_fraction: 1.0 / 6.0,
            },
            edge_curve_offset: 30.0,
            node_radius: 40.0,
        }
    }
}

/// Position of one laid-out node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
    pub depth: usize,
}

impl NodePosition {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Positions of every visible node, plus the depth-first paint order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    positions: HashMap<String, NodePosition>,
    order: Vec<String>,
}

impl LayoutResult {
    fn insert(&mut self, id: &str, position: NodePosition) {
        self.order.push(id.to_string());
        self.positions.insert(id.to_string(), position);
    }

    pub fn get(&self, id: &str) -> Option<&NodePosition> {
        self.positions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Nodes in paint order (parents before children).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodePosition)> {
        self.order
            .iter()
            .filter_map(|id| self.positions.get(id).map(|pos| (id.as_str(), pos)))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut points = self.iter().map(|(_, pos)| pos.point());
        let mut bounds = Bounds::around(points.next()?);
        for point in points {
            bounds.include(point);
        }
        Some(bounds)
    }

    /// The node closest to `point` within `radius`, if any.
    pub fn node_at(&self, point: Point, radius: f64) -> Option<&str> {
        self.iter()
            .map(|(id, pos)| (id, pos.point().distance(point)))
            .filter(|(_, distance)| *distance <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}

/// Rendering hint for one parent→child connector.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from_id: String,
    pub to_id: String,
    pub from: Point,
    pub to: Point,
    /// Quadratic Bezier control point.
    pub control: Point,
}

impl Edge {
    /// Point on the quadratic curve at `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> Point {
        let u = 1.0 - t;
        Point::new(
            u * u * self.from.x + 2.0 * u * t * self.control.x + t * t * self.to.x,
            u * u * self.from.y + 2.0 * u * t * self.control.y + t * t * self.to.y,
        )
    }
}

pub struct LayoutEngine<'a> {
    config: &'a LayoutConfig,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    /// Positions for exactly the visible nodes: the root, plus the children of
    /// every visible expanded node. Pure in (map, expansion, viewport, config).
    pub fn calculate_layout(&self, map: &MindMap, view: &ViewState, viewport: Size) -> LayoutResult {
        match self.config.strategy {
            LayoutStrategy::Radial => self.radial(map, view, viewport),
            LayoutStrategy::Vertical => self.vertical(map, view, viewport),
        }
    }

    /// One connector per (expanded parent, child) pair present in `layout`.
    pub fn edges(&self, map: &MindMap, view: &ViewState, layout: &LayoutResult) -> Vec<Edge> {
        let mut edges = Vec::new();
        for (id, from) in layout.iter() {
            if !view.is_expanded(id) {
                continue;
            }
            for child in map.children_of(id) {
                if let Some(to) = layout.get(child) {
                    edges.push(self.edge(id, child, from.point(), to.point()));
                }
            }
        }
        edges
    }

    fn edge(&self, from_id: &str, to_id: &str, from: Point, to: Point) -> Edge {
        let mid = from.midpoint(to);
        let delta = to - from;
        let length = delta.x.hypot(delta.y);
        let control = if length > f64::EPSILON {
            let scale = self.config.edge_curve_offset / length;
            Point::new(mid.x - delta.y * scale, mid.y + delta.x * scale)
        } else {
            mid
        };
        Edge {
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            from,
            to,
            control,
        }
    }

    fn radial(&self, map: &MindMap, view: &ViewState, viewport: Size) -> LayoutResult {
        let mut result = LayoutResult::default();
        // (id, centre, depth, incoming angle)
        let mut stack = vec![(map.root_id(), viewport.center(), 0usize, 0.0f64)];

        while let Some((id, center, depth, angle)) = stack.pop() {
            result.insert(
                id,
                NodePosition {
                    x: center.x,
                    y: center.y,
                    depth,
                },
            );
            if !view.is_expanded(id) {
                continue;
            }

            let children = map.children_of(id);
            let k = children.len();
            if k == 0 {
                continue;
            }
            let radius = self.config.base_radius + depth as f64 * self.config.radius_step;
            let step = 2.0 * PI / k as f64;
            let middle = (k - 1) as f64 / 2.0;

            for (i, child) in children.into_iter().enumerate().rev() {
                let child_angle = angle + (i as f64 - middle) * step;
                let position = Point::new(
                    center.x + child_angle.cos() * radius,
                    center.y + child_angle.sin() * radius,
                );
                stack.push((child, position, depth + 1, child_angle));
            }
        }
        result
    }

    fn vertical(&self, map: &MindMap, view: &ViewState, viewport: Size) -> LayoutResult {
        let mut result = LayoutResult::default();
        let root = Point::new(
            self.config
                .root_min_x
                .max(viewport.width * self.config.root_x_fraction),
            viewport.height / 2.0,
        );
        let mut stack = vec![(map.root_id(), root, 0usize)];

        while let Some((id, position, depth)) = stack.pop() {
            result.insert(
                id,
                NodePosition {
                    x: position.x,
                    y: position.y,
                    depth,
                },
            );
            if !view.is_expanded(id) {
                continue;
            }

            let children = map.children_of(id);
            if children.is_empty() {
                continue;
            }
            let spacing = if depth == 0 {
                &self.config.first_level
            } else {
                &self.config.deeper_levels
            };
            let x = position.x + spacing.dx(viewport);
            let dy = spacing.dy(viewport);
            let start_y = position.y - (children.len() - 1) as f64 * dy / 2.0;

            for (i, child) in children.into_iter().enumerate().rev() {
                stack.push((child, Point::new(x, start_y + i as f64 * dy), depth + 1));
            }
        }
        result
    }
}

/// Positions of the currently visible nodes.
pub fn visible_layout(
    map: &MindMap,
    view: &ViewState,
    config: &LayoutConfig,
    viewport: Size,
) -> LayoutResult {
    LayoutEngine::new(config).calculate_layout(map, view, viewport)
}

/// Connectors between the currently visible nodes.
pub fn visible_edges(
    map: &MindMap,
    view: &ViewState,
    config: &LayoutConfig,
    layout: &LayoutResult,
) -> Vec<Edge> {
    LayoutEngine::new(config).edges(map, view, layout)
}
