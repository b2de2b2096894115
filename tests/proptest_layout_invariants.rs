//! Property-based invariants for layout and viewport zoom.
//!
//! 1. A layout holds exactly the visible nodes, for both strategies.
//! 2. Every visible non-root node gets exactly one incoming edge.
//! 3. Siblings never share a position.
//! 4. Zoom stays inside its bounds under any mix of wheel, pinch and buttons.

use mindmap_rs::model::FlatNode;
use mindmap_rs::{EngineConfig, LayoutStrategy, MindMap, MindMapController, NullAdapter, Point, Size};
use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Instant;

// ── Helpers ─────────────────────────────────────────────────────────────

fn node_id(index: usize) -> String {
    if index == 0 {
        "root".to_string()
    } else {
        format!("n{}", index)
    }
}

/// `parents[i]` picks the parent of node `i + 1` among the nodes before it.
fn map_strategy() -> impl Strategy<Value = MindMap> {
    prop::collection::vec(any::<usize>(), 0..40).prop_map(|parents| {
        let mut records = vec![FlatNode {
            id: node_id(0),
            title: "Root".to_string(),
            node_type: None,
            parent_id: None,
        }];
        for (i, pick) in parents.iter().enumerate() {
            records.push(FlatNode {
                id: node_id(i + 1),
                title: format!("Node {}", i + 1),
                node_type: None,
                parent_id: Some(node_id(pick % (i + 1))),
            });
        }
        MindMap::from_flat(&records).unwrap()
    })
}

fn controller_for(
    map: MindMap,
    toggles: &[bool],
    strategy: LayoutStrategy,
) -> MindMapController<NullAdapter> {
    let mut controller =
        MindMapController::new(EngineConfig::default(), Size::new(1024.0, 768.0), NullAdapter);
    controller.replace_map(map);
    controller.set_layout_strategy(strategy);
    let ids = controller.map().ids();
    for (id, toggle) in ids.iter().zip(toggles) {
        if *toggle {
            controller.on_node_toggle(id);
        }
    }
    controller
}

fn strategy_strategy() -> impl Strategy<Value = LayoutStrategy> {
    prop_oneof![Just(LayoutStrategy::Radial), Just(LayoutStrategy::Vertical)]
}

#[derive(Debug, Clone)]
enum ZoomOp {
    Wheel(f64),
    Pinch { from: f64, to: f64 },
    In,
    Out,
}

fn zoom_op_strategy() -> impl Strategy<Value = ZoomOp> {
    prop_oneof![
        (-20_000.0f64..20_000.0).prop_map(ZoomOp::Wheel),
        (1.0f64..500.0, 0.0f64..5_000.0).prop_map(|(from, to)| ZoomOp::Pinch { from, to }),
        Just(ZoomOp::In),
        Just(ZoomOp::Out),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Layout covers exactly the visible set
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn layout_matches_visible_set(
        map in map_strategy(),
        toggles in prop::collection::vec(any::<bool>(), 40),
        strategy in strategy_strategy(),
    ) {
        let controller = controller_for(map, &toggles, strategy);
        let layout = controller.visible_layout();
        let visible: HashSet<String> = controller
            .view()
            .visible_ids(controller.map())
            .into_iter()
            .collect();
        let placed: HashSet<String> = layout.iter().map(|(id, _)| id.to_string()).collect();

        prop_assert_eq!(layout.len(), visible.len());
        prop_assert_eq!(placed, visible);
        prop_assert!(layout.contains(controller.map().root_id()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. One edge per visible child
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn edges_connect_every_visible_child(
        map in map_strategy(),
        toggles in prop::collection::vec(any::<bool>(), 40),
        strategy in strategy_strategy(),
    ) {
        let controller = controller_for(map, &toggles, strategy);
        let layout = controller.visible_layout();
        let edges = controller.edges_for(&layout);

        prop_assert_eq!(edges.len(), layout.len() - 1);
        let targets: HashSet<&str> = edges.iter().map(|e| e.to_id.as_str()).collect();
        prop_assert_eq!(targets.len(), edges.len());
        for edge in &edges {
            prop_assert_eq!(controller.map().parent_id(&edge.to_id), Some(edge.from_id.as_str()));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Siblings are placed apart
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn siblings_have_distinct_positions(
        map in map_strategy(),
        toggles in prop::collection::vec(any::<bool>(), 40),
        strategy in strategy_strategy(),
    ) {
        let controller = controller_for(map, &toggles, strategy);
        let layout = controller.visible_layout();
        let map = controller.map();

        for (id, _) in layout.iter() {
            let points: Vec<Point> = map
                .children_of(id)
                .into_iter()
                .filter_map(|child| layout.get(child).map(|p| p.point()))
                .collect();
            for (i, a) in points.iter().enumerate() {
                for b in &points[i + 1..] {
                    prop_assert!(
                        a.distance(*b) > 1e-6,
                        "children of {} overlap at {:?}",
                        id, a
                    );
                }
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Zoom stays clamped
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn zoom_stays_in_bounds(ops in prop::collection::vec(zoom_op_strategy(), 1..60)) {
        let mut controller =
            MindMapController::new(EngineConfig::default(), Size::new(800.0, 600.0), NullAdapter);
        let now = Instant::now();
        let anchor = Point::new(300.0, 300.0);

        for op in &ops {
            match *op {
                ZoomOp::Wheel(delta) => controller.on_wheel(delta, Point::new(120.0, 80.0)),
                ZoomOp::Pinch { from, to } => {
                    controller.on_touch_start(&[anchor, Point::new(300.0 + from, 300.0)], now);
                    controller.on_touch_move(&[anchor, Point::new(300.0 + to, 300.0)], now);
                    controller.on_touch_end(&[], now);
                }
                ZoomOp::In => controller.zoom_in(),
                ZoomOp::Out => controller.zoom_out(),
            }
            let zoom = controller.viewport().zoom();
            prop_assert!((0.2..=4.0).contains(&zoom), "zoom {} escaped after {:?}", zoom, op);
        }
    }
}
