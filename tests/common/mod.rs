use mindmap_rs::{MindMap, TreeNode};
use std::collections::HashSet;

/// Solar-system map used across the integration tests.
pub fn solar_payload() -> TreeNode {
    TreeNode::new("root", "Solar System").with_children(vec![
        TreeNode::new("inner", "Inner Planets").with_children(vec![
            TreeNode::new("mercury", "Mercury"),
            TreeNode::new("venus", "Venus"),
            TreeNode::new("earth", "Earth").with_children(vec![TreeNode::new("moon", "Moon")]),
            TreeNode::new("mars", "Mars"),
        ]),
        TreeNode::new("outer", "Outer Planets").with_children(vec![
            TreeNode::new("jupiter", "Jupiter"),
            TreeNode::new("saturn", "Saturn"),
        ]),
        TreeNode::new("sun", "Sun"),
    ])
}

pub fn solar_map() -> MindMap {
    MindMap::from_tree(&solar_payload()).unwrap()
}

/// Tab-indented dump of the tree, for readable assertions.
#[allow(dead_code)]
pub fn tree_to_string(map: &MindMap) -> String {
    fn build(map: &MindMap, id: &str, depth: usize, out: &mut String) {
        let title = &map.find_node(id).unwrap().title;
        out.push_str(&format!("{}{}\n", "\t".repeat(depth), title));
        for child in map.children_of(id) {
            build(map, child, depth + 1, out);
        }
    }

    let mut out = String::new();
    build(map, map.root_id(), 0, &mut out);
    out
}

/// Every node is reachable from the root exactly once and each child's
/// parent is the node that lists it.
#[allow(dead_code)]
pub fn verify_tree_integrity(map: &MindMap) -> Result<(), String> {
    let mut seen = HashSet::new();
    let mut stack = vec![map.root_id().to_string()];
    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            return Err(format!("{} reached twice", id));
        }
        for child in map.children_of(&id) {
            if map.parent_id(child) != Some(id.as_str()) {
                return Err(format!("{} is listed under {} but has another parent", child, id));
            }
            stack.push(child.to_string());
        }
    }
    if seen.len() != map.len() {
        return Err(format!("{} reachable of {} nodes", seen.len(), map.len()));
    }
    Ok(())
}

#[allow(dead_code)]
pub fn count_at_depth(map: &MindMap, depth: usize) -> usize {
    map.ids()
        .iter()
        .filter(|id| map.depth_of(id) == Some(depth))
        .count()
}
