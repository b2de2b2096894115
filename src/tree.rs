use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use indextree::Arena;
use tracing::debug;

use crate::errors::TreeError;
use crate::model::{FlatNode, Node, NodeId, NodePatch, TreeNode, ROOT_ID};

/// Outcome of a title search over the whole tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Nodes whose title contains the term.
    pub matched_ids: BTreeSet<String>,
    /// Matched nodes plus all of their ancestors.
    pub visible_path_ids: BTreeSet<String>,
    /// Matched ids in depth-first order, for stepping through results.
    pub ordered: Vec<String>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.matched_ids.is_empty()
    }
}

/// A rooted topic tree. Node ids are unique and the parent of every node is
/// derived from the arena, so it can never disagree with the structure.
#[derive(Debug, Clone)]
pub struct MindMap {
    arena: Arena<Node>,
    root: NodeId,
    index: HashMap<String, NodeId>,
}

impl Default for MindMap {
    fn default() -> Self {
        Self::new("New Mind Map")
    }
}

impl MindMap {
    /// Creates a map holding a single root node with id `"root"`.
    pub fn new(title: impl Into<String>) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(Node::new(ROOT_ID, title));
        let mut index = HashMap::new();
        index.insert(ROOT_ID.to_string(), root);
        Self { arena, root, index }
    }

    /// Builds a map from a nested payload, rejecting missing ids, duplicate ids
    /// and parent references that disagree with the nesting.
    pub fn from_tree(payload: &TreeNode) -> Result<Self, TreeError> {
        validate_subtree(payload, None, &HashSet::new())?;

        let mut arena = Arena::new();
        let mut index = HashMap::new();
        let root = attach_subtree(&mut arena, &mut index, payload, None);
        debug!(nodes = index.len(), "built mind map from nested payload");
        Ok(Self { arena, root, index })
    }

    /// Builds a map from parent-pointer records.
    pub fn from_flat(records: &[FlatNode]) -> Result<Self, TreeError> {
        let mut seen = HashSet::new();
        let mut root_record: Option<&FlatNode> = None;
        for record in records {
            if record.id.trim().is_empty() {
                return Err(TreeError::MissingId {
                    title: record.title.clone(),
                });
            }
            if !seen.insert(record.id.as_str()) {
                return Err(TreeError::DuplicateId(record.id.clone()));
            }
            if record.parent_id.is_none() {
                if let Some(existing) = root_record {
                    return Err(TreeError::MultipleRoots(
                        existing.id.clone(),
                        record.id.clone(),
                    ));
                }
                root_record = Some(record);
            }
        }
        let root_record = root_record.ok_or(TreeError::NoRoot)?;

        let mut children: HashMap<&str, Vec<&FlatNode>> = HashMap::new();
        for record in records {
            if let Some(parent) = record.parent_id.as_deref() {
                if !seen.contains(parent) {
                    return Err(TreeError::UnknownParent {
                        id: record.id.clone(),
                        parent: parent.to_string(),
                    });
                }
                children.entry(parent).or_default().push(record);
            }
        }

        let mut arena = Arena::new();
        let mut index = HashMap::new();
        let root = arena.new_node(flat_to_node(root_record));
        index.insert(root_record.id.clone(), root);

        let mut queue = VecDeque::from([(root_record.id.as_str(), root)]);
        while let Some((id, arena_id)) = queue.pop_front() {
            for child in children.get(id).into_iter().flatten() {
                let child_id = arena.new_node(flat_to_node(child));
                arena_id.append(child_id, &mut arena);
                index.insert(child.id.clone(), child_id);
                queue.push_back((child.id.as_str(), child_id));
            }
        }

        // Every non-root record has a known parent, so anything unreachable
        // from the root sits on a parent cycle.
        if let Some(stray) = records.iter().find(|r| !index.contains_key(&r.id)) {
            return Err(TreeError::ParentCycle(stray.id.clone()));
        }

        Ok(Self { arena, root, index })
    }

    /// Exports the map as a nested payload with parent ids filled in.
    pub fn to_tree(&self) -> TreeNode {
        self.subtree_payload(self.root)
    }

    /// Exports the map as parent-pointer records in depth-first order.
    pub fn to_flat(&self) -> Vec<FlatNode> {
        self.root
            .descendants(&self.arena)
            .filter_map(|nid| {
                let node = self.arena.get(nid)?.get();
                Some(FlatNode {
                    id: node.id.clone(),
                    title: node.title.clone(),
                    node_type: node.node_type.clone(),
                    parent_id: self.parent_of(nid).map(|p| p.id.clone()),
                })
            })
            .collect()
    }

    pub fn root_id(&self) -> &str {
        &self.node(self.root).id
    }

    pub fn root_node(&self) -> &Node {
        self.node(self.root)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|nid| self.node(*nid))
    }

    pub fn parent_id(&self, id: &str) -> Option<&str> {
        let nid = *self.index.get(id)?;
        self.parent_of(nid).map(|p| p.id.as_str())
    }

    /// Ordered child ids; empty for leaves and unknown ids.
    pub fn children_of(&self, id: &str) -> Vec<&str> {
        match self.index.get(id) {
            Some(nid) => nid
                .children(&self.arena)
                .map(|child| self.node(child).id.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn has_children(&self, id: &str) -> bool {
        self.index
            .get(id)
            .and_then(|nid| self.arena.get(*nid))
            .is_some_and(|n| n.first_child().is_some())
    }

    /// Distance from the root; the root has depth 0.
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        let nid = self.index.get(id)?;
        Some(nid.ancestors(&self.arena).count() - 1)
    }

    /// Ids from the immediate parent up to the root. Empty for the root or an unknown id.
    pub fn ancestors_of(&self, id: &str) -> Vec<String> {
        match self.index.get(id) {
            Some(nid) => nid
                .ancestors(&self.arena)
                .skip(1)
                .map(|a| self.node(a).id.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// All ids in depth-first pre-order, root first.
    pub fn ids(&self) -> Vec<String> {
        self.root
            .descendants(&self.arena)
            .map(|nid| self.node(nid).id.clone())
            .collect()
    }

    /// Case-insensitive title search. An empty term yields an empty result.
    pub fn search(&self, term: &str) -> SearchResult {
        let needle = term.to_lowercase();
        let mut result = SearchResult::default();
        if needle.is_empty() {
            return result;
        }

        for nid in self.root.descendants(&self.arena) {
            let node = self.node(nid);
            if !node.matches(&needle) {
                continue;
            }
            result.ordered.push(node.id.clone());
            result.matched_ids.insert(node.id.clone());
            for ancestor in nid.ancestors(&self.arena) {
                if !result.visible_path_ids.insert(self.node(ancestor).id.clone()) {
                    // Everything above was already recorded by an earlier match.
                    break;
                }
            }
        }
        result
    }

    /// Attaches `payload` (and its subtree) as the last child of `parent_id`.
    /// Nothing is modified when validation fails.
    pub fn add_child(&mut self, parent_id: &str, payload: TreeNode) -> Result<String, TreeError> {
        let parent = *self
            .index
            .get(parent_id)
            .ok_or_else(|| TreeError::NodeNotFound(parent_id.to_string()))?;

        let existing: HashSet<&str> = self.index.keys().map(String::as_str).collect();
        validate_subtree(&payload, Some(parent_id), &existing)?;

        let child = attach_subtree(&mut self.arena, &mut self.index, &payload, Some(parent));
        let child_id = self.node(child).id.clone();
        debug!(parent = parent_id, child = %child_id, "added child node");
        Ok(child_id)
    }

    pub fn edit_node(&mut self, id: &str, patch: NodePatch) -> Result<(), TreeError> {
        let nid = *self
            .index
            .get(id)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?;
        let node = self
            .arena
            .get_mut(nid)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?
            .get_mut();
        if let Some(title) = patch.title {
            node.title = title;
        }
        if let Some(node_type) = patch.node_type {
            node.node_type = node_type;
        }
        Ok(())
    }

    /// Deletes a node and its whole subtree, returning every removed id.
    pub fn delete_node(&mut self, id: &str) -> Result<Vec<String>, TreeError> {
        let nid = *self
            .index
            .get(id)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?;
        if nid == self.root {
            return Err(TreeError::CannotDeleteRoot);
        }

        let removed: Vec<String> = nid
            .descendants(&self.arena)
            .map(|d| self.node(d).id.clone())
            .collect();
        nid.remove_subtree(&mut self.arena);
        for removed_id in &removed {
            self.index.remove(removed_id);
        }
        debug!(id, removed = removed.len(), "deleted subtree");
        Ok(removed)
    }

    /// Moves a node one place up (`delta < 0`) or down among its siblings.
    /// Returns whether anything moved.
    pub fn move_node(&mut self, id: &str, delta: isize) -> Result<bool, TreeError> {
        let nid = *self
            .index
            .get(id)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?;
        if delta < 0 {
            if let Some(prev) = nid.preceding_siblings(&self.arena).nth(1) {
                prev.insert_before(nid, &mut self.arena);
                return Ok(true);
            }
        } else if delta > 0 {
            if let Some(next) = nid.following_siblings(&self.arena).nth(1) {
                next.insert_after(nid, &mut self.arena);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns an id of the form `n<k>` that is not yet used in this map.
    pub fn fresh_id(&self) -> String {
        let mut k = self.index.len();
        loop {
            let candidate = format!("n{}", k);
            if !self.index.contains_key(&candidate) {
                return candidate;
            }
            k += 1;
        }
    }

    fn node(&self, nid: NodeId) -> &Node {
        // Ids in the index always point at live arena entries.
        self.arena[nid].get()
    }

    fn parent_of(&self, nid: NodeId) -> Option<&Node> {
        nid.ancestors(&self.arena).nth(1).map(|p| self.node(p))
    }

    /// Builds the payload bottom-up so deep trees cannot overflow the stack.
    fn subtree_payload(&self, nid: NodeId) -> TreeNode {
        let order: Vec<NodeId> = nid.descendants(&self.arena).collect();
        let mut built: HashMap<NodeId, TreeNode> = HashMap::with_capacity(order.len());
        for &current in order.iter().rev() {
            let node = self.node(current);
            let children = current
                .children(&self.arena)
                .filter_map(|child| built.remove(&child))
                .collect();
            built.insert(
                current,
                TreeNode {
                    id: Some(node.id.clone()),
                    title: node.title.clone(),
                    node_type: node.node_type.clone(),
                    children,
                    parent_id: self.parent_of(current).map(|p| p.id.clone()),
                },
            );
        }
        built.remove(&nid).unwrap_or_default()
    }
}

fn flat_to_node(record: &FlatNode) -> Node {
    Node {
        id: record.id.clone(),
        title: record.title.clone(),
        node_type: record.node_type.clone(),
    }
}

/// Checks a nested payload before anything is attached. `parent_id` is the id
/// the payload root will hang under (`None` for a whole tree); `existing` holds
/// ids already present in the target map.
fn validate_subtree(
    payload: &TreeNode,
    parent_id: Option<&str>,
    existing: &HashSet<&str>,
) -> Result<(), TreeError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack = vec![(payload, parent_id)];

    while let Some((node, parent)) = stack.pop() {
        let id = node
            .id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| TreeError::MissingId {
                title: node.title.clone(),
            })?;
        if existing.contains(id) || !seen.insert(id) {
            return Err(TreeError::DuplicateId(id.to_string()));
        }
        if let Some(claimed) = node.parent_id.as_deref() {
            if Some(claimed) != parent {
                return Err(TreeError::InconsistentParent {
                    id: id.to_string(),
                    claimed: Some(claimed.to_string()),
                    actual: parent.map(str::to_string),
                });
            }
        }
        for child in node.children.iter().rev() {
            stack.push((child, Some(id)));
        }
    }
    Ok(())
}

/// Copies a validated payload into the arena and returns the arena id of its root.
fn attach_subtree(
    arena: &mut Arena<Node>,
    index: &mut HashMap<String, NodeId>,
    payload: &TreeNode,
    parent: Option<NodeId>,
) -> NodeId {
    let top = insert_node(arena, index, payload, parent);
    let mut stack: Vec<(&TreeNode, NodeId)> =
        payload.children.iter().rev().map(|c| (c, top)).collect();

    while let Some((node, parent)) = stack.pop() {
        let nid = insert_node(arena, index, node, Some(parent));
        for child in node.children.iter().rev() {
            stack.push((child, nid));
        }
    }
    top
}

fn insert_node(
    arena: &mut Arena<Node>,
    index: &mut HashMap<String, NodeId>,
    payload: &TreeNode,
    parent: Option<NodeId>,
) -> NodeId {
    let id = payload.id.clone().unwrap_or_default();
    let nid = arena.new_node(Node {
        id: id.clone(),
        title: payload.title.clone(),
        node_type: payload.node_type.clone(),
    });
    if let Some(parent) = parent {
        parent.append(nid, arena);
    }
    index.insert(id, nid);
    nid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MindMap {
        let payload = TreeNode::new("root", "Biology").with_children(vec![
            TreeNode::new("cells", "Cells").with_children(vec![
                TreeNode::new("mito", "Mitochondria"),
                TreeNode::new("nucleus", "Nucleus"),
            ]),
            TreeNode::new("plants", "Plants")
                .with_children(vec![TreeNode::new("photo", "Photosynthesis")]),
        ]);
        MindMap::from_tree(&payload).unwrap()
    }

    #[test]
    fn test_from_tree_preserves_structure() {
        let map = sample();
        assert_eq!(map.len(), 6);
        assert_eq!(map.root_id(), "root");
        assert_eq!(map.children_of("root"), vec!["cells", "plants"]);
        assert_eq!(map.children_of("cells"), vec!["mito", "nucleus"]);
        assert_eq!(map.parent_id("photo"), Some("plants"));
        assert_eq!(map.parent_id("root"), None);
    }

    #[test]
    fn test_find_node() {
        let map = sample();
        assert_eq!(map.find_node("mito").unwrap().title, "Mitochondria");
        assert!(map.find_node("missing").is_none());
    }

    #[test]
    fn test_ancestors_of() {
        let map = sample();
        assert_eq!(map.ancestors_of("mito"), vec!["cells", "root"]);
        assert!(map.ancestors_of("root").is_empty());
        assert!(map.ancestors_of("unknown").is_empty());
    }

    #[test]
    fn test_depth_of() {
        let map = sample();
        assert_eq!(map.depth_of("root"), Some(0));
        assert_eq!(map.depth_of("photo"), Some(2));
        assert_eq!(map.depth_of("nope"), None);
    }

    #[test]
    fn test_ids_are_depth_first() {
        let map = sample();
        assert_eq!(
            map.ids(),
            vec!["root", "cells", "mito", "nucleus", "plants", "photo"]
        );
    }

    #[test]
    fn test_search_empty_term() {
        let result = sample().search("");
        assert!(result.matched_ids.is_empty());
        assert!(result.visible_path_ids.is_empty());
    }

    #[test]
    fn test_search_includes_ancestors() {
        let map = sample();
        let result = map.search("PHOTO");
        assert!(result.matched_ids.contains("photo"));
        assert_eq!(result.matched_ids.len(), 1);
        for id in ["photo", "plants", "root"] {
            assert!(result.visible_path_ids.contains(id), "missing {}", id);
        }
        assert!(!result.visible_path_ids.contains("cells"));
    }

    #[test]
    fn test_search_multiple_matches_share_ancestors() {
        let map = sample();
        let result = map.search("u");
        // Nucleus, plus nothing else containing "u"
        assert_eq!(result.ordered, vec!["nucleus"]);
        let result = map.search("s");
        assert_eq!(
            result.ordered,
            vec!["cells", "nucleus", "plants", "photo"]
        );
        assert!(result.visible_path_ids.contains("root"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let payload = TreeNode::new("root", "R")
            .with_children(vec![TreeNode::new("a", "A"), TreeNode::new("a", "B")]);
        assert_eq!(
            MindMap::from_tree(&payload).unwrap_err(),
            TreeError::DuplicateId("a".into())
        );
    }

    #[test]
    fn test_missing_id_rejected() {
        let mut child = TreeNode::new("x", "No id");
        child.id = None;
        let payload = TreeNode::new("root", "R").with_children(vec![child]);
        assert!(matches!(
            MindMap::from_tree(&payload),
            Err(TreeError::MissingId { .. })
        ));
    }

    #[test]
    fn test_inconsistent_parent_rejected() {
        let mut child = TreeNode::new("a", "A");
        child.parent_id = Some("a".into());
        let payload = TreeNode::new("root", "R").with_children(vec![child]);
        assert!(matches!(
            MindMap::from_tree(&payload),
            Err(TreeError::InconsistentParent { .. })
        ));
    }

    #[test]
    fn test_from_flat_detects_cycle() {
        let records = vec![
            FlatNode {
                id: "root".into(),
                title: "R".into(),
                node_type: None,
                parent_id: None,
            },
            FlatNode {
                id: "a".into(),
                title: "A".into(),
                node_type: None,
                parent_id: Some("b".into()),
            },
            FlatNode {
                id: "b".into(),
                title: "B".into(),
                node_type: None,
                parent_id: Some("a".into()),
            },
        ];
        assert_eq!(
            MindMap::from_flat(&records).unwrap_err(),
            TreeError::ParentCycle("a".into())
        );
    }

    #[test]
    fn test_flat_round_trip_keeps_order() {
        let map = sample();
        let rebuilt = MindMap::from_flat(&map.to_flat()).unwrap();
        assert_eq!(rebuilt.ids(), map.ids());
        assert_eq!(rebuilt.parent_id("nucleus"), Some("cells"));
    }

    #[test]
    fn test_add_child() {
        let mut map = sample();
        let id = map
            .add_child("mito", TreeNode::new("atp", "ATP").with_type("concept"))
            .unwrap();
        assert_eq!(id, "atp");
        assert_eq!(map.parent_id("atp"), Some("mito"));
        assert_eq!(map.find_node("atp").unwrap().node_type.as_deref(), Some("concept"));
    }

    #[test]
    fn test_add_child_rejects_collision_without_partial_insert() {
        let mut map = sample();
        let payload = TreeNode::new("new", "New").with_children(vec![TreeNode::new("mito", "dup")]);
        assert_eq!(
            map.add_child("root", payload).unwrap_err(),
            TreeError::DuplicateId("mito".into())
        );
        assert!(!map.contains("new"));
        assert_eq!(map.len(), 6);
    }

    #[test]
    fn test_add_child_unknown_parent() {
        let mut map = sample();
        assert_eq!(
            map.add_child("ghost", TreeNode::new("z", "Z")).unwrap_err(),
            TreeError::NodeNotFound("ghost".into())
        );
    }

    #[test]
    fn test_edit_node() {
        let mut map = sample();
        map.edit_node("cells", NodePatch::title("Cell Biology")).unwrap();
        assert_eq!(map.find_node("cells").unwrap().title, "Cell Biology");
        map.edit_node(
            "cells",
            NodePatch {
                title: None,
                node_type: Some(Some("topic".into())),
            },
        )
        .unwrap();
        let node = map.find_node("cells").unwrap();
        assert_eq!(node.title, "Cell Biology");
        assert_eq!(node.node_type.as_deref(), Some("topic"));
    }

    #[test]
    fn test_delete_node_removes_subtree() {
        let mut map = sample();
        let removed = map.delete_node("cells").unwrap();
        assert_eq!(removed, vec!["cells", "mito", "nucleus"]);
        assert_eq!(map.len(), 3);
        assert!(!map.contains("mito"));
        assert_eq!(map.children_of("root"), vec!["plants"]);
    }

    #[test]
    fn test_delete_root_rejected() {
        let mut map = sample();
        assert_eq!(map.delete_node("root").unwrap_err(), TreeError::CannotDeleteRoot);
        assert_eq!(map.len(), 6);
    }

    #[test]
    fn test_move_node() {
        let mut map = sample();
        assert!(map.move_node("plants", -1).unwrap());
        assert_eq!(map.children_of("root"), vec!["plants", "cells"]);
        assert!(!map.move_node("plants", -1).unwrap());
        assert!(map.move_node("plants", 1).unwrap());
        assert_eq!(map.children_of("root"), vec!["cells", "plants"]);
    }

    #[test]
    fn test_to_tree_fills_parent_ids() {
        let tree = sample().to_tree();
        assert_eq!(tree.parent_id, None);
        assert_eq!(tree.children[0].parent_id.as_deref(), Some("root"));
        assert_eq!(tree.children[0].children[1].parent_id.as_deref(), Some("cells"));
        // Exported payloads load back.
        assert!(MindMap::from_tree(&tree).is_ok());
    }

    #[test]
    fn test_to_tree_on_long_chain() {
        let depth: usize = 1_000;
        let records: Vec<FlatNode> = (0..depth)
            .map(|i| FlatNode {
                id: format!("c{}", i),
                title: format!("Level {}", i),
                node_type: None,
                parent_id: i.checked_sub(1).map(|p| format!("c{}", p)),
            })
            .collect();
        let tree = MindMap::from_flat(&records).unwrap().to_tree();

        let mut current = &tree;
        let mut seen = 1;
        while let Some(child) = current.children.first() {
            assert_eq!(current.children.len(), 1);
            assert_eq!(child.parent_id, current.id);
            current = child;
            seen += 1;
        }
        assert_eq!(seen, depth);
        assert_eq!(current.id.as_deref(), Some("c999"));
    }

    #[test]
    fn test_fresh_id_is_unused() {
        let mut map = sample();
        let id = map.fresh_id();
        assert!(!map.contains(&id));
        map.add_child("root", TreeNode::new(id.clone(), "x")).unwrap();
        assert_ne!(map.fresh_id(), id);
    }
}
