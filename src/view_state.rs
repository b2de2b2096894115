use std::collections::HashSet;

use tracing::{debug, warn};

use crate::tree::{MindMap, SearchResult};

/// How a node should be drawn relative to the active search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    /// No search is active.
    Normal,
    /// Title contains the search term.
    Match,
    /// Ancestor of a match.
    OnPath,
    /// Unrelated to any match; drawn de-emphasized but still shown.
    Faded,
}

/// Expansion, selection and search state layered over a `MindMap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    expanded: HashSet<String>,
    selected: Option<String>,
    search_term: String,
    search: SearchResult,
}

impl ViewState {
    /// Fresh state for a map: only the root is expanded.
    pub fn new(map: &MindMap) -> Self {
        Self {
            expanded: HashSet::from([map.root_id().to_string()]),
            selected: None,
            search_term: String::new(),
            search: SearchResult::default(),
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn expanded_ids(&self) -> &HashSet<String> {
        &self.expanded
    }

    /// Flips a node's expansion and returns the new state. Descendant flags are
    /// left alone, so re-expanding restores the previous sub-state.
    pub fn toggle_expand(&mut self, id: &str) -> bool {
        let expanded = if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.to_string());
            true
        };
        debug!(id, expanded, "toggled expansion");
        expanded
    }

    pub fn set_expanded(&mut self, id: &str, expanded: bool) {
        if expanded {
            self.expanded.insert(id.to_string());
        } else {
            self.expanded.remove(id);
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id.map(str::to_string);
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn search(&self) -> &SearchResult {
        &self.search
    }

    pub fn matched_ids(&self) -> impl Iterator<Item = &str> {
        self.search.matched_ids.iter().map(String::as_str)
    }

    pub fn visible_path_ids(&self) -> impl Iterator<Item = &str> {
        self.search.visible_path_ids.iter().map(String::as_str)
    }

    pub fn set_search(&mut self, map: &MindMap, term: &str) {
        self.search_term = term.to_string();
        self.search = map.search(term);
    }

    /// Recomputes derived search sets after the tree changed.
    pub fn refresh_search(&mut self, map: &MindMap) {
        self.search = map.search(&self.search_term);
    }

    pub fn emphasis(&self, id: &str) -> Emphasis {
        if self.search_term.is_empty() {
            Emphasis::Normal
        } else if self.search.matched_ids.contains(id) {
            Emphasis::Match
        } else if self.search.visible_path_ids.contains(id) {
            Emphasis::OnPath
        } else {
            Emphasis::Faded
        }
    }

    /// The root is always visible; any other node is visible iff every ancestor is expanded.
    pub fn is_visible(&self, map: &MindMap, id: &str) -> bool {
        if !map.contains(id) {
            return false;
        }
        map.ancestors_of(id)
            .iter()
            .all(|ancestor| self.expanded.contains(ancestor))
    }

    /// Visible node ids in depth-first order.
    pub fn visible_ids(&self, map: &MindMap) -> Vec<String> {
        let mut visible = Vec::new();
        let mut stack = vec![map.root_id().to_string()];
        while let Some(id) = stack.pop() {
            if self.expanded.contains(&id) {
                for child in map.children_of(&id).into_iter().rev() {
                    stack.push(child.to_string());
                }
            }
            visible.push(id);
        }
        visible
    }

    /// Forgets the given ids, typically the ones removed by a delete.
    pub fn remove_ids<'a>(&mut self, ids: impl IntoIterator<Item = &'a String>) {
        for id in ids {
            self.expanded.remove(id);
            if self.selected.as_ref() == Some(id) {
                self.selected = None;
            }
        }
    }

    /// Drops expanded/selected ids that no longer exist in the map. Returns the dropped ids.
    pub fn prune(&mut self, map: &MindMap) -> Vec<String> {
        let mut dropped: Vec<String> = self
            .expanded
            .iter()
            .filter(|id| !map.contains(id))
            .cloned()
            .collect();
        self.expanded.retain(|id| map.contains(id));

        if let Some(selected) = self.selected.take() {
            if map.contains(&selected) {
                self.selected = Some(selected);
            } else {
                dropped.push(selected);
            }
        }

        if !dropped.is_empty() {
            dropped.sort();
            dropped.dedup();
            warn!(?dropped, "pruned dangling ids from view state");
        }
        dropped
    }

    pub fn expand_all(&mut self, map: &MindMap) {
        self.expanded = map.ids().into_iter().collect();
    }

    /// Collapses everything except the root.
    pub fn collapse_all(&mut self, map: &MindMap) {
        self.expanded = HashSet::from([map.root_id().to_string()]);
    }

    /// Expands nodes shallower than `level` and collapses the rest.
    pub fn collapse_to_level(&mut self, map: &MindMap, level: usize) {
        self.expanded = map
            .ids()
            .into_iter()
            .filter(|id| map.depth_of(id).is_some_and(|depth| depth < level))
            .collect();
    }

    /// Expands every ancestor of `id` so that it becomes visible.
    pub fn reveal(&mut self, map: &MindMap, id: &str) {
        for ancestor in map.ancestors_of(id) {
            self.expanded.insert(ancestor);
        }
    }
}
