use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::errors::{AppError, AppResult, TreeError};
use crate::model::{FlatNode, TreeNode, ROOT_ID};
use crate::tree::MindMap;

/// Title of the node added when an outline has several top-level entries.
pub const SYNTHETIC_ROOT_TITLE: &str = "Mind Map";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Nested payload or flat list, as JSON.
    Json,
    /// Indented text outline.
    Outline,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Outline,
        }
    }
}

pub fn load_file(path: &Path) -> AppResult<MindMap> {
    let content = fs::read_to_string(path)?;
    let map = match FileFormat::from_path(path) {
        FileFormat::Json => parse_json(&content)?,
        FileFormat::Outline => parse_outline(&content)?,
    };
    info!(path = %path.display(), nodes = map.len(), "loaded file");
    Ok(map)
}

pub fn save_file(map: &MindMap, path: &Path) -> AppResult<()> {
    let content = match FileFormat::from_path(path) {
        FileFormat::Json => to_json(map)?,
        FileFormat::Outline => to_outline(map),
    };
    fs::write(path, content)?;
    info!(path = %path.display(), "saved file");
    Ok(())
}

/// Accepts either a nested tree object or a flat array of `{id, parentId}` records.
pub fn parse_json(content: &str) -> AppResult<MindMap> {
    let value: Value = serde_json::from_str(content)?;
    let map = match value {
        Value::Array(_) => {
            let records: Vec<FlatNode> = serde_json::from_value(value)?;
            MindMap::from_flat(&records)?
        }
        Value::Object(_) => {
            let payload: TreeNode = serde_json::from_value(value)?;
            MindMap::from_tree(&payload)?
        }
        _ => {
            return Err(AppError::FormatError(
                "expected a tree object or a list of nodes".to_string(),
            ))
        }
    };
    Ok(map)
}

pub fn to_json(map: &MindMap) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(&map.to_tree())?)
}

/// Normalized `(indent, title)` pairs: tabs count as two spaces, `*`/`-`/`•`
/// bullets count as indentation, blank lines are dropped and the smallest
/// indent becomes zero.
fn outline_lines(content: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    for raw in content.lines() {
        let line = raw.replace('\t', "  ").replace('•', "*");
        let trimmed = line.trim_start();
        if trimmed.trim().is_empty() {
            continue;
        }
        let mut indent = line.len() - trimmed.len();
        let title = match trimmed.strip_prefix("* ").or_else(|| trimmed.strip_prefix("- ")) {
            Some(rest) => {
                indent += 2;
                rest.trim()
            }
            None => trimmed.trim(),
        };
        if !title.is_empty() {
            lines.push((indent, title.to_string()));
        }
    }

    let min_indent = lines.iter().map(|(indent, _)| *indent).min().unwrap_or(0);
    for (indent, _) in &mut lines {
        *indent -= min_indent;
    }
    lines
}

/// Parses an indented outline. A single top-level entry becomes the root;
/// several are gathered under a synthetic root. Ids are `root`, `n1`, `n2`, ...
/// in document order.
pub fn parse_outline(content: &str) -> Result<MindMap, TreeError> {
    let lines = outline_lines(content);
    if lines.is_empty() {
        return Ok(MindMap::default());
    }

    // Parent line index of every line, by indentation.
    let mut parents: Vec<Option<usize>> = Vec::with_capacity(lines.len());
    let mut stack: Vec<(usize, usize)> = Vec::new();
    for (index, (indent, _)) in lines.iter().enumerate() {
        while stack.last().is_some_and(|(_, open)| *open >= *indent) {
            stack.pop();
        }
        parents.push(stack.last().map(|(line, _)| *line));
        stack.push((index, *indent));
    }

    let synthetic = parents.iter().filter(|p| p.is_none()).count() != 1;
    let mut records = Vec::with_capacity(lines.len() + 1);
    let mut ids: Vec<String> = Vec::with_capacity(lines.len());
    let mut counter = 0;

    if synthetic {
        records.push(FlatNode {
            id: ROOT_ID.to_string(),
            title: SYNTHETIC_ROOT_TITLE.to_string(),
            node_type: None,
            parent_id: None,
        });
    }

    for ((_, title), parent) in lines.into_iter().zip(parents) {
        let id = if records.is_empty() {
            ROOT_ID.to_string()
        } else {
            counter += 1;
            format!("n{}", counter)
        };
        let parent_id = match parent {
            Some(line) => Some(ids[line].clone()),
            None if synthetic => Some(ROOT_ID.to_string()),
            None => None,
        };
        ids.push(id.clone());
        records.push(FlatNode {
            id,
            title,
            node_type: None,
            parent_id,
        });
    }

    MindMap::from_flat(&records)
}

/// Tab-indented outline of the whole map, one node per line.
pub fn to_outline(map: &MindMap) -> String {
    let mut out = String::new();
    let mut stack = vec![(map.root_id().to_string(), 0usize)];
    while let Some((id, depth)) = stack.pop() {
        if let Some(node) = map.find_node(&id) {
            out.push_str(&"\t".repeat(depth));
            out.push_str(&node.title);
            out.push('\n');
        }
        for child in map.children_of(&id).into_iter().rev() {
            stack.push((child.to_string(), depth + 1));
        }
    }
    out
}
