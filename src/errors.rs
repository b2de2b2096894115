use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;

/// Structural problems with a tree payload or a tree mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node titled {title:?} has no id")]
    MissingId { title: String },

    #[error("Duplicate node id: {0}")]
    DuplicateId(String),

    #[error("Node {id} claims parent {claimed:?} but is a child of {actual:?}")]
    InconsistentParent {
        id: String,
        claimed: Option<String>,
        actual: Option<String>,
    },

    #[error("Parent references of node {0} form a cycle")]
    ParentCycle(String),

    #[error("Node {id} refers to unknown parent {parent}")]
    UnknownParent { id: String, parent: String },

    #[error("Tree has no root node")]
    NoRoot,

    #[error("Tree has more than one root: {0} and {1}")]
    MultipleRoots(String, String),

    #[error("Node with ID {0} not found")]
    NodeNotFound(String),

    #[error("Invalid operation: Cannot delete the root node")]
    CannotDeleteRoot,
}

impl TreeError {
    /// Whether this error means the payload itself cannot be displayed.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, TreeError::NodeNotFound(_) | TreeError::CannotDeleteRoot)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization/Deserialization error (JSON): {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed tree: {0}")]
    Tree(#[from] TreeError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Import/Export error: {0}")]
    FormatError(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_classification() {
        assert!(TreeError::DuplicateId("a".into()).is_malformed());
        assert!(TreeError::ParentCycle("a".into()).is_malformed());
        assert!(!TreeError::CannotDeleteRoot.is_malformed());
        assert!(!TreeError::NodeNotFound("x".into()).is_malformed());
    }

    #[test]
    fn test_tree_error_converts_into_app_error() {
        let err: AppError = TreeError::NoRoot.into();
        assert_eq!(err.to_string(), "Malformed tree: Tree has no root node");
    }
}
