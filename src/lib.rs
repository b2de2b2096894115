pub mod backend;
pub mod config;
pub mod controller;
pub mod errors;
pub mod geometry;
pub mod gesture;
pub mod layout;
pub mod logging;
pub mod model;
pub mod parser;
pub mod tree;
pub mod view_state;
pub mod viewport;

// Terminal front end
pub mod actions;
pub mod app;
pub mod event;
pub mod ui;

// Re-export commonly used types
pub use app::{AppMode, AppState};
pub use config::AppConfig;
pub use controller::{EngineConfig, MindMapController, NullAdapter, RenderAdapter};
pub use errors::{AppError, AppResult, TreeError};
pub use geometry::{Point, Size};
pub use layout::{LayoutResult, LayoutStrategy};
pub use model::{Node, NodePatch, TreeNode};
pub use tree::MindMap;
pub use view_state::ViewState;
