use ratatui::style::Style;

// Type aliases for clarity
pub type CharBuffer = Vec<Vec<char>>;
pub type StyleBuffer = Vec<Vec<Style>>;

// Constants for rendering
pub const CURSOR_INDICATOR: char = '▌';
pub const STATUS_EDIT_PREFIX: &str = "Edit: ";
pub const STATUS_NEW_PREFIX: &str = "New: ";
pub const STATUS_TOPIC_PREFIX: &str = "Topic: ";
pub const STATUS_SEARCH_PREFIX: &str = "Search: ";

/// Stands in for the right half of a double-width character.
pub const WIDE_CONTINUATION: char = '\0';

/// Dot used when sampling edge curves onto cells.
pub const EDGE_CHAR: char = '·';

/// Appended to nodes whose children are hidden.
pub const COLLAPSED_MARKER: &str = " [+]";

/// Label wrapping, in cells.
pub const LABEL_WIDTH: usize = 22;
pub const LABEL_MAX_LINES: usize = 2;
