use crate::config::{parse_hex_color, ThemeConfig};
use crate::view_state::Emphasis;
use ratatui::style::{Color, Modifier, Style};

/// Resolved terminal colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub root: Color,
    pub node: Color,
    pub selected: Color,
    pub matched: Color,
    pub path: Color,
    pub faded: Color,
    pub edge: Color,
    pub status: Color,
}

fn color(value: &str) -> Color {
    parse_hex_color(value)
        .map(|(r, g, b)| Color::Rgb(r, g, b))
        .unwrap_or(Color::Reset)
}

impl From<&ThemeConfig> for Palette {
    fn from(theme: &ThemeConfig) -> Self {
        Self {
            root: color(&theme.root),
            node: color(&theme.node),
            selected: color(&theme.selected),
            matched: color(&theme.matched),
            path: color(&theme.path),
            faded: color(&theme.faded),
            edge: color(&theme.edge),
            status: color(&theme.status),
        }
    }
}

impl Palette {
    pub fn node_style(&self, is_root: bool, emphasis: Emphasis, selected: bool) -> Style {
        let style = match emphasis {
            Emphasis::Normal if is_root => Style::default()
                .fg(self.root)
                .add_modifier(Modifier::BOLD),
            Emphasis::Normal => Style::default().fg(self.node),
            Emphasis::Match => Style::default()
                .fg(self.matched)
                .add_modifier(Modifier::BOLD),
            Emphasis::OnPath => Style::default().fg(self.path),
            Emphasis::Faded => Style::default().fg(self.faded),
        };
        if selected {
            style
                .fg(Color::Black)
                .bg(self.selected)
                .add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    pub fn edge_style(&self, faded: bool) -> Style {
        let style = Style::default().fg(self.edge);
        if faded {
            style.add_modifier(Modifier::DIM)
        } else {
            style
        }
    }
}
