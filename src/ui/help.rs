use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

// Help section structure
pub struct HelpSection {
    pub title: &'static str,
    pub items: &'static [(&'static str, &'static str)],
}

// Help section definitions
pub const SECTIONS: &[HelpSection] = &[
    HelpSection {
        title: "Navigation:",
        items: &[
            ("h/←", "Parent"),
            ("l/→", "First child (expands)"),
            ("j/↓", "Next sibling"),
            ("k/↑", "Previous sibling"),
            ("⇥/⇤", "Next / previous visible node"),
            ("m/~", "Go to root"),
        ],
    },
    HelpSection {
        title: "Editing:",
        items: &[
            ("e/i", "Rename node"),
            ("o/⏎", "Insert sibling"),
            ("O/a", "Insert child"),
            ("d  ", "Delete node and subtree"),
            ("J/K", "Move node down / up"),
            ("g  ", "Generate a map for a topic"),
        ],
    },
    HelpSection {
        title: "View:",
        items: &[
            ("␣  ", "Toggle collapse"),
            ("v  ", "Collapse all"),
            ("b  ", "Expand all"),
            ("1-5", "Collapse to level"),
            ("+/-", "Zoom in / out"),
            ("⇧+arrows", "Pan"),
            ("0  ", "Reset view"),
            ("f  ", "Fit to screen"),
            ("r  ", "Switch radial / vertical layout"),
        ],
    },
    HelpSection {
        title: "Search:",
        items: &[
            ("/  ", "Search titles"),
            ("n/N", "Next / previous result"),
            ("Esc", "Clear search"),
        ],
    },
    HelpSection {
        title: "Mouse:",
        items: &[
            ("click", "Select node"),
            ("double click", "Toggle node"),
            ("hold", "Rename node"),
            ("drag", "Pan"),
            ("wheel", "Zoom"),
        ],
    },
    HelpSection {
        title: "File:",
        items: &[
            ("s  ", "Save"),
            ("x  ", "Export JSON"),
            ("X  ", "Export outline"),
            ("q  ", "Quit"),
        ],
    },
];

// Help renderer
pub struct HelpRenderer;

impl HelpRenderer {
    pub fn render(frame: &mut Frame, area: Rect) {
        let help_text = Self::build_help_text();
        let block = Block::default().borders(Borders::ALL).title(" Help ");
        let paragraph = Paragraph::new(help_text)
            .block(block)
            .wrap(Wrap { trim: false });

        frame.render_widget(paragraph, area);
    }

    fn build_help_text() -> Vec<Line<'static>> {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = vec![
            Line::from(Span::styled("mindmap-rs Help", bold)),
            Line::from(""),
        ];

        for section in SECTIONS {
            lines.push(Line::from(Span::styled(section.title, bold)));
            for (key, desc) in section.items {
                lines.push(Line::from(format!("  {:<12} {}", key, desc)));
            }
            lines.push(Line::from(""));
        }

        lines.push(Line::from("Press ESC or q to close help"));
        lines
    }
}
