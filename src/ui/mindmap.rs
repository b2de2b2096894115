use crate::app::AppState;
use crate::geometry::Point;
use crate::layout::LayoutResult;
use crate::ui::canvas::BufferCanvas;
use crate::ui::constants::{COLLAPSED_MARKER, EDGE_CHAR, LABEL_MAX_LINES, LABEL_WIDTH};
use crate::ui::text::{display_width, wrap_label};
use crate::ui::theme::Palette;
use crate::view_state::Emphasis;
use ratatui::{layout::Rect, widgets::Paragraph, Frame};

// Mind map renderer
pub struct MindMapRenderer<'a> {
    app: &'a AppState,
    palette: Palette,
}

impl<'a> MindMapRenderer<'a> {
    pub fn new(app: &'a AppState) -> Self {
        Self {
            app,
            palette: Palette::from(&app.config.theme),
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let canvas = self.paint(area.width as usize, area.height as usize);
        let paragraph = Paragraph::new(canvas.to_lines());
        frame.render_widget(paragraph, area);
    }

    /// Draws edges first, then labels on top.
    pub fn paint(&self, width: usize, height: usize) -> BufferCanvas {
        let mut canvas = BufferCanvas::new(width, height);
        let layout = self.app.controller.visible_layout();
        self.draw_edges(&mut canvas, &layout);
        self.draw_nodes(&mut canvas, &layout);
        canvas
    }

    /// World position to the (column, row) of the cell containing it.
    fn to_cell(&self, world: Point) -> (i32, i32) {
        let screen = self.app.controller.viewport().to_screen(world);
        let terminal = &self.app.config.terminal;
        (
            (screen.x / terminal.cell_width_px).floor() as i32,
            (screen.y / terminal.cell_height_px).floor() as i32,
        )
    }

    fn draw_edges(&self, canvas: &mut BufferCanvas, layout: &LayoutResult) {
        let controller = &self.app.controller;
        let view = controller.view();
        let zoom = controller.viewport().zoom();
        let cell = self
            .app
            .config
            .terminal
            .cell_width_px
            .min(self.app.config.terminal.cell_height_px);

        for edge in controller.edges_for(layout) {
            let style = self
                .palette
                .edge_style(view.emphasis(&edge.to_id) == Emphasis::Faded);
            // Roughly two samples per cell along the chord.
            let steps = ((edge.from.distance(edge.to) * zoom / cell) * 2.0)
                .ceil()
                .clamp(1.0, 2000.0) as usize;
            for i in 0..=steps {
                let (x, y) = self.to_cell(edge.point_at(i as f64 / steps as f64));
                canvas.plot(x, y, EDGE_CHAR, style);
            }
        }
    }

    fn draw_nodes(&self, canvas: &mut BufferCanvas, layout: &LayoutResult) {
        let map = self.app.controller.map();
        let view = self.app.controller.view();
        let root_id = map.root_id();

        for (id, position) in layout.iter() {
            let Some(node) = map.find_node(id) else {
                continue;
            };
            let collapsed = map.has_children(id) && !view.is_expanded(id);
            let label = if collapsed {
                format!("{}{}", node.title, COLLAPSED_MARKER)
            } else {
                node.title.clone()
            };

            let lines = wrap_label(&label, LABEL_WIDTH, LABEL_MAX_LINES);
            let style = self.palette.node_style(
                id == root_id,
                view.emphasis(id),
                view.selected() == Some(id),
            );

            let (cx, cy) = self.to_cell(position.point());
            let top = cy - (lines.len() as i32 - 1) / 2;
            for (i, line) in lines.iter().enumerate() {
                let x = cx - display_width(line) as i32 / 2;
                canvas.draw_styled_text(x, top + i as i32, line, style);
            }
        }
    }
}
