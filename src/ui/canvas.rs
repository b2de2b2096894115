use crate::ui::constants::{CharBuffer, StyleBuffer, WIDE_CONTINUATION};
use ratatui::{
    style::Style,
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

// Buffer canvas for drawing characters and styles. Coordinates are signed so
// that shapes partly off screen can be drawn without clipping first.
pub struct BufferCanvas {
    pub char_buffer: CharBuffer,
    pub style_buffer: StyleBuffer,
    pub width: usize,
    pub height: usize,
}

impl BufferCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            char_buffer: vec![vec![' '; width]; height],
            style_buffer: vec![vec![Style::default(); width]; height],
            width,
            height,
        }
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (y as usize) < self.height && (x as usize) < self.width
    }

    pub fn char_at(&self, x: i32, y: i32) -> Option<char> {
        self.in_bounds(x, y)
            .then(|| self.char_buffer[y as usize][x as usize])
    }

    pub fn set_char(&mut self, x: i32, y: i32, ch: char, style: Style) {
        if self.in_bounds(x, y) {
            self.char_buffer[y as usize][x as usize] = ch;
            self.style_buffer[y as usize][x as usize] = style;
        }
    }

    /// Draws `ch` only over blank cells, so edges never cover labels.
    pub fn plot(&mut self, x: i32, y: i32, ch: char, style: Style) {
        if self.char_at(x, y) == Some(' ') {
            self.set_char(x, y, ch, style);
        }
    }

    /// Draws text starting at `(x, y)`; double-width characters take two cells.
    pub fn draw_styled_text(&mut self, x: i32, y: i32, text: &str, style: Style) {
        let mut col = x;
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0) as i32;
            if w == 0 {
                continue;
            }
            if w == 2 && !(self.in_bounds(col, y) && self.in_bounds(col + 1, y)) {
                // Half a wide glyph cannot be shown.
                self.set_char(col, y, ' ', style);
                self.set_char(col + 1, y, ' ', style);
            } else {
                self.set_char(col, y, ch, style);
                if w == 2 {
                    self.set_char(col + 1, y, WIDE_CONTINUATION, style);
                }
            }
            col += w;
        }
    }

    pub fn to_lines(&self) -> Vec<Line<'_>> {
        let mut lines = Vec::new();

        for (y, row) in self.char_buffer.iter().enumerate() {
            let mut spans = Vec::new();
            let mut current_style = Style::default();
            let mut current_text = String::new();

            for (x, &ch) in row.iter().enumerate() {
                if ch == WIDE_CONTINUATION {
                    continue;
                }
                let style = self.style_buffer[y][x];
                if style != current_style {
                    if !current_text.is_empty() {
                        spans.push(Span::styled(std::mem::take(&mut current_text), current_style));
                    }
                    current_style = style;
                }
                current_text.push(ch);
            }

            if !current_text.is_empty() {
                spans.push(Span::styled(current_text, current_style));
            }

            lines.push(Line::from(spans));
        }

        lines
    }

    /// Plain text of one row, for tests and debugging.
    pub fn row_text(&self, y: usize) -> String {
        self.char_buffer
            .get(y)
            .map(|row| row.iter().filter(|&&c| c != WIDE_CONTINUATION).collect())
            .unwrap_or_default()
    }
}
