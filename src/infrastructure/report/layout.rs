// ============================================================
// PAGE COMPOSER
// ============================================================
// Top-down flow layout with page breaks

use super::chart::BarChart;
use super::pdf::{Anchor, PageCanvas};
use super::styles::{Align, Color, Font, PageGeometry, TableStyle, TextStyle};

/// Greedy word wrap using font metrics. Words wider than the line are broken
/// between characters.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        for piece in break_word(word, font, size, max_width) {
            if current.is_empty() {
                current = piece;
                continue;
            }

            let candidate = format!("{} {}", current, piece);
            if font.text_width(&candidate, size) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current = piece;
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split `word` into the longest runs that fit `max_width`. A piece always
/// holds at least one character.
fn break_word(word: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    if font.text_width(word, size) <= max_width {
        return vec![word.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        if current.chars().count() > 1 && font.text_width(&current, size) > max_width {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Lays content out from the top of the page downward, starting a new page
/// whenever the next block does not fit above the bottom margin.
pub struct PageComposer {
    geometry: PageGeometry,
    pages: Vec<PageCanvas>,
    cursor: f32,
}

impl PageComposer {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: vec![PageCanvas::new()],
            cursor: geometry.content_top(),
        }
    }

    pub fn remaining(&self) -> f32 {
        self.cursor - self.geometry.content_bottom()
    }

    fn at_page_top(&self) -> bool {
        self.cursor >= self.geometry.content_top()
    }

    fn new_page(&mut self) {
        self.pages.push(PageCanvas::new());
        self.cursor = self.geometry.content_top();
    }

    /// Break to a new page unless `height` fits below the cursor.
    pub fn ensure_space(&mut self, height: f32) {
        if height > self.remaining() && !self.at_page_top() {
            self.new_page();
        }
    }

    pub fn spacer(&mut self, height: f32) {
        if height >= self.remaining() {
            self.new_page();
        } else {
            self.cursor -= height;
        }
    }

    fn canvas(&mut self) -> &mut PageCanvas {
        let index = self.pages.len() - 1;
        &mut self.pages[index]
    }

    fn line_x(&self, width: f32, align: Align) -> (f32, Anchor) {
        match align {
            Align::Left => (self.geometry.content_left(), Anchor::Start),
            Align::Center => (self.geometry.center_x(), Anchor::Middle),
            Align::Right => (
                self.geometry.content_left() + width,
                Anchor::End,
            ),
        }
    }

    /// Wrapped paragraph. Lines flow across pages individually.
    pub fn paragraph(&mut self, text: &str, style: &TextStyle) {
        let width = self.geometry.content_width();
        let lines = wrap_text(text, style.font, style.size, width);
        self.lines(&lines, style);
    }

    /// Pre-broken lines sharing one style.
    pub fn lines(&mut self, lines: &[String], style: &TextStyle) {
        if style.space_before > 0.0 && !self.at_page_top() {
            self.spacer(style.space_before);
        }

        let width = self.geometry.content_width();
        for line in lines {
            self.ensure_space(style.leading);
            self.cursor -= style.leading;
            let baseline = self.cursor + (style.leading - style.size);
            let (x, anchor) = self.line_x(width, style.align);
            self.canvas().text(
                line,
                x,
                baseline,
                style.font,
                style.size,
                style.color,
                anchor,
                0.0,
            );
        }

        if style.space_after > 0.0 {
            self.spacer(style.space_after);
        }
    }

    /// Heading kept on the same page as at least `keep_with_next` points of
    /// the content that follows it.
    pub fn heading(&mut self, text: &str, style: &TextStyle, keep_with_next: f32) {
        let needed = style.space_before + style.leading + style.space_after + keep_with_next;
        self.ensure_space(needed);
        self.paragraph(text, style);
    }

    /// Two-column table, centered in the content area. `rows[0]` is the
    /// header row.
    pub fn table(&mut self, rows: &[[String; 2]], style: &TableStyle) {
        if rows.is_empty() {
            return;
        }

        let table_width: f32 = style.column_widths.iter().sum();
        let height = style.header_row_height + style.row_height * (rows.len() - 1) as f32;
        self.ensure_space(height);

        let left = self.geometry.center_x() - table_width / 2.0;
        let mut top = self.cursor;

        for (index, row) in rows.iter().enumerate() {
            let (row_height, text_style, background) = if index == 0 {
                (style.header_row_height, &style.header, style.header_background)
            } else {
                (
                    style.row_height,
                    &style.cell,
                    style.row_backgrounds[(index - 1) % style.row_backgrounds.len()],
                )
            };
            let bottom = top - row_height;
            let baseline = bottom + (row_height - text_style.size * 0.7) / 2.0;

            let canvas = self.canvas();
            canvas.fill_rect(left, bottom, table_width, row_height, background);

            let mut cell_left = left;
            for (column, value) in row.iter().enumerate() {
                let cell_width = style.column_widths[column];
                let right_aligned = index > 0 && column == 1;
                let (x, anchor) = if right_aligned {
                    (cell_left + cell_width - style.padding, Anchor::End)
                } else {
                    (cell_left + style.padding, Anchor::Start)
                };
                canvas.text(
                    value,
                    x,
                    baseline,
                    text_style.font,
                    text_style.size,
                    text_style.color,
                    anchor,
                    0.0,
                );
                canvas.stroke_rect(
                    cell_left,
                    bottom,
                    cell_width,
                    row_height,
                    style.grid_width,
                    style.grid_color,
                );
                cell_left += cell_width;
            }

            top = bottom;
        }

        self.cursor = top;
    }

    /// Chart centered horizontally at `width` x `height` points.
    pub fn chart(&mut self, chart: BarChart, width: f32, height: f32) {
        self.ensure_space(height);
        let x = self.geometry.center_x() - width / 2.0;
        let y = self.cursor - height;
        chart.draw(self.canvas(), x, y, width, height);
        self.cursor = y;
    }

    /// Horizontal rule centered in the content area.
    pub fn divider(&mut self, width: f32, thickness: f32, color: Color) {
        self.ensure_space(thickness);
        let x = self.geometry.center_x() - width / 2.0;
        let y = self.cursor;
        self.canvas().line((x, y), (x + width, y), thickness, color);
        self.cursor -= thickness;
    }

    pub fn finish(self) -> Vec<PageCanvas> {
        self.pages
    }
}
