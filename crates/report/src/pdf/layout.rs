//! Flowing page layout on top of [`PdfDocument`].

use super::writer::{text_width, Font, PdfDocument, PAGE_HEIGHT, PAGE_WIDTH};
use crate::error::Result;

pub const MARGIN: f64 = 50.0;
pub const CONTENT_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;

const BODY_SIZE: f64 = 10.0;
const TABLE_SIZE: f64 = 9.0;
const LINE_HEIGHT: f64 = 1.4;
const HEADER_SHADE: f64 = 0.88;
const BAR_COLOR: (f64, f64, f64) = (0.18, 0.45, 0.75);

/// A table column: header text and width in points.
pub struct Column<'a> {
    pub title: &'a str,
    pub width: f64,
}

pub struct Layout {
    doc: PdfDocument,
    y: f64,
}

impl Layout {
    pub fn new(title: &str) -> Self {
        let mut doc = PdfDocument::new(title);
        doc.add_page();
        Self {
            doc,
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    pub fn new_page(&mut self) {
        self.doc.add_page();
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Move to `y` on the current page.
    pub fn move_to(&mut self, y: f64) {
        self.y = y;
    }

    pub fn space(&mut self, height: f64) {
        self.y -= height;
    }

    /// Start a new page unless `height` still fits.
    fn ensure(&mut self, height: f64) {
        if self.y - height < MARGIN {
            self.new_page();
        }
    }

    /// Text line at an absolute x, advancing by one line.
    fn line_at(&mut self, x: f64, font: Font, size: f64, text: &str) {
        let height = size * LINE_HEIGHT;
        self.ensure(height);
        self.y -= height;
        let y = self.y;
        self.doc.current().text(x, y, font, size, text);
    }

    pub fn heading(&mut self, text: &str) {
        self.ensure(48.0);
        self.space(8.0);
        self.line_at(MARGIN, Font::Bold, 16.0, text);
        let y = self.y - 4.0;
        self.doc.current().line(MARGIN, y, PAGE_WIDTH - MARGIN, y, 0.8);
        self.space(10.0);
    }

    pub fn subheading(&mut self, text: &str) {
        self.ensure(36.0);
        self.space(6.0);
        self.line_at(MARGIN, Font::Bold, 12.0, text);
        self.space(2.0);
    }

    /// Centered line, used on the cover.
    pub fn centered(&mut self, font: Font, size: f64, text: &str) {
        for line in wrap(text, size, CONTENT_WIDTH) {
            let x = (PAGE_WIDTH - text_width(&line, size)) / 2.0;
            self.line_at(x.max(MARGIN), font, size, &line);
        }
    }

    pub fn paragraph(&mut self, text: &str) {
        self.paragraph_sized(text, BODY_SIZE);
    }

    pub fn paragraph_sized(&mut self, text: &str, size: f64) {
        for line in wrap(text, size, CONTENT_WIDTH) {
            self.line_at(MARGIN, Font::Regular, size, &line);
        }
        self.space(size * 0.6);
    }

    pub fn bullet(&mut self, text: &str) {
        let indent = 14.0;
        for (i, line) in wrap(text, BODY_SIZE, CONTENT_WIDTH - indent).into_iter().enumerate() {
            if i == 0 {
                self.ensure(BODY_SIZE * LINE_HEIGHT);
                let y = self.y - BODY_SIZE * LINE_HEIGHT;
                self.doc.current().text(MARGIN + 2.0, y, Font::Regular, BODY_SIZE, "•");
            }
            self.line_at(MARGIN + indent, Font::Regular, BODY_SIZE, &line);
        }
    }

    /// Label and value on one line.
    pub fn field(&mut self, label: &str, value: &str) {
        self.ensure(BODY_SIZE * LINE_HEIGHT);
        self.y -= BODY_SIZE * LINE_HEIGHT;
        let y = self.y;
        let page = self.doc.current();
        page.text(MARGIN, y, Font::Bold, BODY_SIZE, label);
        page.text(MARGIN + 160.0, y, Font::Regular, BODY_SIZE, value);
    }

    /// Table with a shaded header row, repeated after page breaks.
    pub fn table(&mut self, columns: &[Column<'_>], rows: &[Vec<String>]) {
        let row_height = TABLE_SIZE * 1.8;
        self.table_header(columns, row_height);
        for row in rows {
            if self.y - row_height < MARGIN {
                self.new_page();
                self.table_header(columns, row_height);
            }
            self.y -= row_height;
            let y = self.y;
            let page = self.doc.current();
            let mut x = MARGIN;
            for (column, cell) in columns.iter().zip(row) {
                page.text(x + 3.0, y + 4.0, Font::Regular, TABLE_SIZE, &fit(cell, TABLE_SIZE, column.width - 6.0));
                x += column.width;
            }
            page.line(MARGIN, y, MARGIN + total_width(columns), y, 0.3);
        }
        self.space(10.0);
    }

    fn table_header(&mut self, columns: &[Column<'_>], row_height: f64) {
        self.ensure(row_height * 2.0);
        self.y -= row_height;
        let y = self.y;
        let page = self.doc.current();
        page.fill_color(HEADER_SHADE, HEADER_SHADE, HEADER_SHADE);
        page.fill_rect(MARGIN, y, total_width(columns), row_height);
        page.fill_color(0.0, 0.0, 0.0);
        let mut x = MARGIN;
        for column in columns {
            page.text(x + 3.0, y + 4.0, Font::Bold, TABLE_SIZE, &fit(column.title, TABLE_SIZE, column.width - 6.0));
            x += column.width;
        }
    }

    /// Horizontal bars scaled to the largest value.
    pub fn bar_chart(&mut self, bars: &[(String, f64)], units: &str) {
        let label_width = 150.0;
        let value_width = 70.0;
        let bar_area = CONTENT_WIDTH - label_width - value_width;
        let bar_height = 10.0;
        let row_height = 16.0;
        let max = bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);

        for (label, value) in bars {
            self.ensure(row_height);
            self.y -= row_height;
            let y = self.y;
            let width = if max > 0.0 { bar_area * value / max } else { 0.0 };
            let page = self.doc.current();
            page.text(MARGIN, y + 2.0, Font::Regular, TABLE_SIZE, &fit(label, TABLE_SIZE, label_width - 6.0));
            page.fill_color(BAR_COLOR.0, BAR_COLOR.1, BAR_COLOR.2);
            page.fill_rect(MARGIN + label_width, y, width.max(0.5), bar_height);
            page.fill_color(0.0, 0.0, 0.0);
            page.text(
                MARGIN + label_width + width + 4.0,
                y + 2.0,
                Font::Regular,
                TABLE_SIZE,
                &format!("{:.1} {}", value, units),
            );
        }
        self.space(10.0);
    }

    /// Stamp page numbers and serialize.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let count = self.doc.page_count();
        for (i, page) in self.doc.pages_mut().iter_mut().enumerate() {
            let label = format!("Page {} of {}", i + 1, count);
            let x = PAGE_WIDTH - MARGIN - text_width(&label, 8.0);
            page.stroke_color(0.6, 0.6, 0.6);
            page.line(MARGIN, MARGIN - 14.0, PAGE_WIDTH - MARGIN, MARGIN - 14.0, 0.3);
            page.text(x, MARGIN - 26.0, Font::Regular, 8.0, &label);
        }
        self.doc.finish()
    }
}

fn total_width(columns: &[Column<'_>]) -> f64 {
    columns.iter().map(|c| c.width).sum()
}

/// Greedy word wrap by approximate glyph width.
pub fn wrap(text: &str, size: f64, width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", line, word)
        };
        if !line.is_empty() && text_width(&candidate, size) > width {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Truncate `text` with an ellipsis so it fits `width`.
fn fit(text: &str, size: f64, width: f64) -> String {
    if text_width(text, size) <= width {
        return text.to_string();
    }
    let keep = ((width / (size * 0.52)) as usize).saturating_sub(3);
    let truncated: String = text.chars().take(keep).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap() {
        let lines = wrap("one two three four five six seven eight", 10.0, 60.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.join(" "), "one two three four five six seven eight");
        assert!(wrap("   ", 10.0, 100.0).is_empty());
    }

    #[test]
    fn test_fit() {
        assert_eq!(fit("short", 9.0, 100.0), "short");
        let long = fit("A very long ward name that will not fit", 9.0, 60.0);
        assert!(long.ends_with("..."));
        assert!(long.len() < 20);
    }
}
