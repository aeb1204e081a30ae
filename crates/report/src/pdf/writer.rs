//! Minimal PDF 1.4 writer.
//!
//! Pages are built from text and filled/stroked rectangles using the two
//! standard Helvetica fonts with WinAnsi encoding, so no font embedding is
//! needed. Content streams are Flate compressed.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{ReportError, Result};

/// A4 portrait, in points.
pub const PAGE_WIDTH: f64 = 595.0;
pub const PAGE_HEIGHT: f64 = 842.0;

/// Average Helvetica glyph width as a fraction of the font size.
const AVERAGE_GLYPH_WIDTH: f64 = 0.52;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }
}

/// Approximate rendered width of `text`.
pub fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * AVERAGE_GLYPH_WIDTH
}

/// Content operators of one page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    content: String,
}

impl Page {
    pub fn text(&mut self, x: f64, y: f64, font: Font, size: f64, text: &str) {
        self.content.push_str(&format!(
            "BT /{} {:.1} Tf {:.2} {:.2} Td ({}) Tj ET\n",
            font.resource(),
            size,
            x,
            y,
            escape(text)
        ));
    }

    pub fn fill_color(&mut self, r: f64, g: f64, b: f64) {
        self.content.push_str(&format!("{:.3} {:.3} {:.3} rg\n", r, g, b));
    }

    pub fn stroke_color(&mut self, r: f64, g: f64, b: f64) {
        self.content.push_str(&format!("{:.3} {:.3} {:.3} RG\n", r, g, b));
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.content
            .push_str(&format!("{:.2} {:.2} {:.2} {:.2} re f\n", x, y, width, height));
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, width: f64) {
        self.content.push_str(&format!(
            "{:.2} w {:.2} {:.2} m {:.2} {:.2} l S\n",
            width, x1, y1, x2, y2
        ));
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PdfDocument {
    title: String,
    pages: Vec<Page>,
}

impl PdfDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pages: Vec::new(),
        }
    }

    pub fn add_page(&mut self) -> &mut Page {
        self.pages.push(Page::default());
        self.current()
    }

    /// The last page, starting one if the document has none.
    pub fn current(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Serialize the document.
    ///
    /// Object layout: 1 catalog, 2 page tree, 3-4 fonts, then a page and its
    /// content stream per page, then the info dictionary.
    pub fn finish(self) -> Result<Vec<u8>> {
        let mut out = Objects::new();
        let page_ids: Vec<usize> = (0..self.pages.len()).map(|i| 5 + 2 * i).collect();
        let info_id = 5 + 2 * self.pages.len();

        out.object(1, b"<< /Type /Catalog /Pages 2 0 R >>");
        let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
        out.object(
            2,
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                page_ids.len()
            )
            .as_bytes(),
        );
        for (id, font) in [(3, Font::Regular), (4, Font::Bold)] {
            out.object(
                id,
                format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                    font.base_font()
                )
                .as_bytes(),
            );
        }

        for (page, id) in self.pages.iter().zip(&page_ids) {
            let contents = id + 1;
            out.object(
                *id,
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                     /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                    PAGE_WIDTH, PAGE_HEIGHT, contents
                )
                .as_bytes(),
            );
            out.stream(contents, &compress(page.content.as_bytes())?);
        }

        out.object(
            info_id,
            format!(
                "<< /Title ({}) /Producer (ward-forecast report) >>",
                escape(&self.title)
            )
            .as_bytes(),
        );

        Ok(out.finish(info_id))
    }
}

struct Objects {
    bytes: Vec<u8>,
    offsets: Vec<usize>,
}

impl Objects {
    fn new() -> Self {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            bytes,
            offsets: Vec::new(),
        }
    }

    /// Objects must be added in id order starting at 1.
    fn object(&mut self, id: usize, body: &[u8]) {
        debug_assert_eq!(id, self.offsets.len() + 1);
        self.offsets.push(self.bytes.len());
        self.bytes.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
        self.bytes.extend_from_slice(body);
        self.bytes.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, data: &[u8]) {
        let mut body = format!("<< /Length {} /Filter /FlateDecode >>\nstream\n", data.len())
            .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.object(id, &body);
    }

    fn finish(mut self, info_id: usize) -> Vec<u8> {
        let xref = self.bytes.len();
        let size = self.offsets.len() + 1;
        let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", size);
        for offset in &self.offsets {
            table.push_str(&format!("{:010} 00000 n \n", offset));
        }
        table.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, info_id, xref
        ));
        self.bytes.extend_from_slice(table.as_bytes());
        self.bytes
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ReportError::Pdf(format!("compressing content stream: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| ReportError::Pdf(format!("compressing content stream: {}", e)))
}

/// PDF string literal body in WinAnsi encoding.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            ' '..='~' => escaped.push(ch),
            other => match win_ansi(other) {
                Some(byte) => escaped.push_str(&format!("\\{:03o}", byte)),
                None => escaped.push('?'),
            },
        }
    }
    escaped
}

fn win_ansi(ch: char) -> Option<u8> {
    match ch {
        '\u{a0}'..='\u{ff}' => Some(ch as u32 as u8),
        '€' => Some(0x80),
        '‘' => Some(0x91),
        '’' => Some(0x92),
        '“' => Some(0x93),
        '”' => Some(0x94),
        '•' => Some(0x95),
        '–' => Some(0x96),
        '—' => Some(0x97),
        _ => None,
    }
}
