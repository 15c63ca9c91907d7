// Paginated (PDF) projection of the ficha.
//
// `pdf_layout` turns the canonical payload into a flat list of blocks with
// explicit spacing and page-break hints; `render_pdf` lays the blocks out on
// A4 pages and serializes a small PDF 1.4 file using the standard Type1
// fonts, so no font files need to be embedded.
use crate::error::ExportError;
use crate::export::image::EmbeddedImage;
use crate::report::{
    ReportPayload, Section, COMPOUND_RATE_ANSWER, COMPOUND_RATE_QUESTION, FORMULAS, REFERENCES,
    REFERENCES_CLOSING, SUBTITLE, TASA_R_NOTE, TASA_R_TITLE, TITLE, TITLE_SUFFIX,
};
use flate2::{write::ZlibEncoder, Compression};
use image::ImageFormat;
use std::io::Write;

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;
pub const MARGIN: f32 = 40.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const KPI_GAP: f32 = 18.0;
const TABLE_FONT_SIZE: f32 = 9.0;
const CELL_PADDING: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfFont {
    Regular,
    Bold,
    Mono,
}

impl PdfFont {
    const ALL: [PdfFont; 3] = [PdfFont::Regular, PdfFont::Bold, PdfFont::Mono];

    fn resource(self) -> &'static str {
        match self {
            PdfFont::Regular => "F1",
            PdfFont::Bold => "F2",
            PdfFont::Mono => "F3",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            PdfFont::Regular => "Helvetica",
            PdfFont::Bold => "Helvetica-Bold",
            PdfFont::Mono => "Courier",
        }
    }

    // average advance width in em; Courier is exact
    fn char_width(self) -> f32 {
        match self {
            PdfFont::Regular => 0.5,
            PdfFont::Bold => 0.55,
            PdfFont::Mono => 0.6,
        }
    }

    fn text_width(self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * self.char_width() * size
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
const SLATE: Rgb = Rgb(0.18, 0.23, 0.29);
const INDIGO: Rgb = Rgb(0.39, 0.40, 0.95);
const GRAY: Rgb = Rgb(0.22, 0.25, 0.32);
const LINK: Rgb = Rgb(0.26, 0.45, 0.77);

#[derive(Debug, Clone, PartialEq)]
pub enum PdfBlock {
    /// Word-wrapped text; explicit `\n` starts a new line.
    Text {
        text: String,
        size: f32,
        font: PdfFont,
        color: Rgb,
    },
    /// Label/value pairs with the values aligned in one column.
    Kpis(Vec<(String, String)>),
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Index into `PdfLayout::images`, drawn at the given size in points.
    Image {
        index: usize,
        width: f32,
        height: f32,
    },
    Space(f32),
    PageBreak,
}

#[derive(Debug, Clone)]
pub struct PdfLayout {
    pub blocks: Vec<PdfBlock>,
    pub images: Vec<EmbeddedImage>,
}

impl PdfLayout {
    fn text(&mut self, text: impl Into<String>, size: f32, font: PdfFont, color: Rgb) {
        self.blocks.push(PdfBlock::Text {
            text: text.into(),
            size,
            font,
            color,
        });
    }

    fn heading(&mut self, text: &str) {
        self.text(text, 15.0, PdfFont::Bold, BLACK);
        self.blocks.push(PdfBlock::Space(4.0));
    }

    fn image(&mut self, img: &EmbeddedImage) {
        let width = (img.width as f32).min(CONTENT_WIDTH);
        let scale = if img.width == 0 { 0.0 } else { width / img.width as f32 };
        let height = img.height as f32 * scale;
        self.blocks.push(PdfBlock::Image {
            index: self.images.len(),
            width,
            height,
        });
        self.images.push(img.clone());
        self.blocks.push(PdfBlock::Space(20.0));
    }

    fn section(&mut self, section: &Section) {
        self.heading(&section.heading);
        if let Some(n) = &section.narrative {
            self.text(n.paragraph(), 12.0, PdfFont::Regular, BLACK);
        }
        self.blocks.push(PdfBlock::Space(8.0));
        if let Some(img) = &section.chart {
            self.image(img);
        }
    }
}

/// Project the payload onto paginated blocks.
pub fn pdf_layout(payload: &ReportPayload) -> PdfLayout {
    let mut l = PdfLayout {
        blocks: Vec::new(),
        images: Vec::new(),
    };

    l.text(TITLE, 22.0, PdfFont::Bold, SLATE);
    l.text(TITLE_SUFFIX, 18.0, PdfFont::Bold, INDIGO);
    l.text(SUBTITLE, 13.0, PdfFont::Regular, GRAY);
    l.text(payload.caption.clone(), 13.0, PdfFont::Bold, INDIGO);
    l.blocks.push(PdfBlock::Space(12.0));

    l.text("Información relevante", 16.0, PdfFont::Bold, BLACK);
    l.blocks.push(PdfBlock::Space(6.0));
    l.blocks.push(PdfBlock::Kpis(
        payload
            .kpis
            .iter()
            .map(|k| (k.label.clone(), k.value.clone()))
            .collect(),
    ));
    l.blocks.push(PdfBlock::Space(16.0));

    l.section(&payload.population);
    l.section(&payload.density);

    if let Some(m) = &payload.municipalities {
        l.heading(TASA_R_TITLE);
        l.blocks.push(PdfBlock::Table {
            header: m.header.clone(),
            rows: m.rows.clone(),
        });
        l.text(TASA_R_NOTE, 10.0, PdfFont::Regular, GRAY);
        l.blocks.push(PdfBlock::Space(12.0));
        if let Some(img) = &m.chart {
            l.heading("Población proyectada por año y municipio");
            l.image(img);
        }
    }

    l.section(&payload.distribution);
    let counts = payload
        .distribution_counts
        .iter()
        .map(|c| format!("{}: {}", c.label, c.count))
        .collect::<Vec<_>>()
        .join("\n");
    l.text(counts, 12.0, PdfFont::Regular, BLACK);

    l.blocks.push(PdfBlock::PageBreak);
    l.heading("Explicación de las fórmulas");
    l.text(
        format!("{}{}", COMPOUND_RATE_QUESTION, COMPOUND_RATE_ANSWER),
        12.0,
        PdfFont::Regular,
        BLACK,
    );
    l.blocks.push(PdfBlock::Space(14.0));
    for f in FORMULAS {
        l.text(f.heading, 12.0, PdfFont::Bold, BLACK);
        l.text(f.expression, 12.0, PdfFont::Mono, BLACK);
        l.text(f.explanation, 12.0, PdfFont::Regular, BLACK);
        l.blocks.push(PdfBlock::Space(10.0));
    }

    l.heading("Fuentes y referencias");
    for r in REFERENCES {
        l.text(format!("• {}", r.text), 12.0, PdfFont::Regular, BLACK);
        l.text(r.link, 12.0, PdfFont::Mono, LINK);
        l.blocks.push(PdfBlock::Space(2.0));
    }
    l.text(REFERENCES_CLOSING, 12.0, PdfFont::Regular, BLACK);
    l.blocks.push(PdfBlock::Space(10.0));
    l.text(
        format!("Generado: {}", payload.generated_at.format("%Y-%m-%d %H:%M")),
        9.0,
        PdfFont::Regular,
        GRAY,
    );
    l
}

/// Encode for a WinAnsi Type1 font inside a literal string.
fn win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            ' '..='~' => out.push(c as u8),
            '\u{a0}'..='\u{ff}' => out.push(c as u32 as u8),
            '€' => out.push(0x80),
            '…' => out.push(0x85),
            '•' => out.push(0x95),
            '–' => out.push(0x96),
            '—' => out.push(0x97),
            '‘' => out.push(0x91),
            '’' => out.push(0x92),
            '“' => out.push(0x93),
            '”' => out.push(0x94),
            '−' => out.push(b'-'),
            _ => out.push(b'?'),
        }
    }
    out
}

fn chars_per_line(size: f32, font: PdfFont, max_width: f32) -> usize {
    ((max_width / (font.char_width() * size)).floor() as usize).max(1)
}

fn wrap(text: &str, size: f32, font: PdfFont, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for para in text.split('\n') {
        let mut line = String::new();
        for word in para.split(' ') {
            // words with no break opportunity (URLs) are cut where the line ends
            if font.text_width(word, size) > max_width {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let chars: Vec<char> = word.chars().collect();
                let mut chunks: Vec<String> = chars
                    .chunks(chars_per_line(size, font, max_width))
                    .map(|c| c.iter().collect())
                    .collect();
                line = chunks.pop().unwrap_or_default();
                lines.extend(chunks);
                continue;
            }
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", line, word)
            };
            if font.text_width(&candidate, size) > max_width && !line.is_empty() {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            } else {
                line = candidate;
            }
        }
        lines.push(line);
    }
    lines
}

/// Shorten `text` with an ellipsis until it fits `max_width`.
fn fit(text: &str, size: f32, font: PdfFont, max_width: f32) -> String {
    if font.text_width(text, size) <= max_width {
        return text.to_string();
    }
    let keep = chars_per_line(size, font, max_width).saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.push('…');
    out
}

#[derive(Default)]
struct Page {
    content: Vec<u8>,
}

struct Canvas {
    pages: Vec<Page>,
    y: f32,
}

impl Canvas {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn page(&mut self) -> &mut Vec<u8> {
        let last = self.pages.len() - 1;
        &mut self.pages[last].content
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Break the page when `height` no longer fits.
    fn reserve(&mut self, height: f32) {
        if self.y - height < MARGIN && self.y < PAGE_HEIGHT - MARGIN {
            self.new_page();
        }
        self.y -= height;
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, size: f32, font: PdfFont, color: Rgb) {
        let ops = self.page();
        let _ = write!(
            ops,
            "BT /{} {:.1} Tf {:.3} {:.3} {:.3} rg {:.2} {:.2} Td (",
            font.resource(),
            size,
            color.0,
            color.1,
            color.2,
            x,
            y
        );
        ops.extend(win_ansi(text));
        ops.extend_from_slice(b") Tj ET\n");
    }

    fn line(&mut self, text: &str, size: f32, font: PdfFont, color: Rgb) {
        self.reserve(size + 2.0);
        let y = self.y;
        self.draw_text(MARGIN, y, text, size, font, color);
    }

    fn image(&mut self, index: usize, width: f32, height: f32) {
        self.reserve(height);
        let y = self.y;
        let ops = self.page();
        let _ = writeln!(
            ops,
            "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /Im{} Do Q",
            width, height, MARGIN, y, index
        );
    }
}

fn lay_out(layout: &PdfLayout) -> Vec<Page> {
    let mut c = Canvas::new();
    for block in &layout.blocks {
        match block {
            PdfBlock::Text {
                text,
                size,
                font,
                color,
            } => {
                for l in wrap(text, *size, *font, CONTENT_WIDTH) {
                    c.line(&l, *size, *font, *color);
                }
            }
            PdfBlock::Kpis(pairs) => {
                let label_width = pairs
                    .iter()
                    .map(|(label, _)| PdfFont::Bold.text_width(&format!("{}:", label), 12.0))
                    .fold(0.0_f32, f32::max);
                for (label, value) in pairs {
                    c.reserve(18.0);
                    let y = c.y;
                    c.draw_text(MARGIN, y, &format!("{}:", label), 12.0, PdfFont::Bold, BLACK);
                    c.draw_text(
                        MARGIN + label_width + KPI_GAP,
                        y,
                        value,
                        12.0,
                        PdfFont::Regular,
                        BLACK,
                    );
                }
            }
            PdfBlock::Table { header, rows } => {
                let cols = header.len().max(1);
                let col_width = CONTENT_WIDTH / cols as f32;
                let draw_row = |c: &mut Canvas, cells: &[String], font: PdfFont| {
                    c.reserve(14.0);
                    let y = c.y;
                    for (i, cell) in cells.iter().enumerate() {
                        let x = MARGIN + i as f32 * col_width;
                        let text = fit(cell, TABLE_FONT_SIZE, font, col_width - CELL_PADDING);
                        c.draw_text(x, y, &text, TABLE_FONT_SIZE, font, BLACK);
                    }
                };
                draw_row(&mut c, header, PdfFont::Bold);
                for row in rows {
                    draw_row(&mut c, row, PdfFont::Regular);
                }
            }
            PdfBlock::Image {
                index,
                width,
                height,
            } => c.image(*index, *width, *height),
            PdfBlock::Space(h) => c.y -= h,
            PdfBlock::PageBreak => c.new_page(),
        }
    }
    c.pages
}

struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn begin(&mut self, id: usize) -> std::io::Result<()> {
        self.offsets[id] = self.buf.len();
        write!(self.buf, "{} 0 obj\n", id)
    }

    fn object(&mut self, id: usize, body: &str) -> std::io::Result<()> {
        self.begin(id)?;
        write!(self.buf, "{}\nendobj\n", body)
    }

    fn stream(&mut self, id: usize, dict: &str, data: &[u8]) -> std::io::Result<()> {
        self.begin(id)?;
        write!(self.buf, "<< {} /Length {} >>\nstream\n", dict, data.len())?;
        self.buf.write_all(data)?;
        self.buf.write_all(b"\nendstream\nendobj\n")
    }
}

/// Raw RGB samples, zlib-compressed for `/FlateDecode`.
fn image_stream(img: &EmbeddedImage) -> Result<(u32, u32, Vec<u8>), ExportError> {
    let rgb = image::load_from_memory_with_format(&img.png, ImageFormat::Png)
        .map_err(|e| ExportError::ImageDecode {
            name: img.key.clone(),
            reason: e.to_string(),
        })?
        .to_rgb8();
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(rgb.as_raw())?;
    Ok((rgb.width(), rgb.height(), enc.finish()?))
}

/// Lay out and serialize the document.
pub fn render_pdf(layout: &PdfLayout) -> Result<Vec<u8>, ExportError> {
    let pages = lay_out(layout);

    // 1 catalog, 2 page tree, 3.. fonts, then images, then page + content pairs
    let font_base = 3;
    let image_base = font_base + PdfFont::ALL.len();
    let page_base = image_base + layout.images.len();
    let total = page_base + 2 * pages.len();

    let mut w = PdfWriter {
        buf: Vec::new(),
        offsets: vec![0; total],
    };
    w.buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    w.object(1, "<< /Type /Catalog /Pages 2 0 R >>")?;
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", page_base + 2 * i))
        .collect();
    w.object(
        2,
        &format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        ),
    )?;

    for (i, font) in PdfFont::ALL.iter().enumerate() {
        w.object(
            font_base + i,
            &format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.base_font()
            ),
        )?;
    }

    for (i, img) in layout.images.iter().enumerate() {
        let (width, height, data) = image_stream(img)?;
        w.stream(
            image_base + i,
            &format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode",
                width, height
            ),
            &data,
        )?;
    }

    let fonts: Vec<String> = PdfFont::ALL
        .iter()
        .enumerate()
        .map(|(i, f)| format!("/{} {} 0 R", f.resource(), font_base + i))
        .collect();
    let xobjects: Vec<String> = (0..layout.images.len())
        .map(|i| format!("/Im{} {} 0 R", i, image_base + i))
        .collect();
    let resources = format!(
        "<< /Font << {} >> /XObject << {} >> >>",
        fonts.join(" "),
        xobjects.join(" ")
    );

    for (i, page) in pages.iter().enumerate() {
        let page_id = page_base + 2 * i;
        w.object(
            page_id,
            &format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] /Resources {} /Contents {} 0 R >>",
                PAGE_WIDTH,
                PAGE_HEIGHT,
                resources,
                page_id + 1
            ),
        )?;
        w.stream(page_id + 1, "", &page.content)?;
    }

    let xref = w.buf.len();
    write!(w.buf, "xref\n0 {}\n0000000000 65535 f \n", total)?;
    for offset in &w.offsets[1..] {
        write!(w.buf, "{:010} 00000 n \n", offset)?;
    }
    write!(
        w.buf,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        total, xref
    )?;
    Ok(w.buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::payload;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn layout_carries_kpis_and_images_from_the_payload() {
        let p = payload();
        let l = pdf_layout(&p);
        let kpis = l
            .blocks
            .iter()
            .find_map(|b| match b {
                PdfBlock::Kpis(k) => Some(k.clone()),
                _ => None,
            })
            .unwrap();
        let expected: Vec<(String, String)> =
            p.kpis.iter().map(|k| (k.label.clone(), k.value.clone())).collect();
        assert_eq!(kpis, expected);
        assert_eq!(l.images.len(), 4);
        assert_eq!(l.images[0], *p.population.chart.as_ref().unwrap());
        assert!(l.blocks.contains(&PdfBlock::PageBreak));
    }

    #[test]
    fn wide_images_are_scaled_to_the_content_width() {
        let l = pdf_layout(&payload());
        let (w, h) = l
            .blocks
            .iter()
            .find_map(|b| match b {
                PdfBlock::Image { index: 0, width, height } => Some((*width, *height)),
                _ => None,
            })
            .unwrap();
        assert!((w - CONTENT_WIDTH).abs() < 1e-3);
        assert!((h - 640.0 * CONTENT_WIDTH / 1200.0).abs() < 1e-3);
    }

    #[test]
    fn rendered_file_is_a_complete_pdf() {
        let bytes = render_pdf(&pdf_layout(&payload())).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        assert!(contains(&bytes, b"/BaseFont /Helvetica-Bold"));
        assert!(contains(&bytes, b"/Subtype /Image /Width 1200 /Height 640"));
        assert!(contains(&bytes, b"(Densidad Poblacional 2030:) Tj"));
        assert!(contains(&bytes, b"(https://population.un.org/wpp/) Tj"));
        assert!(contains(&bytes, b"R = \\(Pf/Pi\\)^\\(1/n\\) - 1"));
    }

    #[test]
    fn long_documents_span_several_pages() {
        let pages = lay_out(&pdf_layout(&payload()));
        assert!(pages.len() >= 3);
        assert!(pages.iter().all(|p| !p.content.is_empty()));
    }

    #[test]
    fn text_is_wrapped_to_the_content_width() {
        let text = "palabra ".repeat(200);
        let lines = wrap(text.trim(), 12.0, PdfFont::Regular, CONTENT_WIDTH);
        assert!(lines.len() > 1);
        assert!(lines
            .iter()
            .all(|l| PdfFont::Regular.text_width(l, 12.0) <= CONTENT_WIDTH));
    }

    #[test]
    fn reference_links_break_inside_the_content_width() {
        for r in &REFERENCES {
            let lines = wrap(r.link, 12.0, PdfFont::Mono, CONTENT_WIDTH);
            assert!(lines
                .iter()
                .all(|l| PdfFont::Mono.text_width(l, 12.0) <= CONTENT_WIDTH));
            assert_eq!(lines.concat(), r.link);
        }
        let long = REFERENCES[1].link;
        assert!(wrap(long, 12.0, PdfFont::Mono, CONTENT_WIDTH).len() > 1);
    }

    #[test]
    fn long_words_keep_the_surrounding_text() {
        let text = format!("Ver {} hoy", "x".repeat(150));
        let lines = wrap(&text, 12.0, PdfFont::Mono, CONTENT_WIDTH);
        assert_eq!(lines.first().map(String::as_str), Some("Ver"));
        assert!(lines.last().unwrap().ends_with(" hoy"));
        assert_eq!(lines.concat().matches('x').count(), 150);
    }

    #[test]
    fn table_cells_are_cut_to_the_column() {
        let col_width = CONTENT_WIDTH / 6.0 - CELL_PADDING;
        let name = "San Juan de Rioseco del Alto Magdalena";
        let cell = fit(name, TABLE_FONT_SIZE, PdfFont::Regular, col_width);
        assert!(cell.ends_with('…'));
        assert!(PdfFont::Regular.text_width(&cell, TABLE_FONT_SIZE) <= col_width);
        assert_eq!(fit("Guasca", TABLE_FONT_SIZE, PdfFont::Regular, col_width), "Guasca");

        let layout = PdfLayout {
            blocks: vec![PdfBlock::Table {
                header: vec!["Municipio".into(); 6],
                rows: vec![vec![name.to_string(); 6]],
            }],
            images: Vec::new(),
        };
        let content = &lay_out(&layout)[0].content;
        assert!(!contains(content, name.as_bytes()));
        assert!(contains(content, &win_ansi(&cell)));
    }

    #[test]
    fn spanish_text_maps_to_win_ansi() {
        assert_eq!(win_ansi("Área"), vec![0xC1, b'r', b'e', b'a']);
        assert_eq!(win_ansi("km²"), vec![b'k', b'm', 0xB2]);
        assert_eq!(win_ansi("a (b)"), b"a \\(b\\)".to_vec());
        assert_eq!(win_ansi("Guasca – El Salitre")[7], 0x96);
    }
}
