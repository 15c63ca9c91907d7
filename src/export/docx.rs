// Flowing (Word) projection of the ficha.
//
// `docx_document` maps the canonical payload onto paragraphs, runs and one
// table; `render_docx` serializes that tree as WordprocessingML through
// quick-xml and packs it into the OOXML zip container with the chart PNGs.
use crate::config::{DOCX_MAX_IMG_HEIGHT, DOCX_MAX_IMG_WIDTH};
use crate::error::ExportError;
use crate::export::image::{scale_to_fit, EmbeddedImage};
use crate::report::{
    ReportPayload, Section, COMPOUND_RATE_ANSWER, COMPOUND_RATE_QUESTION, FORMULAS, REFERENCES,
    REFERENCES_CLOSING, SUBTITLE, TASA_R_NOTE, TASA_R_TITLE, TITLE, TITLE_SUFFIX,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Table row text colours, cycled per row.
const ROW_COLORS: [&str; 10] = [
    "22c55e", "06b6d4", "eab308", "ef4444", "4f46e5", "8b5cf6", "f472b6", "10b981", "f59e42",
    "6366f1",
];
const HEADER_FILL: &str = "e0e7ff";
const BORDER_COLOR: &str = "bfcfff";
const LINK_COLOR: &str = "4472C4";
const EMU_PER_PX: u64 = 9525;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub mono: bool,
    /// Half-points.
    pub size: Option<u32>,
    pub color: Option<String>,
}

impl Run {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn bold(text: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::plain(text)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Run(Run),
    /// Index into `DocxDocument::links`.
    Link { text: String, target: usize },
    /// Index into `DocxDocument::images`.
    Image(usize),
    Break,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub style: Option<&'static str>,
    pub align: Option<&'static str>,
    /// Left indent and hanging indent in twips.
    pub indent: Option<(u32, u32)>,
    pub content: Vec<Inline>,
}

impl Paragraph {
    fn styled(style: &'static str, text: &str) -> Self {
        Self {
            style: Some(style),
            content: vec![Inline::Run(Run::plain(text))],
            ..Self::default()
        }
    }

    fn text(text: &str) -> Self {
        Self {
            align: Some("both"),
            content: vec![Inline::Run(Run::plain(text))],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocxTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocxBlock {
    Paragraph(Paragraph),
    Table(DocxTable),
}

/// An image together with its on-page size in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct DocxImage {
    pub image: EmbeddedImage,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default)]
pub struct DocxDocument {
    pub blocks: Vec<DocxBlock>,
    pub images: Vec<DocxImage>,
    pub links: Vec<String>,
}

impl DocxDocument {
    fn push(&mut self, p: Paragraph) {
        self.blocks.push(DocxBlock::Paragraph(p));
    }

    fn image(&mut self, img: &EmbeddedImage) {
        let (width, height) =
            scale_to_fit(img.width, img.height, DOCX_MAX_IMG_WIDTH, DOCX_MAX_IMG_HEIGHT);
        let index = self.images.len();
        self.images.push(DocxImage {
            image: img.clone(),
            width,
            height,
        });
        self.push(Paragraph {
            align: Some("center"),
            content: vec![Inline::Image(index)],
            ..Paragraph::default()
        });
    }

    fn section(&mut self, section: &Section) {
        self.push(Paragraph::styled("Heading1", &section.heading));
        if let Some(n) = &section.narrative {
            self.push(Paragraph::text(&n.paragraph()));
        }
        if let Some(img) = &section.chart {
            self.image(img);
        }
    }
}

pub fn docx_document(payload: &ReportPayload) -> DocxDocument {
    let mut doc = DocxDocument::default();

    doc.push(Paragraph::styled("Title", &format!("{} {}", TITLE, TITLE_SUFFIX)));
    doc.push(Paragraph::text(SUBTITLE));
    doc.push(Paragraph::styled("Heading2", &payload.caption));

    doc.push(Paragraph::styled("Heading2", "Información relevante"));
    for k in &payload.kpis {
        doc.push(Paragraph::styled("Heading2", &k.label));
        doc.push(Paragraph::text(&k.value));
    }

    if let Some(m) = &payload.municipalities {
        doc.push(Paragraph {
            style: Some("Heading2"),
            align: Some("center"),
            content: vec![Inline::Run(Run {
                bold: true,
                size: Some(28),
                color: Some("374151".to_string()),
                ..Run::plain(TASA_R_TITLE)
            })],
            ..Paragraph::default()
        });
        doc.blocks.push(DocxBlock::Table(DocxTable {
            header: m.header.clone(),
            rows: m.rows.clone(),
        }));
        doc.push(Paragraph::text(TASA_R_NOTE));
        if let Some(img) = &m.chart {
            doc.image(img);
        }
    }

    doc.section(&payload.population);
    doc.section(&payload.density);
    doc.section(&payload.distribution);
    for c in &payload.distribution_counts {
        doc.push(Paragraph::text(&format!("{}: {}", c.label, c.count)));
    }

    doc.push(Paragraph::styled("Heading1", "Explicación de las fórmulas"));
    doc.push(Paragraph {
        align: Some("both"),
        content: vec![
            Inline::Run(Run::bold(COMPOUND_RATE_QUESTION)),
            Inline::Run(Run::plain(COMPOUND_RATE_ANSWER)),
        ],
        ..Paragraph::default()
    });
    for f in FORMULAS {
        doc.push(Paragraph::styled("Heading2", f.heading));
        doc.push(Paragraph {
            align: Some("center"),
            content: vec![Inline::Run(Run {
                mono: true,
                size: Some(28),
                ..Run::bold(f.expression)
            })],
            ..Paragraph::default()
        });
        doc.push(Paragraph::text(f.explanation));
    }

    doc.push(Paragraph::styled("Heading1", "Fuentes y referencias"));
    doc.push(Paragraph::styled("Heading2", "Referencias:"));
    for r in REFERENCES {
        let target = doc.links.len();
        doc.links.push(r.link.to_string());
        doc.push(Paragraph {
            indent: Some((720, 360)),
            content: vec![
                Inline::Run(Run::plain(format!("• {}", r.text))),
                Inline::Break,
                Inline::Link {
                    text: r.link.to_string(),
                    target,
                },
            ],
            ..Paragraph::default()
        });
    }
    doc.push(Paragraph::text(REFERENCES_CLOSING));
    doc.push(Paragraph::text(&format!(
        "Generado: {}",
        payload.generated_at.format("%Y-%m-%d %H:%M")
    )));
    doc
}

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PACKAGE_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

type XmlWriter = Writer<Cursor<Vec<u8>>>;
type XmlResult = Result<(), ExportError>;

fn xml_error(err: std::io::Error) -> ExportError {
    ExportError::Document(err.to_string())
}

fn element(tag: &str, attrs: &[(&str, &str)]) -> BytesStart<'static> {
    let mut elem = BytesStart::new(tag.to_string());
    for attr in attrs {
        elem.push_attribute(*attr);
    }
    elem
}

fn write_tag_start(writer: &mut XmlWriter, tag: &str, attrs: &[(&str, &str)]) -> XmlResult {
    writer
        .write_event(Event::Start(element(tag, attrs)))
        .map_err(xml_error)
}

fn write_tag_end(writer: &mut XmlWriter, tag: &str) -> XmlResult {
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(xml_error)
}

fn write_tag_empty(writer: &mut XmlWriter, tag: &str, attrs: &[(&str, &str)]) -> XmlResult {
    writer
        .write_event(Event::Empty(element(tag, attrs)))
        .map_err(xml_error)
}

fn write_tag_text(
    writer: &mut XmlWriter,
    tag: &str,
    attrs: &[(&str, &str)],
    content: &str,
) -> XmlResult {
    write_tag_start(writer, tag, attrs)?;
    writer
        .write_event(Event::Text(BytesText::new(content)))
        .map_err(xml_error)?;
    write_tag_end(writer, tag)
}

/// Run `body` against a fresh writer that already carries the XML
/// declaration, and hand back the serialized part.
fn xml_part<F>(body: F) -> Result<Vec<u8>, ExportError>
where
    F: FnOnce(&mut XmlWriter) -> XmlResult,
{
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(xml_error)?;
    body(&mut writer)?;
    Ok(writer.into_inner().into_inner())
}

fn image_rel(index: usize) -> String {
    format!("rIdImg{}", index + 1)
}

fn link_rel(index: usize) -> String {
    format!("rIdLink{}", index + 1)
}

fn write_run(writer: &mut XmlWriter, run: &Run) -> XmlResult {
    write_tag_start(writer, "w:r", &[])?;
    write_tag_start(writer, "w:rPr", &[])?;
    if run.mono {
        write_tag_empty(
            writer,
            "w:rFonts",
            &[("w:ascii", "Consolas"), ("w:hAnsi", "Consolas")],
        )?;
    }
    if run.bold {
        write_tag_empty(writer, "w:b", &[])?;
    }
    if let Some(c) = &run.color {
        write_tag_empty(writer, "w:color", &[("w:val", c.as_str())])?;
    }
    if let Some(s) = run.size {
        write_tag_empty(writer, "w:sz", &[("w:val", s.to_string().as_str())])?;
    }
    write_tag_end(writer, "w:rPr")?;
    write_tag_text(writer, "w:t", &[("xml:space", "preserve")], &run.text)?;
    write_tag_end(writer, "w:r")
}

fn write_link(writer: &mut XmlWriter, text: &str, target: usize) -> XmlResult {
    let rel = link_rel(target);
    write_tag_start(writer, "w:hyperlink", &[("r:id", rel.as_str())])?;
    write_tag_start(writer, "w:r", &[])?;
    write_tag_start(writer, "w:rPr", &[])?;
    write_tag_empty(writer, "w:color", &[("w:val", LINK_COLOR)])?;
    write_tag_empty(writer, "w:u", &[("w:val", "single")])?;
    write_tag_end(writer, "w:rPr")?;
    write_tag_text(writer, "w:t", &[("xml:space", "preserve")], text)?;
    write_tag_end(writer, "w:r")?;
    write_tag_end(writer, "w:hyperlink")
}

fn write_drawing(writer: &mut XmlWriter, index: usize, img: &DocxImage) -> XmlResult {
    let id = (index + 1).to_string();
    let cx = (img.width as u64 * EMU_PER_PX).to_string();
    let cy = (img.height as u64 * EMU_PER_PX).to_string();
    let name = format!("Picture {}", id);
    let file = format!("image{}.png", id);
    let rel = image_rel(index);
    let extent = [("cx", cx.as_str()), ("cy", cy.as_str())];

    write_tag_start(writer, "w:r", &[])?;
    write_tag_start(writer, "w:drawing", &[])?;
    write_tag_start(
        writer,
        "wp:inline",
        &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
    )?;
    write_tag_empty(writer, "wp:extent", &extent)?;
    write_tag_empty(writer, "wp:docPr", &[("id", id.as_str()), ("name", name.as_str())])?;
    write_tag_start(writer, "a:graphic", &[])?;
    write_tag_start(writer, "a:graphicData", &[("uri", NS_PIC)])?;
    write_tag_start(writer, "pic:pic", &[])?;

    write_tag_start(writer, "pic:nvPicPr", &[])?;
    write_tag_empty(writer, "pic:cNvPr", &[("id", id.as_str()), ("name", file.as_str())])?;
    write_tag_empty(writer, "pic:cNvPicPr", &[])?;
    write_tag_end(writer, "pic:nvPicPr")?;

    write_tag_start(writer, "pic:blipFill", &[])?;
    write_tag_empty(writer, "a:blip", &[("r:embed", rel.as_str())])?;
    write_tag_start(writer, "a:stretch", &[])?;
    write_tag_empty(writer, "a:fillRect", &[])?;
    write_tag_end(writer, "a:stretch")?;
    write_tag_end(writer, "pic:blipFill")?;

    write_tag_start(writer, "pic:spPr", &[])?;
    write_tag_start(writer, "a:xfrm", &[])?;
    write_tag_empty(writer, "a:off", &[("x", "0"), ("y", "0")])?;
    write_tag_empty(writer, "a:ext", &extent)?;
    write_tag_end(writer, "a:xfrm")?;
    write_tag_start(writer, "a:prstGeom", &[("prst", "rect")])?;
    write_tag_empty(writer, "a:avLst", &[])?;
    write_tag_end(writer, "a:prstGeom")?;
    write_tag_end(writer, "pic:spPr")?;

    write_tag_end(writer, "pic:pic")?;
    write_tag_end(writer, "a:graphicData")?;
    write_tag_end(writer, "a:graphic")?;
    write_tag_end(writer, "wp:inline")?;
    write_tag_end(writer, "w:drawing")?;
    write_tag_end(writer, "w:r")
}

fn write_paragraph(writer: &mut XmlWriter, p: &Paragraph, doc: &DocxDocument) -> XmlResult {
    write_tag_start(writer, "w:p", &[])?;
    write_tag_start(writer, "w:pPr", &[])?;
    if let Some(s) = p.style {
        write_tag_empty(writer, "w:pStyle", &[("w:val", s)])?;
    }
    if let Some((left, hanging)) = p.indent {
        let (left, hanging) = (left.to_string(), hanging.to_string());
        write_tag_empty(
            writer,
            "w:ind",
            &[("w:left", left.as_str()), ("w:hanging", hanging.as_str())],
        )?;
    }
    if let Some(a) = p.align {
        write_tag_empty(writer, "w:jc", &[("w:val", a)])?;
    }
    write_tag_end(writer, "w:pPr")?;
    for inline in &p.content {
        match inline {
            Inline::Run(r) => write_run(writer, r)?,
            Inline::Break => {
                write_tag_start(writer, "w:r", &[])?;
                write_tag_empty(writer, "w:br", &[])?;
                write_tag_end(writer, "w:r")?;
            }
            Inline::Link { text, target } => write_link(writer, text, *target)?,
            Inline::Image(i) => {
                if let Some(img) = doc.images.get(*i) {
                    write_drawing(writer, *i, img)?;
                }
            }
        }
    }
    write_tag_end(writer, "w:p")
}

fn write_cell(writer: &mut XmlWriter, run: &Run, fill: Option<&str>) -> XmlResult {
    write_tag_start(writer, "w:tc", &[])?;
    if let Some(fill) = fill {
        write_tag_start(writer, "w:tcPr", &[])?;
        write_tag_empty(
            writer,
            "w:shd",
            &[("w:val", "clear"), ("w:color", "auto"), ("w:fill", fill)],
        )?;
        write_tag_end(writer, "w:tcPr")?;
    }
    write_tag_start(writer, "w:p", &[])?;
    write_run(writer, run)?;
    write_tag_end(writer, "w:p")?;
    write_tag_end(writer, "w:tc")
}

fn write_table(writer: &mut XmlWriter, t: &DocxTable) -> XmlResult {
    write_tag_start(writer, "w:tbl", &[])?;
    write_tag_start(writer, "w:tblPr", &[])?;
    write_tag_empty(writer, "w:tblW", &[("w:w", "5000"), ("w:type", "pct")])?;
    write_tag_empty(writer, "w:jc", &[("w:val", "center")])?;
    write_tag_start(writer, "w:tblBorders", &[])?;
    for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        write_tag_empty(
            writer,
            &format!("w:{}", side),
            &[
                ("w:val", "single"),
                ("w:sz", "4"),
                ("w:space", "0"),
                ("w:color", BORDER_COLOR),
            ],
        )?;
    }
    write_tag_end(writer, "w:tblBorders")?;
    write_tag_end(writer, "w:tblPr")?;

    write_tag_start(writer, "w:tr", &[])?;
    for h in &t.header {
        write_cell(writer, &Run::bold(h.as_str()), Some(HEADER_FILL))?;
    }
    write_tag_end(writer, "w:tr")?;

    for (i, row) in t.rows.iter().enumerate() {
        let color = ROW_COLORS[i % ROW_COLORS.len()];
        write_tag_start(writer, "w:tr", &[])?;
        for cell in row {
            let run = Run {
                color: Some(color.to_string()),
                ..Run::plain(cell.as_str())
            };
            write_cell(writer, &run, None)?;
        }
        write_tag_end(writer, "w:tr")?;
    }
    write_tag_end(writer, "w:tbl")
}

fn document_xml(doc: &DocxDocument) -> Result<Vec<u8>, ExportError> {
    xml_part(|writer| {
        write_tag_start(
            writer,
            "w:document",
            &[
                ("xmlns:w", NS_W),
                ("xmlns:r", NS_REL),
                ("xmlns:wp", NS_WP),
                ("xmlns:a", NS_A),
                ("xmlns:pic", NS_PIC),
            ],
        )?;
        write_tag_start(writer, "w:body", &[])?;
        for block in &doc.blocks {
            match block {
                DocxBlock::Paragraph(p) => write_paragraph(writer, p, doc)?,
                DocxBlock::Table(t) => write_table(writer, t)?,
            }
        }
        // A4, 2 cm margins
        write_tag_start(writer, "w:sectPr", &[])?;
        write_tag_empty(writer, "w:pgSz", &[("w:w", "11906"), ("w:h", "16838")])?;
        write_tag_empty(
            writer,
            "w:pgMar",
            &[
                ("w:top", "1134"),
                ("w:right", "1134"),
                ("w:bottom", "1134"),
                ("w:left", "1134"),
                ("w:header", "708"),
                ("w:footer", "708"),
                ("w:gutter", "0"),
            ],
        )?;
        write_tag_end(writer, "w:sectPr")?;
        write_tag_end(writer, "w:body")?;
        write_tag_end(writer, "w:document")
    })
}

fn write_relationship(
    writer: &mut XmlWriter,
    id: &str,
    kind: &str,
    target: &str,
    external: bool,
) -> XmlResult {
    let kind = format!("{}/{}", NS_REL, kind);
    let mut attrs = vec![("Id", id), ("Type", kind.as_str()), ("Target", target)];
    if external {
        attrs.push(("TargetMode", "External"));
    }
    write_tag_empty(writer, "Relationship", &attrs)
}

fn document_rels(doc: &DocxDocument) -> Result<Vec<u8>, ExportError> {
    xml_part(|writer| {
        write_tag_start(writer, "Relationships", &[("xmlns", NS_PACKAGE_REL)])?;
        write_relationship(writer, "rIdStyles", "styles", "styles.xml", false)?;
        for i in 0..doc.images.len() {
            let target = format!("media/image{}.png", i + 1);
            write_relationship(writer, &image_rel(i), "image", &target, false)?;
        }
        for (i, link) in doc.links.iter().enumerate() {
            write_relationship(writer, &link_rel(i), "hyperlink", link, true)?;
        }
        write_tag_end(writer, "Relationships")
    })
}

fn package_rels() -> Result<Vec<u8>, ExportError> {
    xml_part(|writer| {
        write_tag_start(writer, "Relationships", &[("xmlns", NS_PACKAGE_REL)])?;
        write_relationship(writer, "rId1", "officeDocument", "word/document.xml", false)?;
        write_tag_end(writer, "Relationships")
    })
}

fn content_types() -> Result<Vec<u8>, ExportError> {
    xml_part(|writer| {
        write_tag_start(
            writer,
            "Types",
            &[(
                "xmlns",
                "http://schemas.openxmlformats.org/package/2006/content-types",
            )],
        )?;
        for (ext, mime) in [
            ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
            ("xml", "application/xml"),
            ("png", "image/png"),
        ] {
            write_tag_empty(writer, "Default", &[("Extension", ext), ("ContentType", mime)])?;
        }
        for (part, mime) in [
            (
                "/word/document.xml",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
            ),
            (
                "/word/styles.xml",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
            ),
        ] {
            write_tag_empty(writer, "Override", &[("PartName", part), ("ContentType", mime)])?;
        }
        write_tag_end(writer, "Types")
    })
}

/// One paragraph style: name, spacing before/after, outline level, font size
/// in half-points and an optional colour. Every style is bold.
struct ParagraphStyle {
    id: &'static str,
    name: &'static str,
    spacing: (Option<&'static str>, &'static str),
    outline: Option<&'static str>,
    size: &'static str,
    color: Option<&'static str>,
}

const HEADING_STYLES: [ParagraphStyle; 3] = [
    ParagraphStyle {
        id: "Title",
        name: "Title",
        spacing: (None, "200"),
        outline: None,
        size: "44",
        color: Some("1E293B"),
    },
    ParagraphStyle {
        id: "Heading1",
        name: "heading 1",
        spacing: (Some("300"), "200"),
        outline: Some("0"),
        size: "32",
        color: None,
    },
    ParagraphStyle {
        id: "Heading2",
        name: "heading 2",
        spacing: (None, "80"),
        outline: Some("1"),
        size: "26",
        color: None,
    },
];

fn write_style(writer: &mut XmlWriter, style: &ParagraphStyle) -> XmlResult {
    write_tag_start(
        writer,
        "w:style",
        &[("w:type", "paragraph"), ("w:styleId", style.id)],
    )?;
    write_tag_empty(writer, "w:name", &[("w:val", style.name)])?;
    write_tag_empty(writer, "w:basedOn", &[("w:val", "Normal")])?;
    write_tag_start(writer, "w:pPr", &[])?;
    if style.outline.is_some() {
        write_tag_empty(writer, "w:keepNext", &[])?;
    }
    let (before, after) = style.spacing;
    match before {
        Some(b) => write_tag_empty(writer, "w:spacing", &[("w:before", b), ("w:after", after)])?,
        None => write_tag_empty(writer, "w:spacing", &[("w:after", after)])?,
    }
    if let Some(level) = style.outline {
        write_tag_empty(writer, "w:outlineLvl", &[("w:val", level)])?;
    }
    write_tag_end(writer, "w:pPr")?;
    write_tag_start(writer, "w:rPr", &[])?;
    write_tag_empty(writer, "w:b", &[])?;
    if let Some(c) = style.color {
        write_tag_empty(writer, "w:color", &[("w:val", c)])?;
    }
    write_tag_empty(writer, "w:sz", &[("w:val", style.size)])?;
    write_tag_end(writer, "w:rPr")?;
    write_tag_end(writer, "w:style")
}

fn styles() -> Result<Vec<u8>, ExportError> {
    xml_part(|writer| {
        write_tag_start(writer, "w:styles", &[("xmlns:w", NS_W)])?;
        write_tag_start(writer, "w:docDefaults", &[])?;
        write_tag_start(writer, "w:rPrDefault", &[])?;
        write_tag_start(writer, "w:rPr", &[])?;
        write_tag_empty(
            writer,
            "w:rFonts",
            &[
                ("w:ascii", "Segoe UI"),
                ("w:hAnsi", "Segoe UI"),
                ("w:cs", "Segoe UI"),
            ],
        )?;
        write_tag_empty(writer, "w:sz", &[("w:val", "24")])?;
        write_tag_end(writer, "w:rPr")?;
        write_tag_end(writer, "w:rPrDefault")?;
        write_tag_start(writer, "w:pPrDefault", &[])?;
        write_tag_start(writer, "w:pPr", &[])?;
        write_tag_empty(writer, "w:spacing", &[("w:after", "120")])?;
        write_tag_end(writer, "w:pPr")?;
        write_tag_end(writer, "w:pPrDefault")?;
        write_tag_end(writer, "w:docDefaults")?;

        write_tag_start(
            writer,
            "w:style",
            &[
                ("w:type", "paragraph"),
                ("w:default", "1"),
                ("w:styleId", "Normal"),
            ],
        )?;
        write_tag_empty(writer, "w:name", &[("w:val", "Normal")])?;
        write_tag_end(writer, "w:style")?;
        for style in &HEADING_STYLES {
            write_style(writer, style)?;
        }
        write_tag_end(writer, "w:styles")
    })
}

/// Pack the document into a .docx archive.
pub fn render_docx(doc: &DocxDocument) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, Vec<u8>); 5] = [
        ("[Content_Types].xml", content_types()?),
        ("_rels/.rels", package_rels()?),
        ("word/document.xml", document_xml(doc)?),
        ("word/_rels/document.xml.rels", document_rels(doc)?),
        ("word/styles.xml", styles()?),
    ];
    for (name, body) in &parts {
        zip.start_file(*name, options)?;
        zip.write_all(body)?;
    }
    for (i, img) in doc.images.iter().enumerate() {
        zip.start_file(format!("word/media/image{}.png", i + 1), options)?;
        zip.write_all(&img.image.png)?;
    }
    Ok(zip.finish()?.into_inner())
}
