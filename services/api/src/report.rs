//! services/api/src/report.rs
//!
//! Renders a document's analysis as a paginated A4 PDF report.
//!
//! Layout happens in millimetres from the top-left corner (like a printed
//! page) into a `ReportLayout`; `render_pdf` then converts it to PDF points
//! and encodes it with `lopdf`.

use legal_lens_core::domain::{Analysis, Document};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as PdfDocument, Object, Stream};

/// Bucket holding generated reports.
pub const REPORTS_BUCKET: &str = "reports";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const TOP_MM: f32 = 20.0;
/// Content moves to a new page once the cursor passes this line.
const BOTTOM_MM: f32 = 250.0;
const MM_TO_PT: f32 = 72.0 / 25.4;
/// Rough characters per line for 10pt Helvetica across 160mm.
const WRAP_CHARS: usize = 95;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("PDF encoding failed: {0}")]
    Pdf(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub bold: bool,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct ReportLayout {
    pub pages: Vec<Vec<TextLine>>,
}

impl ReportLayout {
    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.pages.iter().flatten()
    }
}

struct LayoutWriter {
    pages: Vec<Vec<TextLine>>,
    y: f32,
}

impl LayoutWriter {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: TOP_MM,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = TOP_MM;
    }

    fn ensure_room(&mut self) {
        if self.y > BOTTOM_MM {
            self.new_page();
        }
    }

    fn text(&mut self, x: f32, size: f32, bold: bool, text: impl Into<String>) {
        if let Some(page) = self.pages.last_mut() {
            page.push(TextLine {
                x,
                y: self.y,
                size,
                bold,
                text: text.into(),
            });
        }
    }

    fn heading(&mut self, text: &str) {
        self.ensure_room();
        self.text(20.0, 14.0, true, text);
        self.y += 10.0;
    }

    /// Writes wrapped 10pt text, one line per 5mm, breaking pages as needed.
    fn paragraph(&mut self, x: f32, text: &str) {
        for line in wrap(text, WRAP_CHARS) {
            self.ensure_room();
            self.text(x, 10.0, false, line);
            self.y += 5.0;
        }
    }

    fn finish(self) -> ReportLayout {
        ReportLayout { pages: self.pages }
    }
}

/// Greedy word wrap; words longer than `width` get a line of their own.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Lays out the report: header, risk assessment, categories, key findings,
/// legal questions, then the summary starting on a fresh page.
pub fn layout_report(document: &Document, analysis: &Analysis) -> ReportLayout {
    let mut w = LayoutWriter::new();

    w.text(20.0, 20.0, true, "Legal Document Analysis Report");
    w.y = 40.0;
    w.text(20.0, 12.0, false, format!("Document: {}", document.title));
    w.y += 10.0;
    w.text(
        20.0,
        12.0,
        false,
        format!("Analysis Date: {}", analysis.created_at.format("%B %-d, %Y")),
    );
    w.y += 10.0;
    w.text(20.0, 12.0, false, format!("Status: {}", document.status));
    w.y += 20.0;

    w.heading("Risk Assessment");
    let score = if analysis.risk_score.is_empty() {
        "N/A"
    } else {
        analysis.risk_score.as_str()
    };
    w.text(20.0, 12.0, false, format!("Risk Score: {}", score));
    w.y += 20.0;

    if !analysis.categories.is_empty() {
        w.heading("Categories");
        for (index, (name, category)) in analysis.categories.iter().enumerate() {
            w.ensure_room();
            w.text(25.0, 10.0, false, format!("{}. {}", index + 1, name));
            w.y += 8.0;
            if !category.risk_level.is_empty() {
                w.text(30.0, 10.0, false, format!("Risk Level: {}", category.risk_level));
                w.y += 6.0;
            }
            for point in &category.points {
                w.paragraph(30.0, &format!("- {}", point));
                w.y += 2.0;
            }
            w.y += 5.0;
        }
    }

    if !analysis.findings.is_empty() {
        w.y += 10.0;
        w.heading("Key Findings");
        for (index, finding) in analysis.findings.iter().enumerate() {
            w.ensure_room();
            let title = if finding.title.is_empty() {
                "Finding"
            } else {
                finding.title.as_str()
            };
            w.text(
                25.0,
                10.0,
                true,
                format!("{}. {}: {} Risk", index + 1, title, finding.risk_level.as_str()),
            );
            w.y += 8.0;
            if !finding.description.is_empty() {
                w.paragraph(30.0, &finding.description);
                w.y += 3.0;
            }
            if !finding.section.is_empty() {
                w.ensure_room();
                w.text(30.0, 10.0, false, format!("Section: {}", finding.section));
                w.y += 6.0;
            }
            w.y += 5.0;
        }
    }

    if !analysis.questions.is_empty() {
        w.y += 10.0;
        w.heading("Legal Questions");
        for (index, question) in analysis.questions.iter().enumerate() {
            w.paragraph(25.0, &format!("{}. {}", index + 1, question));
            w.y += 3.0;
        }
    }

    if !analysis.summary.is_empty() {
        w.new_page();
        w.heading("Summary");
        w.paragraph(20.0, &analysis.summary);
    }

    w.finish()
}

/// Maps text onto the WinAnsi subset the standard fonts can show.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => b'\'',
            '\u{201C}' | '\u{201D}' => b'"',
            '\u{2013}' | '\u{2014}' => b'-',
            '\u{2022}' => b'-',
            c if (' '..='~').contains(&c) => c as u8,
            _ => b'?',
        })
        .collect()
}

pub fn render_pdf(layout: &ReportLayout) -> Result<Vec<u8>, ReportError> {
    let mut doc = PdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let mut operations = Vec::with_capacity(page.len() * 5);
        for line in page {
            let font = if line.bold { "F2" } else { "F1" };
            let x = line.x * MM_TO_PT;
            let y = (PAGE_HEIGHT_MM - line.y) * MM_TO_PT;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec![font.into(), line.size.into()]));
            operations.push(Operation::new("Td", vec![x.into(), y.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(encode_text(&line.text))],
            ));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations }
            .encode()
            .map_err(|e| ReportError::Pdf(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let media_box: Vec<Object> = vec![
        0.into(),
        0.into(),
        (PAGE_WIDTH_MM * MM_TO_PT).into(),
        (PAGE_HEIGHT_MM * MM_TO_PT).into(),
    ];
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => media_box,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ReportError::Pdf(e.to_string()))?;
    Ok(buffer)
}

/// Object store key of a saved report.
pub fn storage_key(document: &Document, millis: i64) -> String {
    format!("report-{}-{}.pdf", document.id, millis)
}

/// Filename suggested for a downloaded report.
pub fn download_file_name(document: &Document, millis: i64) -> String {
    let title: String = document
        .title
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    format!("report-{}-{}.pdf", title.trim_matches('-'), millis)
}
