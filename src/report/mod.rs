//! Report converter - HTML to Word documents
//!
//! ## Responsibilities
//!
//! - Parse report HTML into a flat list of document blocks
//! - Render the blocks to a `.docx` file
//!
//! The element mapping: `h1..h4` become headings, `p` paragraphs, `ul`/`ol`
//! items become list entries, `div.code-block` becomes a monospaced shaded
//! block, and other `div`/`section` containers are walked recursively. The
//! first `h1` in the document also provides the document title.

use crate::error::{Error, Result};
use docx_rs::{
    AbstractNumbering, AlignmentType, Docx, IndentLevel, Level, LevelJc, LevelText, NumberFormat,
    Numbering, NumberingId, Paragraph, Run, RunFonts, Shading, Start, Style, StyleType,
};
use scraper::{ElementRef, Html, Selector};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Numbering definition id used for bulleted list items
const BULLET_NUMBERING_ID: usize = 1;

/// One mapped document block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    /// `ordered` records the source list type; both render as bullets
    ListItem { text: String, ordered: bool },
    CodeBlock { text: String },
}

/// Parsed report, ready for rendering
#[derive(Debug, Clone, Default)]
pub struct HtmlReport {
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

/// Parse report HTML into blocks
pub fn parse_html(html: &str) -> HtmlReport {
    let doc = Html::parse_document(html);

    let h1 = Selector::parse("h1").expect("static selector");
    let title = doc
        .select(&h1)
        .next()
        .map(|el| clean_text(&element_text(el)))
        .filter(|t| !t.is_empty());

    let body = Selector::parse("body").expect("static selector");
    let mut blocks = Vec::new();
    if let Some(body) = doc.select(&body).next() {
        for child in body.children() {
            if let Some(el) = ElementRef::wrap(child) {
                process_element(el, &mut blocks);
            }
        }
    }

    HtmlReport { title, blocks }
}

fn process_element(el: ElementRef, blocks: &mut Vec<Block>) {
    match el.value().name() {
        "h1" => push_heading(el, 1, blocks),
        "h2" => push_heading(el, 2, blocks),
        "h3" => push_heading(el, 3, blocks),
        "h4" => push_heading(el, 4, blocks),
        "p" => {
            let text = clean_text(&element_text(el));
            if !text.is_empty() {
                blocks.push(Block::Paragraph { text });
            }
        }
        "ul" => push_list_items(el, false, blocks),
        "ol" => push_list_items(el, true, blocks),
        "div" if has_class(el, "code-block") => {
            let text = clean_text(&element_text(el));
            if !text.is_empty() {
                blocks.push(Block::CodeBlock { text });
            }
        }
        "div" | "section" => {
            for child in el.children() {
                if let Some(child_el) = ElementRef::wrap(child) {
                    process_element(child_el, blocks);
                }
            }
        }
        _ => {}
    }
}

fn push_heading(el: ElementRef, level: u8, blocks: &mut Vec<Block>) {
    let text = clean_text(&element_text(el));
    if !text.is_empty() {
        blocks.push(Block::Heading { level, text });
    }
}

fn push_list_items(el: ElementRef, ordered: bool, blocks: &mut Vec<Block>) {
    let li = Selector::parse("li").expect("static selector");
    for item in el.select(&li) {
        let text = clean_text(&element_text(item));
        if !text.is_empty() {
            blocks.push(Block::ListItem { text, ordered });
        }
    }
}

fn has_class(el: ElementRef, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>()
}

/// Collapse runs of whitespace, trim ends
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render a parsed report to docx bytes
pub fn render_docx(report: &HtmlReport) -> Result<Vec<u8>> {
    let mut docx = Docx::new()
        .add_style(
            Style::new("Title", StyleType::Paragraph)
                .name("Title")
                .size(32)
                .bold(),
        )
        .add_style(heading_style(1))
        .add_style(heading_style(2))
        .add_style(heading_style(3))
        .add_style(heading_style(4))
        .add_abstract_numbering(AbstractNumbering::new(BULLET_NUMBERING_ID).add_level(
            Level::new(
                0,
                Start::new(1),
                NumberFormat::new("bullet"),
                LevelText::new("•"),
                LevelJc::new("left"),
            ),
        ))
        .add_numbering(Numbering::new(BULLET_NUMBERING_ID, BULLET_NUMBERING_ID));

    if let Some(title) = &report.title {
        docx = docx.add_paragraph(
            Paragraph::new()
                .style("Title")
                .align(AlignmentType::Center)
                .add_run(Run::new().add_text(title.as_str())),
        );
    }

    for block in &report.blocks {
        docx = docx.add_paragraph(block_paragraph(block));
    }

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| Error::Convert(format!("failed to write docx: {e}")))?;
    Ok(cursor.into_inner())
}

fn heading_style(level: usize) -> Style {
    // Sizes follow the report template: 13pt for h1 down to 10pt for h4
    let half_points = 2 * (14 - level);
    Style::new(format!("Heading{level}"), StyleType::Paragraph)
        .name(format!("Heading {level}"))
        .size(half_points)
        .bold()
}

fn block_paragraph(block: &Block) -> Paragraph {
    match block {
        Block::Heading { level, text } => Paragraph::new()
            .style(&format!("Heading{level}"))
            .add_run(Run::new().add_text(text.as_str())),
        Block::Paragraph { text } => {
            Paragraph::new().add_run(Run::new().add_text(text.as_str()))
        }
        Block::ListItem { text, .. } => Paragraph::new()
            .numbering(NumberingId::new(BULLET_NUMBERING_ID), IndentLevel::new(0))
            .add_run(Run::new().add_text(text.as_str())),
        Block::CodeBlock { text } => Paragraph::new().add_run(
            Run::new()
                .add_text(text.as_str())
                .fonts(RunFonts::new().ascii("Courier New"))
                .size(20)
                .shading(Shading::new().fill("F5F5F5")),
        ),
    }
}

/// Convert an HTML report file to docx.
///
/// Without an explicit output path the document is written beside the
/// source, with a `.docx` extension.
pub fn convert_file(input: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let html = fs::read_to_string(input)?;
    let report = parse_html(&html);
    let bytes = render_docx(&report)?;

    let out_path = match output {
        Some(p) => p.to_path_buf(),
        None => input.with_extension("docx"),
    };
    fs::write(&out_path, bytes)?;

    tracing::info!(
        input = %input.display(),
        output = %out_path.display(),
        blocks = report.blocks.len(),
        "Report converted"
    );
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<html><body>
        <h1>Weekly  Report</h1>
        <p>First   paragraph.</p>
        <p>   </p>
        <h2>Details</h2>
        <ul><li>alpha</li><li>beta</li></ul>
        <ol><li>first</li><li>second</li></ol>
        <div class="code-block">let x = 1 &lt; 2;</div>
        <section>
            <h3>Nested</h3>
            <div><p>deep text</p></div>
        </section>
    </body></html>"#;

    #[test]
    fn test_parse_title_from_first_h1() {
        let report = parse_html(SAMPLE);
        assert_eq!(report.title.as_deref(), Some("Weekly Report"));
    }

    #[test]
    fn test_parse_maps_elements() {
        let report = parse_html(SAMPLE);
        assert_eq!(
            report.blocks,
            vec![
                Block::Heading {
                    level: 1,
                    text: "Weekly Report".to_string()
                },
                Block::Paragraph {
                    text: "First paragraph.".to_string()
                },
                Block::Heading {
                    level: 2,
                    text: "Details".to_string()
                },
                Block::ListItem {
                    text: "alpha".to_string(),
                    ordered: false
                },
                Block::ListItem {
                    text: "beta".to_string(),
                    ordered: false
                },
                Block::ListItem {
                    text: "first".to_string(),
                    ordered: true
                },
                Block::ListItem {
                    text: "second".to_string(),
                    ordered: true
                },
                Block::CodeBlock {
                    text: "let x = 1 < 2;".to_string()
                },
                Block::Heading {
                    level: 3,
                    text: "Nested".to_string()
                },
                Block::Paragraph {
                    text: "deep text".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_plain_div_without_class_recurses_only() {
        let report = parse_html("<body><div><p>inner</p></div></body>");
        assert_eq!(
            report.blocks,
            vec![Block::Paragraph {
                text: "inner".to_string()
            }]
        );
    }

    #[test]
    fn test_render_docx_is_nonempty_zip() {
        let report = parse_html(SAMPLE);
        let bytes = render_docx(&report).unwrap();
        // docx files are ZIP containers
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_render_empty_report() {
        let bytes = render_docx(&HtmlReport::default()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_convert_file_writes_beside_source() {
        let dir = std::env::temp_dir().join(format!("camserver-report-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("report.html");
        fs::write(&input, SAMPLE).unwrap();

        let out = convert_file(&input, None).unwrap();
        assert_eq!(out, dir.join("report.docx"));
        assert!(out.exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
