//! Plain-text extraction from uploaded artifacts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::error::{Result, SkillGapError};

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Plain,
    Pdf,
    WordProcessor,
}

impl DocumentFormat {
    /// Parse a file extension (`pdf`, `.docx`) or MIME type (`application/pdf`).
    pub fn from_tag(tag: &str) -> Result<Self> {
        let tag = tag.trim().trim_start_matches('.').to_lowercase();
        match tag.as_str() {
            "txt" | "text" | "md" | "plain" | "text/plain" | "text/markdown" => Ok(Self::Plain),
            "pdf" | "application/pdf" => Ok(Self::Pdf),
            "docx" | DOCX_MIME => Ok(Self::WordProcessor),
            _ => Err(SkillGapError::UnsupportedFormat(tag)),
        }
    }

    /// Infer the format from a file's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                SkillGapError::UnsupportedFormat(format!("no extension on {}", path.display()))
            })?;
        Self::from_tag(ext)
    }

    fn extractor(self) -> &'static dyn TextExtractor {
        match self {
            Self::Plain => &PlainTextExtractor,
            Self::Pdf => &PdfExtractor,
            Self::WordProcessor => &DocxExtractor,
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = SkillGapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Pdf => write!(f, "pdf"),
            Self::WordProcessor => write!(f, "docx"),
        }
    }
}

/// Raw document bytes together with their declared format
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub format: DocumentFormat,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>, format: DocumentFormat) -> Self {
        Self { bytes, format }
    }

    /// Wrap pasted text
    pub fn plain_text(text: impl Into<String>) -> Self {
        Self::new(text.into().into_bytes(), DocumentFormat::Plain)
    }
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// Convert an artifact into plain text.
pub fn extract_text(artifact: &Artifact) -> Result<String> {
    debug!(
        "Extracting text from {} artifact ({} bytes)",
        artifact.format,
        artifact.bytes.len()
    );
    let text = artifact.format.extractor().extract(&artifact.bytes)?;
    debug!("Extracted {} chars", text.len());
    Ok(text)
}

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        String::from_utf8(bytes.to_vec())
            .map_err(|e| SkillGapError::Extraction(format!("text is not valid UTF-8: {}", e)))
    }
}

/// Primary output at least this long is accepted without trying the fallback parser
const PDF_PRIMARY_MIN_CHARS: usize = 400;

/// PDF text via `pdf-extract`, falling back to `lopdf` page text when the primary
/// engine fails or yields little.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let primary = match pdf_extract::extract_text_from_mem(bytes) {
            Ok(text) => text,
            Err(e) => {
                debug!("pdf-extract failed, trying lopdf: {}", e);
                String::new()
            }
        };
        if primary.trim().chars().count() >= PDF_PRIMARY_MIN_CHARS {
            return Ok(primary.trim().to_string());
        }

        match lopdf_text(bytes) {
            Ok(fallback) if fallback.trim().len() > primary.trim().len() => {
                debug!("Using lopdf text ({} chars)", fallback.len());
                non_empty(fallback, "PDF")
            }
            Ok(_) => non_empty(primary, "PDF"),
            Err(e) if primary.trim().is_empty() => Err(SkillGapError::Extraction(format!(
                "PDF parse error: {}",
                e
            ))),
            Err(_) => Ok(primary.trim().to_string()),
        }
    }
}

fn lopdf_text(bytes: &[u8]) -> std::result::Result<String, lopdf::Error> {
    let document = lopdf::Document::load_mem(bytes)?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    document.extract_text(&pages)
}

pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    #[allow(irrefutable_let_patterns)]
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        use docx_rs::{DocumentChild, TableCellContent, TableChild, TableRowChild};

        let docx = docx_rs::read_docx(bytes)
            .map_err(|e| SkillGapError::Extraction(format!("DOCX parse error: {:?}", e)))?;

        let mut paragraphs: Vec<String> = Vec::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(para) => paragraphs.push(paragraph_text(para)),
                DocumentChild::Table(table) => {
                    for row in &table.rows {
                        let TableChild::TableRow(row) = row else {
                            continue;
                        };
                        for cell in &row.cells {
                            let TableRowChild::TableCell(cell) = cell else {
                                continue;
                            };
                            for content in &cell.children {
                                if let TableCellContent::Paragraph(para) = content {
                                    paragraphs.push(paragraph_text(para));
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        paragraphs.retain(|p| !p.trim().is_empty());
        non_empty(paragraphs.join("\n"), "DOCX")
    }
}

/// Runs inside a paragraph are fragments of the same sentence, so they join without a separator.
fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    use docx_rs::{ParagraphChild, RunChild};

    let mut parts = Vec::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                if let RunChild::Text(t) = rc {
                    parts.push(t.text.as_str());
                }
            }
        }
    }
    parts.concat()
}

fn non_empty(text: String, kind: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(SkillGapError::Extraction(format!(
            "{} contains no extractable text",
            kind
        )));
    }
    Ok(text.trim().to_string())
}
