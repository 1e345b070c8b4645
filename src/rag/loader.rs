//! Plain-text extraction for uploaded files.
//!
//! The file extension selects a [`DocumentFormat`], and each format owns a
//! [`TextExtractor`]. Only the first page of a PDF is extracted.

use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::types::{Document, Metadata};
use crate::core::errors::RagError;

pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String, RagError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Word,
    Pdf,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, RagError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "txt" => Ok(DocumentFormat::PlainText),
            "docx" => Ok(DocumentFormat::Word),
            "pdf" => Ok(DocumentFormat::Pdf),
            _ => Err(RagError::UnsupportedFormat(format!(".{}", ext))),
        }
    }

    pub fn extractor(self) -> &'static dyn TextExtractor {
        match self {
            DocumentFormat::PlainText => &PlainTextExtractor,
            DocumentFormat::Word => &WordExtractor,
            DocumentFormat::Pdf => &PdfExtractor,
        }
    }
}

pub fn is_supported_file(path: &Path) -> bool {
    DocumentFormat::from_path(path).is_ok()
}

/// Extracts the text of `path`, failing fast on unsupported extensions.
pub fn extract_text(path: &Path) -> Result<String, RagError> {
    let format = DocumentFormat::from_path(path)?;
    format.extractor().extract_text(path)
}

/// Loads a file into a [`Document`], recording where it came from.
pub fn load_document(path: &Path, mut metadata: Metadata) -> Result<Document, RagError> {
    let text = extract_text(path)?;
    metadata
        .entry("source".to_string())
        .or_insert_with(|| Value::String(path.to_string_lossy().to_string()));
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        metadata
            .entry("file_name".to_string())
            .or_insert_with(|| Value::String(name.to_string()));
    }
    Ok(Document::new(text, metadata))
}

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, RagError> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

pub struct WordExtractor;

impl TextExtractor for WordExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, RagError> {
        let file = std::fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| RagError::Extraction(format!("invalid DOCX archive: {}", e)))?;
        let mut entry = archive
            .by_name("word/document.xml")
            .map_err(|_| RagError::Extraction("no word/document.xml in DOCX".to_string()))?;

        let mut xml = String::new();
        entry
            .read_to_string(&mut xml)
            .map_err(|e| RagError::Extraction(format!("failed to read document.xml: {}", e)))?;

        Ok(docx_xml_to_text(&xml))
    }
}

fn docx_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|</w:p>|<w:tab/>|<w:br/>")
            .expect("static regex")
    })
}

/// Flattens WordprocessingML runs into text, one line per paragraph.
fn docx_xml_to_text(xml: &str) -> String {
    let mut out = String::new();
    for caps in docx_token_pattern().captures_iter(xml) {
        if let Some(run) = caps.get(1) {
            out.push_str(&decode_xml_entities(run.as_str()));
            continue;
        }
        match caps.get(0).map(|m| m.as_str()) {
            Some("<w:tab/>") => out.push('\t'),
            _ => out.push('\n'),
        }
    }
    out.trim_end().to_string()
}

fn decode_xml_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, RagError> {
        // pdf-extract panics on some malformed inputs.
        let pages = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_by_pages(path)
        }));

        match pages {
            Ok(Ok(pages)) => Ok(pages.into_iter().next().unwrap_or_default()),
            Ok(Err(e)) => Err(RagError::Extraction(format!(
                "cannot read PDF {}: {}",
                path.display(),
                e
            ))),
            Err(_) => Err(RagError::Extraction(format!(
                "PDF parser aborted on {}",
                path.display()
            ))),
        }
    }
}
