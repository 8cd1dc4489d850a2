use lazy_static::lazy_static;
use lopdf::encryption::DecryptionError;
use lopdf::Document;
use regex::Regex;

use crate::error::QuizError;

/// Only the first pages are read to keep uploads fast.
pub const MAX_PAGES: usize = 10;
/// Extracted notes shorter than this (after trimming) cannot seed a quiz.
pub const MIN_TEXT_CHARS: usize = 50;

const UNTITLED: &str = "Untitled notes";

lazy_static! {
    static ref PDF_SUFFIX: Regex = Regex::new(r"(?i)\.pdf$").unwrap();
}

/// Turns an uploaded document into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, pdf: &[u8]) -> Result<String, QuizError>;
}

/// Reads page text with `lopdf`, one line break after every page.
pub struct PdfTextExtractor {
    max_pages: usize,
}

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self {
            max_pages: MAX_PAGES,
        }
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf: &[u8]) -> Result<String, QuizError> {
        let mut document = Document::load_mem(pdf).map_err(|e| {
            QuizError::ExtractionFailure(format!(
                "unreadable PDF, make sure it is not password protected ({})",
                e
            ))
        })?;

        // Copy/print restricted files open with the empty user password
        if document.is_encrypted() {
            document.decrypt("").map_err(|e| match e {
                lopdf::Error::Decryption(DecryptionError::IncorrectPassword) => {
                    QuizError::ExtractionFailure("PDF is password protected".to_string())
                }
                other => QuizError::ExtractionFailure(format!(
                    "PDF encryption is not supported ({})",
                    other
                )),
            })?;
            tracing::debug!("Opened restricted PDF with the empty user password");
        }

        let pages: Vec<u32> = document
            .get_pages()
            .into_keys()
            .take(self.max_pages)
            .collect();

        let mut text = String::new();
        for page in pages {
            let page_text = document.extract_text(&[page]).map_err(|e| {
                QuizError::ExtractionFailure(format!("failed to read page {}: {}", page, e))
            })?;
            text.push_str(page_text.trim_end());
            text.push('\n');
        }

        tracing::debug!("Extracted {} characters of notes", text.chars().count());
        Ok(text)
    }
}

/// Rejects text too short to generate questions from.
pub fn ensure_enough_text(text: String) -> Result<String, QuizError> {
    if text.trim().chars().count() < MIN_TEXT_CHARS {
        return Err(QuizError::ExtractionFailure(
            "not enough text could be extracted from this PDF, try a different document"
                .to_string(),
        ));
    }
    Ok(text)
}

/// Quiz title for an uploaded file: the name without its `.pdf` extension.
pub fn derive_title(file_name: &str) -> String {
    // Browsers may send a full path on some platforms.
    let base = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name)
        .trim();
    let title = PDF_SUFFIX.replace(base, "").trim().to_string();

    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}
