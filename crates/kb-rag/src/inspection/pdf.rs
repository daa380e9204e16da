//! PDF text-extractability check
//!
//! A knowledge base can only index PDFs that carry a text layer. Scanned
//! documents load fine but yield little or no text on the first page.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};

/// Characters of first-page text kept for display
pub const PREVIEW_CHARS: usize = 500;

/// Minimum trimmed first-page characters for a PDF to count as extractable
pub const MIN_TEXT_CHARS: usize = 50;

/// Upper bound on the pdf-extract fallback
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of inspecting one PDF
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfTextReport {
    pub page_count: usize,
    /// First `PREVIEW_CHARS` characters of the first page
    pub first_page_preview: String,
    /// Trimmed character count of the first page
    pub first_page_chars: usize,
    pub extractable: bool,
}

impl PdfTextReport {
    /// Assess first-page text against the extractability threshold
    pub fn from_first_page(page_count: usize, text: &str) -> Self {
        let first_page_chars = text.trim().chars().count();
        Self {
            page_count,
            first_page_preview: text.chars().take(PREVIEW_CHARS).collect(),
            first_page_chars,
            extractable: first_page_chars >= MIN_TEXT_CHARS,
        }
    }
}

/// Count pages and extract first-page text
///
/// Only a document that cannot be parsed at all is an error.
pub fn check_pdf(name: &str, data: &[u8]) -> Result<PdfTextReport> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| Error::pdf(name, format!("Failed to load PDF: {}", e)))?;

    let pages = doc.get_pages();
    let page_count = pages.len();
    if page_count == 0 {
        return Ok(PdfTextReport::from_first_page(0, ""));
    }

    let first_page = pages.keys().next().copied().unwrap_or(1);
    let text = match doc.extract_text(&[first_page]) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => fallback_first_page(name, data),
        Err(e) => {
            tracing::debug!("lopdf could not extract text from {}: {}", name, e);
            fallback_first_page(name, data)
        }
    };

    Ok(PdfTextReport::from_first_page(page_count, &text))
}

/// First page from pdf-extract's whole-document output
fn fallback_first_page(name: &str, data: &[u8]) -> String {
    match extract_with_timeout(data, EXTRACT_TIMEOUT) {
        Ok(text) => text.split('\u{c}').next().unwrap_or_default().to_string(),
        Err(message) => {
            tracing::warn!("pdf-extract failed for {}: {}", name, message);
            String::new()
        }
    }
}

/// Run pdf-extract on a worker thread, giving up after `timeout`
///
/// pdf-extract can hang on problematic fonts. A timed-out worker is left to
/// finish on its own.
fn extract_with_timeout(data: &[u8], timeout: Duration) -> std::result::Result<String, String> {
    let data = data.to_vec();
    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        let result = pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string());
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            let _ = handle.join();
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::error!("PDF extraction timed out after {}s", timeout.as_secs());
            Err(format!("timed out after {}s", timeout.as_secs()))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err("extraction thread crashed".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    fn single_page_pdf(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_threshold() {
        let scanned = PdfTextReport::from_first_page(3, "  page 1  ");
        assert_eq!(scanned.first_page_chars, 6);
        assert!(!scanned.extractable);

        let text = "The DT1000 haul truck has a rated payload of 100 tonnes and a 1000 hp engine.";
        let report = PdfTextReport::from_first_page(3, text);
        assert!(report.extractable);
        assert_eq!(report.first_page_preview, text);
    }

    #[test]
    fn test_preview_is_500_chars() {
        let report = PdfTextReport::from_first_page(1, &"x".repeat(800));
        assert_eq!(report.first_page_preview.chars().count(), PREVIEW_CHARS);
        assert_eq!(report.first_page_chars, 800);
    }

    #[test]
    fn test_counts_pages() {
        let bytes = single_page_pdf("Heavy machinery specifications");
        let report = check_pdf("dt1000.pdf", &bytes).unwrap();
        assert_eq!(report.page_count, 1);
    }

    #[test]
    fn test_extract_fallback_is_bounded() {
        let started = std::time::Instant::now();
        let result = extract_with_timeout(b"not a pdf", Duration::from_secs(5));
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));

        assert_eq!(fallback_first_page("broken.pdf", b"not a pdf"), "");
    }

    #[test]
    fn test_garbage_is_pdf_error() {
        let err = check_pdf("broken.pdf", b"definitely not a pdf").unwrap_err();
        match err {
            Error::Pdf { name, .. } => assert_eq!(name, "broken.pdf"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
