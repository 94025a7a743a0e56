//! PDF text extraction.

use super::Extraction;
use lopdf::{Document, Object};

const ENCRYPTED_MESSAGE: &str =
    "This PDF file is encrypted and cannot be processed without a password.";

const EMPTY_PAGE_MESSAGE: &str = "[Page contains no extractable text or images only]";

const SCANNED_NOTE: &str = "Note: This PDF file does not contain any extractable text. \
It may contain only images or be scanned without OCR.";

/// Extract text and document metadata from a PDF.
pub(crate) fn extract_pdf(bytes: &[u8]) -> Extraction {
    match Document::load_mem(bytes) {
        Ok(document) => extract_document(&document),
        Err(lopdf::Error::Decryption(_)) => Extraction::from_body(ENCRYPTED_MESSAGE),
        Err(_) => Extraction::from_body("The file does not appear to be a valid PDF document."),
    }
}

fn extract_document(document: &Document) -> Extraction {
    if document.is_encrypted() {
        return Extraction::from_body(ENCRYPTED_MESSAGE);
    }

    let pages = document.get_pages();
    let mut notes = vec![format!("Total Pages: {}", pages.len())];
    notes.extend(metadata_notes(document));

    let mut sections = Vec::with_capacity(pages.len());
    let mut any_text = false;
    for &page_number in pages.keys() {
        let text = document
            .extract_text(&[page_number])
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            sections.push(format!("--- Page {page_number} ---\n{EMPTY_PAGE_MESSAGE}"));
        } else {
            any_text = true;
            sections.push(format!("--- Page {page_number} ---\n{text}"));
        }
    }

    let mut body = sections.join("\n\n");
    if !any_text {
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(SCANNED_NOTE);
    }

    Extraction { notes, body }
}

/// Read Title/Author/Creator/CreationDate from the trailer Info dictionary.
fn metadata_notes(document: &Document) -> Vec<String> {
    let mut notes = Vec::new();

    let Ok(info) = document
        .trailer
        .get(b"Info")
        .and_then(|obj| document.dereference(obj).map(|(_, o)| o))
        .and_then(Object::as_dict)
    else {
        return notes;
    };

    for (key, label) in [
        (b"Title".as_slice(), "Title"),
        (b"Author".as_slice(), "Author"),
        (b"Creator".as_slice(), "Creator"),
        (b"CreationDate".as_slice(), "Created"),
    ] {
        if let Ok(obj) = info.get(key) {
            if let Some(value) = pdf_string(obj) {
                if !value.is_empty() {
                    notes.push(format!("{label}: {value}"));
                }
            }
        }
    }

    notes
}

/// Decode a PDF string object, honoring the UTF-16BE BOM form.
fn pdf_string(object: &Object) -> Option<String> {
    let bytes = object.as_str().ok()?;
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&units));
    }
    Some(String::from_utf8_lossy(bytes).into_owned())
}
