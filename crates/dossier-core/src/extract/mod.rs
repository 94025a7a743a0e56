//! File-content extraction.
//!
//! Turns arbitrary uploaded file bytes into normalized, LLM-ready text.
//! Extraction never fails: unsupported or malformed content degrades to a
//! descriptive message embedded in the output, and every result carries a
//! uniform metadata header.

mod delimited;
mod json;
mod pdf;
mod sheet;
mod table;
mod text;

use chrono::{DateTime, Utc};

/// Result of a single extractor: optional header note lines plus the body.
pub(crate) struct Extraction {
    pub notes: Vec<String>,
    pub body: String,
}

impl Extraction {
    pub(crate) fn from_body(body: impl Into<String>) -> Self {
        Self {
            notes: Vec::new(),
            body: body.into(),
        }
    }
}

/// Supported file families, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Spreadsheet,
    Delimited,
    Json,
    Text,
    Unknown,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        match extension_of(name).as_deref() {
            Some("pdf") => FileKind::Pdf,
            Some("xlsx" | "xls") => FileKind::Spreadsheet,
            Some("csv") => FileKind::Delimited,
            Some("json" | "jsonl") => FileKind::Json,
            Some(
                "txt" | "md" | "py" | "js" | "ts" | "rs" | "html" | "css" | "java" | "c" | "cpp"
                | "h" | "hpp" | "xml" | "yaml" | "yml" | "toml" | "log",
            ) => FileKind::Text,
            _ => FileKind::Unknown,
        }
    }
}

fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Extract the content of a file into normalized text.
///
/// The output always starts with a uniform header (name, size in KB,
/// last-modified timestamp, declared type) followed by any extractor notes
/// and the extracted body. Never errors and never returns an empty string.
pub fn extract_file(name: &str, bytes: &[u8], modified: DateTime<Utc>) -> String {
    let extension = extension_of(name);
    let kind = FileKind::from_name(name);

    let extraction = match kind {
        FileKind::Pdf => pdf::extract_pdf(bytes),
        FileKind::Spreadsheet => sheet::extract_spreadsheet(bytes),
        FileKind::Delimited => delimited::extract_delimited(bytes),
        FileKind::Json => json::extract_json(bytes),
        FileKind::Text => text::extract_text(bytes),
        FileKind::Unknown => sniff_unknown(bytes, extension.as_deref()),
    };

    #[expect(clippy::cast_precision_loss)]
    let size_kb = bytes.len() as f64 / 1024.0;

    let mut header = vec![
        format!("FILE: {name}"),
        format!("Size: {size_kb:.1} KB"),
        format!("Last Modified: {}", modified.format("%Y-%m-%d %H:%M:%S")),
        format!(
            "Type: {}",
            extension
                .as_deref()
                .map_or_else(|| "Unknown".to_string(), str::to_uppercase)
        ),
    ];
    header.extend(extraction.notes);

    format!("{}\n\n{}", header.join("\n"), extraction.body)
}

/// Classify a file with an unrecognized extension as text or binary.
///
/// A null byte in the first 1024 bytes classifies the file as binary;
/// otherwise a strict UTF-8 decode of the whole file is attempted.
fn sniff_unknown(bytes: &[u8], extension: Option<&str>) -> Extraction {
    let label = extension.unwrap_or("unknown");
    let sample = &bytes[..bytes.len().min(1024)];

    if sample.contains(&0) {
        return Extraction::from_body(format!(
            "Binary file detected. File format {label} is not supported for direct text extraction."
        ));
    }

    match std::str::from_utf8(bytes) {
        Ok(content) => Extraction {
            notes: vec!["Note: File appears to be text despite unknown extension".to_string()],
            body: content.to_string(),
        },
        Err(_) => Extraction::from_body(format!(
            "File appears to be binary. Format {label} is not supported for direct text extraction."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(FileKind::from_name("report.pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_name("sales.XLSX"), FileKind::Spreadsheet);
        assert_eq!(FileKind::from_name("data.csv"), FileKind::Delimited);
        assert_eq!(FileKind::from_name("events.jsonl"), FileKind::Json);
        assert_eq!(FileKind::from_name("notes.md"), FileKind::Text);
        assert_eq!(FileKind::from_name("archive.zip"), FileKind::Unknown);
        assert_eq!(FileKind::from_name("no_extension"), FileKind::Unknown);
    }

    #[test]
    fn header_prefixes_every_extraction() {
        let out = extract_file("notes.txt", b"hello world", Utc::now());
        assert!(out.starts_with("FILE: notes.txt\nSize: 0.0 KB\n"));
        assert!(out.contains("Type: TXT"));
        assert!(out.contains("hello world"));
    }

    #[test]
    fn unknown_extension_reports_type_unknown() {
        let out = extract_file("blob", b"plain enough", Utc::now());
        assert!(out.contains("Type: Unknown"));
        assert!(out.contains("text despite unknown extension"));
        assert!(out.contains("plain enough"));
    }

    #[test]
    fn null_byte_classifies_binary() {
        let out = extract_file("image.bin", b"\x89PNG\x00\x1a", Utc::now());
        assert!(out.contains("Binary file detected"));
    }

    #[test]
    fn invalid_utf8_without_null_bytes_falls_back_to_binary() {
        let out = extract_file("mystery.dat", &[0xFF, 0xFE, 0xFD, 0x20], Utc::now());
        assert!(out.contains("File appears to be binary"));
    }

    #[test]
    fn extraction_is_never_empty() {
        for (name, bytes) in [
            ("a.pdf", b"not really a pdf".as_slice()),
            ("b.xlsx", b"nope".as_slice()),
            ("c.csv", b"".as_slice()),
            ("d.json", b"{broken".as_slice()),
            ("e.txt", b"".as_slice()),
            ("f.unknown", b"\x00".as_slice()),
        ] {
            let out = extract_file(name, bytes, Utc::now());
            assert!(!out.trim().is_empty(), "empty extraction for {name}");
        }
    }
}
