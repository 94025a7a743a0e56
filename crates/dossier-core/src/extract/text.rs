//! Plain/source text extraction and shared encoding candidates.

use super::Extraction;
use encoding_rs::Encoding;

/// Encodings tried in order when decoding text-like files. The first
/// encoding that decodes without replacement errors wins.
pub(crate) const ENCODINGS: &[(&str, &Encoding)] = &[
    ("utf-8", encoding_rs::UTF_8),
    ("windows-1252", encoding_rs::WINDOWS_1252),
    ("iso-8859-15", encoding_rs::ISO_8859_15),
    ("macintosh", encoding_rs::MACINTOSH),
];

/// Decode bytes with one encoding, rejecting any decode that needed
/// replacement characters.
pub(crate) fn decode(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

/// Extract a plain-text or source file, recording which encoding succeeded.
pub(crate) fn extract_text(bytes: &[u8]) -> Extraction {
    for (name, encoding) in ENCODINGS {
        if let Some(content) = decode(bytes, encoding) {
            return Extraction {
                notes: vec![format!("Encoding: {name}")],
                body: content,
            };
        }
    }

    Extraction::from_body("Could not decode the file with any of the attempted encodings.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_wins_first() {
        let extraction = extract_text("héllo wörld".as_bytes());
        assert_eq!(extraction.notes, vec!["Encoding: utf-8".to_string()]);
        assert_eq!(extraction.body, "héllo wörld");
    }

    #[test]
    fn latin_bytes_fall_through_to_windows_1252() {
        // 0xE9 is 'é' in windows-1252 but invalid as a lone UTF-8 byte.
        let extraction = extract_text(&[b'c', b'a', b'f', 0xE9]);
        assert_eq!(extraction.notes, vec!["Encoding: windows-1252".to_string()]);
        assert_eq!(extraction.body, "café");
    }
}
