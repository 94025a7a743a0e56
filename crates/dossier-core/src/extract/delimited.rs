//! Delimited-text (CSV-like) extraction with encoding and delimiter sniffing.

use super::table;
use super::text::{ENCODINGS, decode};
use super::Extraction;

/// Delimiters considered during sniffing, in tie-break priority order.
const DELIMITERS: &[char] = &[',', ';', '\t', '|'];

/// Bytes of decoded text sampled for delimiter detection.
const SNIFF_SAMPLE: usize = 4096;

/// Pick the delimiter with the highest character count in the sample.
/// Earlier candidates win ties.
pub(crate) fn detect_delimiter(sample: &str) -> char {
    let mut best = DELIMITERS[0];
    let mut best_count = 0usize;
    for &candidate in DELIMITERS {
        let count = sample.chars().filter(|&c| c == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

struct ParsedTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn parse(text: &str, delimiter: char) -> Option<ParsedTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .ok()?
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.ok()?;
        rows.push(record.iter().map(ToString::to_string).collect());
    }

    Some(ParsedTable { headers, rows })
}

/// Infer a declared type for a column from its non-empty values.
fn infer_column_type(values: &[&str]) -> &'static str {
    let non_empty: Vec<&str> = values
        .iter()
        .copied()
        .filter(|v| !v.trim().is_empty())
        .collect();

    if non_empty.is_empty() {
        return "empty";
    }
    if non_empty.iter().all(|v| v.trim().parse::<i64>().is_ok()) {
        return "integer";
    }
    if non_empty.iter().all(|v| v.trim().parse::<f64>().is_ok()) {
        return "float";
    }
    if non_empty
        .iter()
        .all(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "false"))
    {
        return "boolean";
    }
    "text"
}

/// Extract a delimited-text file.
///
/// Tries each candidate encoding in order; for each, sniffs the delimiter
/// from a leading sample and parses the whole input. When every candidate
/// fails, falls back to a lossy UTF-8 comma parse.
pub(crate) fn extract_delimited(bytes: &[u8]) -> Extraction {
    for (name, encoding) in ENCODINGS {
        let Some(text) = decode(bytes, encoding) else {
            continue;
        };
        let sample: String = text.chars().take(SNIFF_SAMPLE).collect();
        let delimiter = detect_delimiter(&sample);
        if let Some(parsed) = parse(&text, delimiter) {
            return render(&parsed, name);
        }
    }

    // Locale-default fallback: lossy decode, comma delimiter.
    let text = String::from_utf8_lossy(bytes);
    match parse(&text, ',') {
        Some(parsed) => render(&parsed, "unknown (lossy default)"),
        None => Extraction::from_body(
            "The CSV file has an unexpected format or delimiter. Please check the file format.",
        ),
    }
}

fn render(parsed: &ParsedTable, encoding: &str) -> Extraction {
    let rows = &parsed.rows;
    let columns = parsed.headers.len();

    let mut out = vec![
        format!("Detected Encoding: {encoding}"),
        format!("Dimensions: {} rows × {columns} columns", rows.len()),
        String::new(),
        "Column Names:".to_string(),
    ];
    for (i, name) in parsed.headers.iter().enumerate() {
        out.push(format!("  {}. {name}", i + 1));
    }

    // Per-column views of the data.
    let column_values: Vec<Vec<&str>> = (0..columns)
        .map(|c| {
            rows.iter()
                .map(|row| row.get(c).map_or("", String::as_str))
                .collect()
        })
        .collect();

    out.push(String::new());
    out.push("Column Types:".to_string());
    let types: Vec<&'static str> = column_values
        .iter()
        .map(|values| infer_column_type(values))
        .collect();
    for (name, ty) in parsed.headers.iter().zip(&types) {
        out.push(format!("  - {name}: {ty}"));
    }

    out.push(String::new());
    out.push("Data Preview:".to_string());
    out.extend(table::render_preview(rows));

    let numeric_columns: Vec<(String, Vec<f64>)> = parsed
        .headers
        .iter()
        .zip(&column_values)
        .zip(&types)
        .filter(|(_, ty)| matches!(**ty, "integer" | "float"))
        .map(|((name, values), _)| {
            let parsed_values = values
                .iter()
                .filter_map(|v| v.trim().parse::<f64>().ok())
                .collect();
            (name.clone(), parsed_values)
        })
        .collect();
    out.extend(table::render_numeric_stats(&numeric_columns));

    let missing: Vec<(String, usize)> = parsed
        .headers
        .iter()
        .zip(&column_values)
        .map(|(name, values)| {
            let count = values.iter().filter(|v| v.trim().is_empty()).count();
            (name.clone(), count)
        })
        .filter(|(_, count)| *count > 0)
        .collect();
    if !missing.is_empty() && !rows.is_empty() {
        out.push(String::new());
        out.push("Missing Values:".to_string());
        for (name, count) in missing {
            #[expect(clippy::cast_precision_loss)]
            let pct = count as f64 / rows.len() as f64 * 100.0;
            out.push(format!("  - {name}: {count} missing values ({pct:.1}%)"));
        }
    }

    Extraction::from_body(out.join("\n"))
}
