//! JSON and JSONL extraction.

use super::Extraction;
use serde_json::Value;

/// Lines sampled when recovering a file as line-delimited JSON.
const JSONL_SAMPLE_LINES: usize = 10;

fn structure_name(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    }
}

/// Extract a JSON or JSONL file.
///
/// Strict JSON is pretty-printed with structure notes. When strict parsing
/// fails, the file is recovered as line-delimited JSON: up to the first ten
/// lines are parsed independently and unparseable lines are skipped.
pub(crate) fn extract_json(bytes: &[u8]) -> Extraction {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        let mut notes = vec![format!("JSON Structure: {}", structure_name(&value))];
        match &value {
            Value::Object(map) => notes.push(format!("Top-level keys: {}", map.len())),
            Value::Array(items) => notes.push(format!("Array length: {}", items.len())),
            _ => {}
        }
        let body =
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        return Extraction { notes, body };
    }

    // Line-delimited recovery.
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return Extraction::from_body("Error parsing JSON/JSONL file: the file is empty.");
    }

    let sample: Vec<Value> = lines
        .iter()
        .take(JSONL_SAMPLE_LINES)
        .filter_map(|line| serde_json::from_str(line.trim()).ok())
        .collect();

    let rendered = serde_json::to_string_pretty(&sample).unwrap_or_else(|_| "[]".to_string());
    Extraction::from_body(format!(
        "JSONL file with {} lines\n\nSample of first {} lines (parsed):\n{rendered}",
        lines.len(),
        lines.len().min(JSONL_SAMPLE_LINES),
    ))
}
