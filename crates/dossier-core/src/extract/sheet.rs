//! Excel workbook extraction via calamine.

use super::{Extraction, table};
use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use std::io::Cursor;

const SHEET_SEPARATOR_LEN: usize = 50;

/// Extract every sheet of an Excel workbook.
pub(crate) fn extract_spreadsheet(bytes: &[u8]) -> Extraction {
    let cursor = Cursor::new(bytes.to_vec());
    let Ok(mut workbook) = open_workbook_auto_from_rs(cursor) else {
        return Extraction::from_body(
            "This file is not a valid Excel file or is in an unsupported format.",
        );
    };

    let sheet_names = workbook.sheet_names().to_vec();
    let notes = vec![format!("Total Sheets: {}", sheet_names.len())];

    let mut sections = Vec::with_capacity(sheet_names.len());
    for name in &sheet_names {
        let section = match workbook.worksheet_range(name) {
            Ok(range) => render_sheet(name, &range),
            Err(err) => format!("SHEET: {name}\nError reading sheet: {err}"),
        };
        sections.push(section);
    }

    let separator = format!("\n{}\n", "-".repeat(SHEET_SEPARATOR_LEN));
    Extraction {
        notes,
        body: sections.join(&separator),
    }
}

fn render_sheet(name: &str, range: &Range<Data>) -> String {
    let mut cells = range.rows();
    let Some(header_row) = cells.next() else {
        return format!("SHEET: {name}\nThis sheet is empty.");
    };

    let headers: Vec<String> = header_row.iter().map(render_cell).collect();
    let rows: Vec<Vec<String>> = cells
        .map(|row| row.iter().map(render_cell).collect())
        .collect();
    let data_rows: Vec<&[Data]> = range.rows().skip(1).collect();

    let mut out = vec![
        format!("SHEET: {name}"),
        format!(
            "Dimensions: {} rows × {} columns",
            rows.len(),
            headers.len()
        ),
        String::new(),
        "Column Names:".to_string(),
    ];
    for (i, header) in headers.iter().enumerate() {
        out.push(format!("  {}. {header}", i + 1));
    }

    out.push(String::new());
    out.push("Column Types:".to_string());
    for (c, header) in headers.iter().enumerate() {
        let column: Vec<&Data> = data_rows
            .iter()
            .filter_map(|row| row.get(c))
            .collect();
        out.push(format!("  - {header}: {}", infer_column_type(&column)));
    }

    out.push(String::new());
    out.push("Data Preview:".to_string());
    out.extend(table::render_preview(&rows));

    let numeric_columns: Vec<(String, Vec<f64>)> = headers
        .iter()
        .enumerate()
        .map(|(c, header)| {
            let values = data_rows
                .iter()
                .filter_map(|row| row.get(c).and_then(numeric_value))
                .collect();
            (header.clone(), values)
        })
        .collect();
    out.extend(table::render_numeric_stats(&numeric_columns));

    out.join("\n")
}

fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR({e})"),
    }
}

fn numeric_value(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        #[expect(clippy::cast_precision_loss)]
        Data::Int(i) => Some(*i as f64),
        _ => None,
    }
}

fn cell_type(cell: &Data) -> Option<&'static str> {
    match cell {
        Data::Empty => None,
        Data::String(_) => Some("text"),
        Data::Float(_) => Some("float"),
        Data::Int(_) => Some("integer"),
        Data::Bool(_) => Some("boolean"),
        Data::DateTime(_) | Data::DateTimeIso(_) | Data::DurationIso(_) => Some("date"),
        Data::Error(_) => Some("error"),
    }
}

/// Classify a column by the types of its non-empty cells.
fn infer_column_type(column: &[&Data]) -> &'static str {
    let mut seen: Option<&'static str> = None;
    for cell in column {
        let Some(ty) = cell_type(cell) else {
            continue;
        };
        match seen {
            None => seen = Some(ty),
            Some(prev) if prev == ty => {}
            Some("integer") if ty == "float" => seen = Some("float"),
            Some("float") if ty == "integer" => {}
            Some(_) => return "mixed",
        }
    }
    seen.unwrap_or("empty")
}
