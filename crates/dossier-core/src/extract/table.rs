//! Shared helpers for tabular extractors (spreadsheets and delimited text).

/// Row count above which previews switch to head/tail form.
pub(crate) const PREVIEW_THRESHOLD: usize = 20;

/// Rows shown at each end of a truncated preview.
pub(crate) const PREVIEW_EDGE: usize = 10;

/// Render a data preview. Small tables are shown whole; tables with more
/// than [`PREVIEW_THRESHOLD`] rows show the first and last [`PREVIEW_EDGE`]
/// rows plus an explicit marker for the hidden middle.
pub(crate) fn render_preview(rows: &[Vec<String>]) -> Vec<String> {
    let mut lines = Vec::new();

    if rows.len() > PREVIEW_THRESHOLD {
        for (idx, row) in rows.iter().enumerate().take(PREVIEW_EDGE) {
            lines.push(render_row(idx, row));
        }
        let tail_start = rows.len() - PREVIEW_EDGE;
        for (offset, row) in rows[tail_start..].iter().enumerate() {
            lines.push(render_row(tail_start + offset, row));
        }
        lines.push(format!(
            "[...{} more rows not shown...]",
            rows.len() - PREVIEW_THRESHOLD
        ));
    } else {
        for (idx, row) in rows.iter().enumerate() {
            lines.push(render_row(idx, row));
        }
    }

    lines
}

fn render_row(idx: usize, row: &[String]) -> String {
    format!("{idx}  {}", row.join(" | "))
}

/// Descriptive statistics for one numeric column.
pub(crate) struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Compute count/mean/std/min/max over the numeric values of a column.
/// Returns `None` when the column holds no numeric values.
pub(crate) fn summarize(values: &[f64]) -> Option<NumericSummary> {
    if values.is_empty() {
        return None;
    }

    #[expect(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() < 2 {
        0.0
    } else {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    };
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(NumericSummary {
        count: values.len(),
        mean,
        std,
        min,
        max,
    })
}

/// Render the "Numeric Column Statistics" block for the given columns.
/// Columns without numeric values are skipped; returns an empty vec when
/// nothing is numeric.
pub(crate) fn render_numeric_stats(columns: &[(String, Vec<f64>)]) -> Vec<String> {
    let mut lines = Vec::new();

    for (name, values) in columns {
        let Some(summary) = summarize(values) else {
            continue;
        };
        if lines.is_empty() {
            lines.push(String::new());
            lines.push("Numeric Column Statistics:".to_string());
        }
        lines.push(format!(
            "  {name}: count={} mean={:.4} std={:.4} min={:.4} max={:.4}",
            summary.count, summary.mean, summary.std, summary.min, summary.max
        ));
    }

    lines
}
