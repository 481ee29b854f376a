//! Flat CSV export of merged rows.

use crate::record::{MergedRecord, TopK};

/// Fixed header row of the export.
pub const CSV_HEADER: [&str; 10] = [
    "merged_ids",
    "label",
    "source_text",
    "confidence",
    "category",
    "sub_category",
    "fine_grained",
    "rating",
    "action",
    "top_k",
];

/// Render merged rows as CSV, one row per merged record.
///
/// Always starts with [`CSV_HEADER`]; an empty population yields the header
/// alone. Lines are separated by `\n`, with no trailing newline.
pub fn to_csv(rows: &[MergedRecord]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(CSV_HEADER.join(","));

    for row in rows {
        let r = &row.record;
        let fields = [
            row.id_range(),
            r.label.clone(),
            r.text.clone(),
            format!("{:.6}", r.confidence),
            r.category.clone(),
            r.sub_category.clone(),
            r.fine_grained.clone(),
            r.rating.clone(),
            r.action.clone(),
            format_top_k(&r.top_k),
        ];
        lines.push(
            fields
                .iter()
                .map(|f| escape_field(f))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    lines.join("\n")
}

/// `"label (pp.p%) | label (pp.p%)"`.
pub fn format_top_k(top_k: &[TopK]) -> String {
    top_k
        .iter()
        .map(|t| format!("{} ({:.1}%)", t.label, t.prob * 100.0))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Quote a field containing a comma, quote, CR or LF; double embedded quotes.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
