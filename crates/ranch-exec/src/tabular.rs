//! Parsing of whitespace-separated tool reports into JSON rows.

use serde_json::{Map, Number, Value};

/// Column names of BLAST `-outfmt 6` output.
pub const BLAST_HEADINGS: [&str; 12] = [
    "qseqid", "sseqid", "pident", "length", "mismatch", "gapopen", "qstart", "qend", "sstart",
    "send", "evalue", "bitscore",
];

/// Parse a report whose first line holds the column names.
pub fn parse_with_header(raw: &str) -> Vec<Value> {
    let mut lines = raw.split('\n');
    let headings: Vec<&str> = lines
        .next()
        .map(|line| line.split_whitespace().collect())
        .unwrap_or_default();
    parse_rows(lines, &headings)
}

/// Parse a headerless report using fixed column names.
pub fn parse_with_headings(raw: &str, headings: &[&str]) -> Vec<Value> {
    parse_rows(raw.split('\n'), headings)
}

fn parse_rows<'a>(lines: impl Iterator<Item = &'a str>, headings: &[&str]) -> Vec<Value> {
    lines
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        // Blank lines and single-cell lines carry no data
        .filter(|cells| cells.len() > 1)
        .map(|cells| {
            let row: Map<String, Value> = headings
                .iter()
                .zip(cells)
                .map(|(heading, cell)| (heading.to_string(), cell_value(cell)))
                .collect();
            Value::Object(row)
        })
        .collect()
}

/// Numeric cells become JSON numbers; everything else stays text.
pub fn cell_value(cell: &str) -> Value {
    if let Ok(n) = cell.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = cell.parse::<f64>()
        && let Some(n) = Number::from_f64(f)
    {
        return Value::Number(n);
    }
    Value::String(cell.to_string())
}
